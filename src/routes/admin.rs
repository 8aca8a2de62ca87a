use std::convert::Infallible;
use std::sync::Arc;

use futures::future::BoxFuture;
use log::info;
use warp::http::StatusCode;
use warp::reject;
use warp::reply::{json, Reply};
use warp::Filter;

use super::response::SuccessResponse;
use crate::environment::Environment;

pub type TerminationFuture = BoxFuture<'static, ()>;

pub type TerminationFunctionWrapper = Arc<dyn Fn() -> TerminationFuture + Send + Sync>;

pub fn make_healthz_route(
    environment: Environment,
) -> impl Filter<Extract = (impl Reply,), Error = reject::Rejection> + Clone {
    warp::path("healthz")
        .and(warp::path::end())
        .and(warp::get())
        .map(move || {
            let store = if environment.db.is_open() {
                "open"
            } else {
                "unavailable"
            };

            json(&SuccessResponse::Healthz {
                name: info::NAME,
                revision: info::REVISION,
                timestamp: info::BUILD_TIMESTAMP,
                version: info::VERSION,
                store,
            })
        })
}

pub fn make_termination_route(
    environment: Environment,
    terminate: TerminationFunctionWrapper,
) -> impl Filter<Extract = (impl Reply,), Error = reject::Rejection> + Clone {
    let handler = move || {
        let logger = environment.logger.clone();
        let terminate = terminate.clone();

        async move {
            info!(logger, "Termination requested");
            terminate().await;

            Ok::<_, Infallible>(StatusCode::NO_CONTENT)
        }
    };

    warp::path("terminate")
        .and(warp::path::end())
        .and(warp::post())
        .and_then(handler)
}
