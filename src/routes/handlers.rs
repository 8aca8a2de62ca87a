use std::time::{Duration, Instant};

use futures::future::Future;
use futures::stream::{BoxStream, StreamExt};
use log::{debug, warn, Logger};
use warp::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use warp::hyper::Body;
use warp::reject;
use warp::reply::{html, json, with_header, Reply, Response};

use super::{current_year, today};
use crate::environment::Environment;
use crate::errors::BackendError;
use crate::record::{RawDocument, Record};
use crate::render::{export, table};
use crate::routes::{
    rejection::{Context, Rejection},
    response::SuccessResponse,
};

const SERVER_TIMING_HEADER: &str = "server-timing";
const STATUS_MESSAGE: &str = "EmoGo Backend is running. Check /data-download for public data.";
type RouteResult = Result<Box<dyn Reply>, reject::Rejection>;

macro_rules! timed {
    ($($body:tt)+) => {
        let start = Instant::now();

        let result = { $($body)+ };

        Ok(Box::new(with_header(
            result,
            SERVER_TIMING_HEADER,
            format_server_timing(start.elapsed()),
        )) as Box<dyn Reply>)
    };
}

pub async fn status(_environment: Environment) -> RouteResult {
    timed! {
        json(&SuccessResponse::Status { message: STATUS_MESSAGE })
    }
}

pub async fn listing(environment: Environment) -> RouteResult {
    timed! {
        let Environment { logger, db, config } = environment;
        let error_handler = |e: BackendError| Rejection::new(Context::listing(), e);

        debug!(logger, "Retrieving latest records..."; "limit" => config.page_size);
        let documents = with_timeout(config.query_timeout, db.retrieve_latest(config.page_size))
            .await
            .map_err(error_handler)?;

        let records = normalize(&logger, &documents);
        debug!(logger, "Rendering listing..."; "retrieved" => documents.len(), "shown" => records.len());

        html(table::render_page(&records, current_year()))
    }
}

pub async fn export(environment: Environment) -> RouteResult {
    timed! {
        let Environment { logger, db, config } = environment;
        let error_handler = |e: BackendError| Rejection::new(Context::export(), e);

        debug!(logger, "Starting export...");
        let mut documents = db.stream_latest(0);

        // nothing is sent until the query has produced its first row,
        // so a failing query still gets a proper error response
        let first = with_timeout(config.query_timeout, first_document(&mut documents))
            .await
            .map_err(error_handler)?;

        let lines = export::lines(logger.clone(), first, documents).map_err(error_handler)?;
        let filename = export::filename(&config.export_name, &today());

        with_header(
            with_header(
                Response::new(Body::wrap_stream(lines)),
                CONTENT_TYPE,
                mime::TEXT_CSV_UTF_8.as_ref(),
            ),
            CONTENT_DISPOSITION,
            format!("attachment; filename={}", filename),
        )
    }
}

/// Keeps the documents that validate, logging the rest.
fn normalize(logger: &Logger, documents: &[RawDocument]) -> Vec<Record> {
    documents
        .iter()
        .filter_map(|document| match Record::from_document(document) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(logger, "Skipping invalid record"; "id" => &document.id, "field" => e.field(), "error" => %e);
                None
            }
        })
        .collect()
}

async fn first_document(
    documents: &mut BoxStream<'static, Result<RawDocument, BackendError>>,
) -> Result<Option<RawDocument>, BackendError> {
    documents.next().await.transpose()
}

async fn with_timeout<T>(
    timeout: Duration,
    future: impl Future<Output = Result<T, BackendError>>,
) -> Result<T, BackendError> {
    tokio::time::timeout(timeout, future)
        .await
        .map_err(|_| BackendError::StoreTimedOut(timeout))?
}

fn format_server_timing(seconds: Duration) -> String {
    format!("handler;dur={}", seconds.as_secs_f64() * 1000.0)
}
