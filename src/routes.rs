use std::sync::Arc;

use log::{error, Logger};
use time::OffsetDateTime;
use warp::filters::BoxedFilter;
use warp::http::StatusCode;
use warp::reject;
use warp::reply::{html, json, with_status, Reply};
use warp::Filter;

use crate::environment::Environment;
use crate::errors::BackendError;
use crate::render::table;

pub mod admin;
mod handlers;
mod rejection;
mod response;

pub use internal::*;

/// Combines the public routes, rendering failures the way each route
/// expects.
pub fn make_main_routes(environment: Environment) -> BoxedFilter<(Box<dyn Reply>,)> {
    let logger = environment.logger.clone();

    make_status_route(environment.clone())
        .or(make_listing_route(environment.clone()))
        .unify()
        .or(make_export_route(environment))
        .unify()
        .recover(move |r| format_rejection(logger.clone(), r))
        .unify()
        .boxed()
}

pub async fn format_rejection(
    logger: Arc<Logger>,
    rej: reject::Rejection,
) -> Result<Box<dyn Reply>, reject::Rejection> {
    use rejection::Context;

    if let Some(r) = rej.find::<rejection::Rejection>() {
        let e = &r.error;
        let status = status_code_for(e);
        error!(logger, "Backend error"; "context" => ?r.context, "error" => ?r.error, "status" => %status, "message" => %r.error);

        let reply: Box<dyn Reply> = match r.context {
            Context::Listing => {
                let page = if e.is_unavailable() {
                    table::render_unavailable_page()
                } else {
                    table::render_error_page(&e.to_string(), current_year())
                };

                Box::new(with_status(html(page), status))
            }
            Context::Export => Box::new(with_status(json(&r.flatten()), status)),
        };

        return Ok(reply);
    }

    Err(rej)
}

fn status_code_for(e: &BackendError) -> StatusCode {
    if e.is_unavailable() {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

fn current_year() -> i32 {
    OffsetDateTime::now_utc().year()
}

/// Today's UTC date as `YYYYMMDD`.
fn today() -> String {
    OffsetDateTime::now_utc().format("%Y%m%d")
}

mod internal {
    use warp::filters::BoxedFilter;
    use warp::path::end;
    use warp::Filter;
    use warp::Reply;
    use warp::{get as g, path as p};

    use super::handlers;
    use crate::environment::Environment;

    type Route = BoxedFilter<(Box<dyn Reply>,)>;

    macro_rules! route_filter {
        ($route_variable:ident; $first:expr) => (let $route_variable = $route_variable.and($first););
        ($route_variable:ident; $first:expr, $($rest:expr),+) => (
            let $route_variable = $route_variable.and($first);
            route_filter!($route_variable; $($rest),+);
        )
    }

    macro_rules! route {
        ($name:ident => $handler:ident, $route_variable:ident; $($filters:expr),+) => (
            pub fn $name(environment: Environment) -> Route {
                let $route_variable = warp::any().map(move || environment.clone());

                route_filter!($route_variable; $($filters),+);

                $route_variable.and_then(handlers::$handler)
                    .boxed()
            }
        );
    }

    route!(make_status_route => status, rt; end(), g());
    route!(make_listing_route => listing, rt; p("data-download"), end(), g());
    route!(make_export_route => export, rt; p("download-csv"), end(), g());
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use bytes::Bytes;
    use once_cell::sync::OnceCell;
    use serde_json::{json, Value};
    use warp::http::{Response, StatusCode};

    use super::make_main_routes;
    use crate::db::mock::{Failure, MockDb};
    use crate::db::{Db, UnavailableDb};
    use crate::environment::{Config, Environment};
    use crate::record::RawDocument;
    use crate::render::table::{EXPORT_PATH, PLACEHOLDER_ID, ROW_CLASS};

    static SLOG_SCOPE_GUARD: OnceCell<slog_scope::GlobalLoggerGuard> = OnceCell::new();

    fn initialize_global_logger() {
        SLOG_SCOPE_GUARD.get_or_init(|| slog_envlogger::init().expect("initialize slog-envlogger"));
    }

    fn make_environment(test_name: &str, db: Arc<dyn Db + Send + Sync>) -> Environment {
        make_environment_with_timeout(test_name, db, Duration::from_secs(5))
    }

    fn make_environment_with_timeout(
        test_name: &str,
        db: Arc<dyn Db + Send + Sync>,
        query_timeout: Duration,
    ) -> Environment {
        initialize_global_logger();

        let logger = slog_scope::logger().new(log::o!("test" => test_name.to_owned()));

        Environment::new(
            Arc::new(logger),
            db,
            Config::new(10, "emogo_data", query_timeout),
        )
    }

    fn document(id: &str, value: Value) -> RawDocument {
        match value {
            Value::Object(fields) => RawDocument::new(id, fields),
            _ => panic!("documents must be objects"),
        }
    }

    fn scenario_document() -> RawDocument {
        document(
            "a1",
            json!({
                "user_id": 7,
                "timestamp": "2025-11-2707:35:33",
                "sentiment": 4,
                "vlog_path": "https://x/y.mp4",
                "lat": 25.03,
                "lng": 121.56,
            }),
        )
    }

    /// Documents `r00` to `r{count - 1}`, one minute apart, oldest first.
    fn numbered_documents(count: usize) -> Vec<RawDocument> {
        (0..count)
            .map(|i| {
                document(
                    &format!("r{:02}", i),
                    json!({
                        "timestamp": format!("2025-11-2708:{:02}:00", i),
                        "sentiment": (i % 5) + 1,
                        "vlog_path": format!("https://x/{}.mp4", i),
                        "lat": 25.0,
                        "lng": 121.5,
                    }),
                )
            })
            .collect()
    }

    async fn get(path: &str, db: impl Db + Send + Sync + 'static) -> Response<Bytes> {
        let filter = make_main_routes(make_environment(path, Arc::new(db)));

        warp::test::request()
            .path(path)
            .method("GET")
            .reply(&filter)
            .await
    }

    fn body_text(response: &Response<Bytes>) -> String {
        String::from_utf8_lossy(response.body()).into_owned()
    }

    #[tokio::test]
    async fn status_reports_running() {
        let response = get("/", MockDb::default()).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("server-timing"));

        let body: Value = serde_json::from_slice(response.body()).expect("parse status body");
        assert!(body["message"]
            .as_str()
            .expect("get message as string")
            .contains("running"));
    }

    #[tokio::test]
    async fn listing_renders_the_scenario_record() {
        let response = get("/data-download", MockDb::new(vec![scenario_document()])).await;

        assert_eq!(response.status(), StatusCode::OK);

        let body = body_text(&response);
        assert_eq!(body.matches(ROW_CLASS).count(), 1);
        assert!(body.contains(">7</td>"));
        assert!(body.contains(">2025/11/27 07:35:33</td>"));
        assert!(body.contains(">Joy</span> (4)"));
        assert!(body.contains(">25.030000, 121.560000</td>"));
        assert!(body.contains(EXPORT_PATH));
    }

    #[tokio::test]
    async fn empty_listing_has_a_placeholder_and_no_export() {
        let response = get("/data-download", MockDb::default()).await;

        assert_eq!(response.status(), StatusCode::OK);

        let body = body_text(&response);
        assert_eq!(body.matches(PLACEHOLDER_ID).count(), 1);
        assert_eq!(body.matches(ROW_CLASS).count(), 0);
        assert!(!body.contains(EXPORT_PATH));
    }

    #[tokio::test]
    async fn listing_shows_the_ten_latest_and_export_shows_all() {
        let response = get("/data-download", MockDb::new(numbered_documents(12))).await;
        let body = body_text(&response);

        assert_eq!(body.matches(ROW_CLASS).count(), 10);
        assert!(body.contains("download=\"vlog_r11.mp4\""));
        assert!(body.contains("download=\"vlog_r02.mp4\""));
        assert!(!body.contains("download=\"vlog_r01.mp4\""));
        assert!(body.find("vlog_r11").unwrap() < body.find("vlog_r10").unwrap());

        let response = get("/download-csv", MockDb::new(numbered_documents(12))).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(&response).lines().count(), 13);
    }

    #[tokio::test]
    async fn listing_skips_invalid_records() {
        let documents = vec![
            scenario_document(),
            document(
                "bad",
                json!({"timestamp": "2025-11-2800:00:00", "sentiment": "very"}),
            ),
        ];

        let response = get("/data-download", MockDb::new(documents)).await;

        assert_eq!(response.status(), StatusCode::OK);

        let body = body_text(&response);
        assert_eq!(body.matches(ROW_CLASS).count(), 1);
        assert!(!body.contains("vlog_bad"));
    }

    #[tokio::test]
    async fn export_is_an_attachment() {
        let documents = vec![
            scenario_document(),
            document("bad", json!({"timestamp": "2025-11-28"})),
        ];

        let response = get("/download-csv", MockDb::new(documents)).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["content-type"],
            "text/csv; charset=utf-8"
        );

        let disposition = response.headers()["content-disposition"]
            .to_str()
            .expect("read content-disposition");
        assert!(disposition.starts_with("attachment; filename=emogo_data_"));
        assert!(disposition.ends_with(".csv"));
        assert_eq!(disposition.len(), "attachment; filename=emogo_data_20251127.csv".len());

        assert_eq!(
            body_text(&response),
            "id,user_id,timestamp,sentiment_code,sentiment_label,lat,lng,vlog_path\n\
             bad,N/A,2025-11-28,,Unknown,,,\n\
             a1,7,2025/11/27 07:35:33,4,Joy,25.03,121.56,https://x/y.mp4\n"
        );
    }

    #[tokio::test]
    async fn unavailable_store_is_503() {
        let response = get("/data-download", UnavailableDb).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(body_text(&response).contains("database connection unavailable"));

        let response = get("/download-csv", UnavailableDb).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body: Value = serde_json::from_slice(response.body()).expect("parse error body");
        assert_eq!(body["context"], "export");
    }

    #[tokio::test]
    async fn failing_queries_are_500() {
        let response = get("/data-download", MockDb::failing(Failure::Query)).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_text(&response).contains("Database Error"));

        let response = get("/download-csv", MockDb::failing(Failure::Query)).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn service_survives_failures() {
        let db: Arc<dyn Db + Send + Sync> = Arc::new(MockDb::failing(Failure::Unavailable));
        let filter = make_main_routes(make_environment("service_survives_failures", db));

        for _ in 0..2 {
            let response = warp::test::request()
                .path("/download-csv")
                .reply(&filter)
                .await;
            assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        }

        let response = warp::test::request().path("/").reply(&filter).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn slow_stores_time_out_as_503() {
        let db: Arc<dyn Db + Send + Sync> = Arc::new(MockDb::failing(Failure::Hang));
        let filter = make_main_routes(make_environment_with_timeout(
            "slow_stores_time_out_as_503",
            db,
            Duration::from_millis(50),
        ));

        let response = warp::test::request()
            .path("/data-download")
            .reply(&filter)
            .await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let response = warp::test::request()
            .path("/download-csv")
            .reply(&filter)
            .await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body: Value = serde_json::from_slice(response.body()).expect("parse error body");
        assert!(body["message"]
            .as_str()
            .expect("get message as string")
            .contains("did not respond"));
    }

    #[tokio::test]
    async fn closed_store_is_503() {
        let db = Arc::new(MockDb::new(vec![scenario_document()]));
        db.close().await;

        let filter = make_main_routes(make_environment("closed_store_is_503", db));
        let response = warp::test::request()
            .path("/data-download")
            .reply(&filter)
            .await;

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn unknown_paths_are_404() {
        let response = get("/nowhere", MockDb::default()).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
