use std::error::Error;
use std::sync::Arc;

use futures::future::FutureExt;
use tokio::sync::mpsc;
use warp::Filter;

use log::{error, info, initialize_logger};
use vlog_backend::config::{
    get_count_or, get_duration_or, get_variable_or, parse_variable_or, DEFAULT_COLLECTION,
    DEFAULT_CONNECTION_STRING, DEFAULT_EXPORT_NAME,
};
use vlog_backend::db::{Db, PgDb, UnavailableDb};
use vlog_backend::environment::{Config, Environment};
use vlog_backend::errors::BackendError;
use vlog_backend::routes;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv::dotenv().ok();

    let logger = initialize_logger();

    let main_port: u16 = parse_variable_or("BACKEND_PORT", 8000);
    let admin_port: u16 = parse_variable_or("BACKEND_ADMIN_PORT", 8001);

    info!(logger, "Starting..."; "main_port" => main_port, "admin_port" => admin_port);
    let logger = Arc::new(logger);

    let connection_string =
        get_variable_or("BACKEND_DB_CONNECTION_STRING", DEFAULT_CONNECTION_STRING);
    let collection = get_variable_or("BACKEND_COLLECTION", DEFAULT_COLLECTION);
    let connect_timeout = get_duration_or("BACKEND_CONNECT_TIMEOUT_SECONDS", 5);

    info!(logger, "Connecting to database..."; "collection" => &collection);
    let db: Arc<dyn Db + Send + Sync> =
        match PgDb::open(&connection_string, &collection, connect_timeout).await {
            Ok(db) => Arc::new(db),
            Err(e @ BackendError::InvalidCollection(_)) => return Err(e.into()),
            Err(e) => {
                // keep serving so the routes can report the outage
                error!(logger, "Could not connect to database"; "error" => %e);
                Arc::new(UnavailableDb)
            }
        };

    let config = Config::new(
        get_count_or("BACKEND_PAGE_SIZE", 10),
        get_variable_or("BACKEND_EXPORT_NAME", DEFAULT_EXPORT_NAME),
        get_duration_or("BACKEND_QUERY_TIMEOUT_SECONDS", 10),
    );
    let environment = Environment::new(logger.clone(), db.clone(), config);

    let (termination_sender, mut termination_receiver) = mpsc::channel::<()>(1);

    let terminate: routes::admin::TerminationFunctionWrapper = Arc::new(move || {
        let termination_sender = termination_sender.clone();

        async move {
            // the receiver only goes away once we are shutting down anyway
            termination_sender.send(()).await.ok();
        }
        .boxed()
    });

    let should_terminate = async move {
        termination_receiver.recv().await;
    }
    .shared();

    let ctrlc = {
        let should_terminate = should_terminate.clone();
        let terminate = terminate.clone();

        let signal = tokio::signal::ctrl_c();

        async move {
            tokio::select! {
                _ = should_terminate => {},
                _ = signal => {
                    terminate().await;
                }
            }
        }
    };

    let main_server = {
        let should_terminate = should_terminate.clone();

        let (_, main_server) = warp::serve(routes::make_main_routes(environment.clone()))
            .try_bind_with_graceful_shutdown(([0, 0, 0, 0], main_port), async {
                should_terminate.await;
            })?;

        main_server
    };

    let admin_server = {
        let should_terminate = should_terminate.clone();

        let routes = routes::admin::make_healthz_route(environment.clone()).or(
            routes::admin::make_termination_route(environment.clone(), terminate),
        );

        let (_, admin_server) = warp::serve(routes)
            .try_bind_with_graceful_shutdown(([0, 0, 0, 0], admin_port), async {
                should_terminate.await;
            })?;

        admin_server
    };

    tokio::join!(ctrlc, main_server, admin_server);

    info!(logger, "Closing database connections...");
    db.close().await;

    info!(logger, "Exiting gracefully...");

    Ok(())
}
