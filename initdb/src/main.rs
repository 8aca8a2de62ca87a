//! Prepares a database for the backend: applies the migrations in
//! `./migrations`, then reports how many documents the configured
//! collection holds.

use movine::Movine;
use postgres::{Client, NoTls};

use log::{debug, info, initialize_logger, warn};
use vlog_backend::config::{get_variable_or, DEFAULT_COLLECTION, DEFAULT_CONNECTION_STRING};
use vlog_backend::db::check_collection;

const MIGRATIONS_DIR: &str = "./migrations";

fn main() {
    dotenv::dotenv().ok();

    let logger = initialize_logger();
    let connection_string =
        get_variable_or("BACKEND_DB_CONNECTION_STRING", DEFAULT_CONNECTION_STRING);
    let collection = get_variable_or("BACKEND_COLLECTION", DEFAULT_COLLECTION);
    let collection = check_collection(&collection).expect("check BACKEND_COLLECTION");

    let connect = || Client::connect(&connection_string, NoTls).expect("connect to database");

    debug!(logger, "Connecting to database...");
    let mut movine = Movine::new(connect());
    movine.set_migration_dir(MIGRATIONS_DIR);

    if movine.status().is_err() {
        debug!(logger, "Initializing movine...");
        movine.initialize().expect("initialize movine");
    }

    debug!(logger, "Running migrations..."; "directory" => MIGRATIONS_DIR);
    movine.up().expect("run migrations");

    // movine keeps its client, so counting needs a fresh one
    let count = connect()
        .query_one(format!("SELECT COUNT(*) FROM {}", collection).as_str(), &[])
        .map(|row| row.get::<_, i64>(0));

    match count {
        Ok(documents) => {
            info!(logger, "Database ready"; "collection" => collection, "documents" => documents)
        }
        Err(e) => {
            warn!(logger, "Migrations ran but the collection cannot be read"; "collection" => collection, "error" => %e)
        }
    }
}
