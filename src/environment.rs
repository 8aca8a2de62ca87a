use std::sync::Arc;
use std::time::Duration;

use log::Logger;

use crate::db::Db;

/// Everything a request handler needs. Cloned into every request.
#[derive(Clone)]
pub struct Environment {
    pub logger: Arc<Logger>,
    pub db: Arc<dyn Db + Send + Sync>,
    pub config: Config,
}

impl Environment {
    pub fn new(logger: Arc<Logger>, db: Arc<dyn Db + Send + Sync>, config: Config) -> Self {
        Self { logger, db, config }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    /// How many records the listing page shows.
    pub(crate) page_size: u32,

    /// Prefix of the export's file name.
    pub(crate) export_name: String,

    /// How long to wait for the store before giving up on a request.
    pub(crate) query_timeout: Duration,
}

impl Config {
    pub fn new(page_size: u32, export_name: impl Into<String>, query_timeout: Duration) -> Self {
        Self {
            page_size,
            export_name: export_name.into(),
            query_timeout,
        }
    }
}
