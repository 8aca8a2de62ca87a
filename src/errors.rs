use std::time::Duration;

use thiserror::Error;

/// Enumerates high-level errors returned by this library.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The store handle was never opened or has been torn down.
    #[error("database connection is not open")]
    StoreNotOpen,

    /// The store could not be reached.
    #[error("database is unavailable")]
    StoreUnavailable { source: sqlx::Error },

    /// The store did not answer in time.
    #[error("database did not respond within {0:?}")]
    StoreTimedOut(Duration),

    /// Represents any other SQL error.
    #[error("database query failed: {source}")]
    QueryFailed { source: sqlx::Error },

    /// The configured collection cannot be used as a table name.
    #[error("invalid collection name {0:?}")]
    InvalidCollection(String),

    /// A row of the CSV export could not be encoded.
    #[error("failed to encode export: {source}")]
    ExportFailed { source: csv::Error },
}

impl BackendError {
    /// Whether this error means the store itself cannot be used right
    /// now, as opposed to a single operation failing.
    pub fn is_unavailable(&self) -> bool {
        use BackendError::*;

        matches!(
            self,
            StoreNotOpen | StoreUnavailable { .. } | StoreTimedOut(..)
        )
    }
}
