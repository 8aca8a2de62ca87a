use futures::future::BoxFuture;
use futures::stream::BoxStream;

use crate::errors::BackendError;
use crate::record::RawDocument;

#[cfg(test)]
pub(crate) mod mock;

/// Read access to the collection of records.
///
/// A `limit` of 0 means no limit. Documents always come back newest
/// first, ordered by the raw `timestamp` text compared byte by byte;
/// documents without a timestamp come last.
pub trait Db {
    /// Retrieves up to `limit` documents at once.
    fn retrieve_latest(&self, limit: u32) -> BoxFuture<Result<Vec<RawDocument>, BackendError>>;

    /// Streams up to `limit` documents without buffering them all.
    fn stream_latest(&self, limit: u32) -> BoxStream<'static, Result<RawDocument, BackendError>>;

    /// Whether the handle is usable at all.
    fn is_open(&self) -> bool;

    /// Releases the underlying connections. Later calls fail with a
    /// store error.
    fn close(&self) -> BoxFuture<()>;
}

/// Stands in for the store when it could not be opened at startup.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnavailableDb;

impl Db for UnavailableDb {
    fn retrieve_latest(&self, _limit: u32) -> BoxFuture<Result<Vec<RawDocument>, BackendError>> {
        Box::pin(futures::future::ready(Err(BackendError::StoreNotOpen)))
    }

    fn stream_latest(&self, _limit: u32) -> BoxStream<'static, Result<RawDocument, BackendError>> {
        Box::pin(futures::stream::once(futures::future::ready(Err(
            BackendError::StoreNotOpen,
        ))))
    }

    fn is_open(&self) -> bool {
        false
    }

    fn close(&self) -> BoxFuture<()> {
        Box::pin(futures::future::ready(()))
    }
}

pub use self::postgres::*;

mod postgres {
    use std::time::Duration;

    use futures::future::BoxFuture;
    use futures::stream::{BoxStream, StreamExt};
    use futures::FutureExt;
    use serde_json::Value;
    use sqlx::postgres::{PgPool, PgPoolOptions};
    use sqlx::types::Json;
    use tokio::sync::mpsc;
    use tokio_stream::wrappers::ReceiverStream;

    use crate::errors::BackendError;
    use crate::record::RawDocument;

    /// How many rows an export may run ahead of the client.
    const STREAM_BUFFER: usize = 64;

    type DocumentRow = (String, Json<Value>);

    /// A collection stored as a Postgres table of `(id TEXT, document
    /// JSONB)` rows.
    pub struct PgDb {
        pool: PgPool,
        latest_query: String,
    }

    impl PgDb {
        pub fn new(pool: PgPool, collection: &str) -> Result<Self, BackendError> {
            Ok(PgDb {
                pool,
                latest_query: latest_query(collection)?,
            })
        }

        /// Connects to the store and checks it answers.
        pub async fn open(
            connection_string: &str,
            collection: &str,
            timeout: Duration,
        ) -> Result<Self, BackendError> {
            let pool = PgPoolOptions::new()
                .connect_timeout(timeout)
                .connect(connection_string)
                .await
                .map_err(map_sqlx_error)?;

            sqlx::query("SELECT 1")
                .execute(&pool)
                .await
                .map_err(map_sqlx_error)?;

            PgDb::new(pool, collection)
        }
    }

    // these can be simplified once async functions in traits are stabilized
    impl super::Db for PgDb {
        fn retrieve_latest(&self, limit: u32) -> BoxFuture<Result<Vec<RawDocument>, BackendError>> {
            async move {
                let rows = sqlx::query_as::<_, DocumentRow>(&self.latest_query)
                    .bind(limit_parameter(limit))
                    .fetch_all(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(rows.into_iter().map(to_document).collect())
            }
            .boxed()
        }

        fn stream_latest(&self, limit: u32) -> BoxStream<'static, Result<RawDocument, BackendError>> {
            let pool = self.pool.clone();
            let query = self.latest_query.clone();
            let (sender, receiver) = mpsc::channel(STREAM_BUFFER);

            // the cursor borrows the pool, so it lives in its own task
            tokio::spawn(async move {
                let mut rows = sqlx::query_as::<_, DocumentRow>(&query)
                    .bind(limit_parameter(limit))
                    .fetch(&pool);

                while let Some(row) = rows.next().await {
                    let item = row.map(to_document).map_err(map_sqlx_error);
                    let failed = item.is_err();

                    if sender.send(item).await.is_err() || failed {
                        break;
                    }
                }
            });

            ReceiverStream::new(receiver).boxed()
        }

        fn is_open(&self) -> bool {
            !self.pool.is_closed()
        }

        fn close(&self) -> BoxFuture<()> {
            async move { self.pool.close().await }.boxed()
        }
    }

    /// Checks that `collection` is a plain identifier and so can be
    /// spliced into SQL as a table name.
    pub fn check_collection(collection: &str) -> Result<&str, BackendError> {
        let mut chars = collection.chars();
        let valid = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

        if valid {
            Ok(collection)
        } else {
            Err(BackendError::InvalidCollection(collection.to_owned()))
        }
    }

    /// Builds the listing query for `collection`.
    fn latest_query(collection: &str) -> Result<String, BackendError> {
        let collection = check_collection(collection)?;

        Ok(include_str!("db/queries/retrieve_latest.sql").replace("{collection}", collection))
    }

    /// `LIMIT NULL` is the same as no limit.
    fn limit_parameter(limit: u32) -> Option<i64> {
        if limit == 0 {
            None
        } else {
            Some(i64::from(limit))
        }
    }

    fn to_document((id, Json(body)): DocumentRow) -> RawDocument {
        match body {
            Value::Object(fields) => RawDocument::new(id, fields),
            // a non-object body has no usable fields; let validation say so
            _ => RawDocument::new(id, Default::default()),
        }
    }

    fn map_sqlx_error(error: sqlx::Error) -> BackendError {
        use sqlx::Error;

        match error {
            Error::PoolClosed | Error::PoolTimedOut | Error::Io(_) | Error::Tls(_) => {
                BackendError::StoreUnavailable { source: error }
            }
            _ => BackendError::QueryFailed { source: error },
        }
    }

}
