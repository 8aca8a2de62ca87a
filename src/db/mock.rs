use std::sync::atomic::{AtomicBool, Ordering};

use futures::future::{self, BoxFuture};
use futures::stream::{self, BoxStream, StreamExt};

use crate::errors::BackendError;
use crate::record::RawDocument;

/// How a [`MockDb`] misbehaves.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum Failure {
    /// Every query fails as if the store were unreachable.
    Unavailable,

    /// Every query fails as if the SQL were rejected.
    Query,

    /// Streams yield the first document, then fail.
    MidStream,

    /// Queries never answer.
    Hang,
}

#[derive(Default)]
pub(crate) struct MockDb {
    documents: Vec<RawDocument>,
    failure: Option<Failure>,
    closed: AtomicBool,
}

impl MockDb {
    pub fn new(documents: Vec<RawDocument>) -> Self {
        MockDb {
            documents,
            ..Default::default()
        }
    }

    pub fn failing(failure: Failure) -> Self {
        MockDb {
            failure: Some(failure),
            ..Default::default()
        }
    }

    pub fn with_failure(mut self, failure: Failure) -> Self {
        self.failure = Some(failure);
        self
    }

    fn latest(&self, limit: u32) -> Result<Vec<RawDocument>, BackendError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(BackendError::StoreNotOpen);
        }

        match self.failure {
            Some(Failure::Unavailable) => return Err(BackendError::StoreNotOpen),
            Some(Failure::Query) => return Err(query_error()),
            _ => {}
        }

        let mut documents = self.documents.clone();
        // `None` sorts before `Some`, so reversing puts missing timestamps last
        documents.sort_by(|a, b| raw_timestamp(b).cmp(&raw_timestamp(a)));

        if limit > 0 {
            documents.truncate(limit as usize);
        }

        Ok(documents)
    }
}

impl super::Db for MockDb {
    fn retrieve_latest(&self, limit: u32) -> BoxFuture<Result<Vec<RawDocument>, BackendError>> {
        if self.failure == Some(Failure::Hang) {
            return Box::pin(future::pending::<Result<Vec<RawDocument>, BackendError>>());
        }

        Box::pin(future::ready(self.latest(limit)))
    }

    fn stream_latest(&self, limit: u32) -> BoxStream<'static, Result<RawDocument, BackendError>> {
        if self.failure == Some(Failure::Hang) {
            return stream::pending().boxed();
        }

        let items = match self.latest(limit) {
            Ok(documents) if self.failure == Some(Failure::MidStream) => documents
                .into_iter()
                .take(1)
                .map(Ok)
                .chain(std::iter::once(Err(query_error())))
                .collect::<Vec<_>>(),
            Ok(documents) => documents.into_iter().map(Ok).collect(),
            Err(e) => vec![Err(e)],
        };

        stream::iter(items).boxed()
    }

    fn is_open(&self) -> bool {
        !self.closed.load(Ordering::SeqCst) && self.failure != Some(Failure::Unavailable)
    }

    fn close(&self) -> BoxFuture<()> {
        self.closed.store(true, Ordering::SeqCst);
        Box::pin(future::ready(()))
    }
}

fn raw_timestamp(document: &RawDocument) -> Option<&[u8]> {
    document
        .fields
        .get("timestamp")
        .and_then(|t| t.as_str())
        .map(str::as_bytes)
}

fn query_error() -> BackendError {
    BackendError::QueryFailed {
        source: sqlx::Error::Protocol("relation \"datacsv\" does not exist".to_owned()),
    }
}
