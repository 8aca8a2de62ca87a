use std::sync::Arc;

use bytes::Bytes;
use futures::future;
use futures::stream::{self, BoxStream, Stream, StreamExt, TryStreamExt};
use log::{error, Logger};

use crate::errors::BackendError;
use crate::record::{self, RawDocument};
use crate::sentiment;
use crate::timestamp;

pub const HEADER: [&str; 8] = [
    "id",
    "user_id",
    "timestamp",
    "sentiment_code",
    "sentiment_label",
    "lat",
    "lng",
    "vlog_path",
];

/// Shown in place of a missing user ID.
pub const MISSING_USER: &str = "N/A";

/// Builds the name of the download, e.g. `emogo_data_20251127.csv`.
pub fn filename(name: &str, date: &str) -> String {
    format!("{}_{}.csv", name, date)
}

/// Lays out `document` as an export row.
///
/// Reads raw fields instead of going through
/// [`Record::from_document`](crate::record::Record::from_document), so
/// a malformed document still exports with whatever it has.
pub fn row(document: &RawDocument) -> [String; 8] {
    let text = |field: &str| document.text(field).unwrap_or_default();
    let label = integer(document, "sentiment")
        .map(sentiment::resolve)
        .unwrap_or(sentiment::UNKNOWN)
        .label;

    [
        document.id.clone(),
        integer_text(document, "user_id").unwrap_or_else(|| MISSING_USER.to_owned()),
        timestamp::for_export(&text("timestamp")),
        integer_text(document, "sentiment").unwrap_or_default(),
        label.to_owned(),
        text("lat"),
        text("lng"),
        text("vlog_path"),
    ]
}

/// Reads an integer field the same way the normalizer does.
fn integer(document: &RawDocument, field: &'static str) -> Option<i64> {
    document
        .get(field)
        .and_then(|v| record::coerce_integer(field, v).ok())
}

/// The integer form of `field` where it has one, otherwise its raw text.
fn integer_text(document: &RawDocument, field: &'static str) -> Option<String> {
    integer(document, field)
        .map(|i| i.to_string())
        .or_else(|| document.text(field))
}

/// Encodes one CSV line, terminator included.
pub fn encode<I, T>(fields: I) -> Result<Bytes, BackendError>
where
    I: IntoIterator<Item = T>,
    T: AsRef<[u8]>,
{
    let mut writer = csv::Writer::from_writer(vec![]);

    writer
        .write_record(fields)
        .map_err(|source| BackendError::ExportFailed { source })?;

    let line = writer.into_inner().map_err(|e| BackendError::ExportFailed {
        source: e.into_error().into(),
    })?;

    Ok(Bytes::from(line))
}

/// Produces the export body: the header line, then one line per
/// document as it arrives.
///
/// `first` is the document already pulled off `rest` to make sure the
/// query worked. The stream ends right after the first error, which
/// truncates the download.
pub fn lines(
    logger: Arc<Logger>,
    first: Option<RawDocument>,
    rest: BoxStream<'static, Result<RawDocument, BackendError>>,
) -> Result<impl Stream<Item = Result<Bytes, BackendError>> + Send + 'static, BackendError> {
    let header = encode(HEADER.iter())?;

    let rows = stream::iter(first.map(Ok))
        .chain(rest)
        .and_then(|document| future::ready(encode(row(&document).iter())));

    Ok(stream::once(future::ready(Ok(header)))
        .chain(rows)
        .scan(false, |failed, line| {
            if *failed {
                return future::ready(None);
            }

            *failed = line.is_err();
            future::ready(Some(line))
        })
        .inspect_err(move |e| {
            error!(logger, "Export truncated"; "error" => %e);
        }))
}
