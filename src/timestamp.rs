//! Reformatting of stored timestamps.
//!
//! Records carry their timestamp as text such as `2025-11-2707:35:33`:
//! a ten-character date immediately followed by an eight-character
//! time. Pages and exports show it as `2025/11/27 07:35:33`. The two
//! renderers disagree on what to show when the text does not parse,
//! so each gets its own entry point.

use time::PrimitiveDateTime;

/// The layout timestamps are stored in.
pub const STORED_FORMAT: &str = "%Y-%m-%d%H:%M:%S";

/// The layout timestamps are displayed in.
pub const DISPLAY_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// Appended to timestamps the HTML listing could not parse.
pub const FORMAT_ERROR_MARKER: &str = " (format error)";

/// Parses `raw` as a stored timestamp and renders it for display.
///
/// The whole of `raw` must be in the stored layout: a sign, a longer
/// year or anything left over after the seconds is rejected.
pub fn reformat(raw: &str) -> Option<String> {
    PrimitiveDateTime::parse(raw, STORED_FORMAT)
        .ok()
        .filter(|t| t.format(STORED_FORMAT) == raw)
        .map(|t| t.format(DISPLAY_FORMAT))
}

/// Display form for the HTML listing; unparsable input is shown with a
/// visible marker.
pub fn for_listing(raw: &str) -> String {
    reformat(raw).unwrap_or_else(|| format!("{}{}", raw, FORMAT_ERROR_MARKER))
}

/// Display form for the CSV export; unparsable input is passed through.
pub fn for_export(raw: &str) -> String {
    reformat(raw).unwrap_or_else(|| raw.to_owned())
}
