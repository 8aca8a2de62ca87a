//! Presentation of records: an HTML table for browsing and a CSV file
//! for download.

pub mod export;
pub mod table;
