use html_escape::{encode_double_quoted_attribute as attribute, encode_text as text};

use crate::record::Record;
use crate::sentiment;
use crate::timestamp;

/// Marks the table rows that hold records.
pub const ROW_CLASS: &str = "vlog-row";

/// Marks the row shown when there are no records.
pub const PLACEHOLDER_ID: &str = "no-data";

/// Where the export button points.
pub const EXPORT_PATH: &str = "/download-csv";

const SHELL_HEAD: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>EmoGo Data Download</title>
    <script src="https://cdn.tailwindcss.com"></script>
    <style>
        body { font-family: 'Inter', sans-serif; background-color: #f3f4f6; }
        @media (max-width: 640px) {
            table, thead, tbody, th, td, tr { display: block; }
            thead tr { position: absolute; top: -9999px; left: -9999px; }
            tr { border: 1px solid #ccc; margin-bottom: 0.5rem; }
            td { border: none; border-bottom: 1px solid #eee; position: relative; padding-left: 50%; text-align: right; }
            td::before { position: absolute; top: 0; left: 6px; width: 45%; padding-right: 10px; white-space: nowrap; text-align: left; font-weight: 600; color: #4b5563; }
            td:nth-of-type(1)::before { content: "User ID"; }
            td:nth-of-type(2)::before { content: "Timestamp"; }
            td:nth-of-type(3)::before { content: "Sentiment"; }
            td:nth-of-type(4)::before { content: "GPS Coords"; }
            td:nth-of-type(5)::before { content: "Video"; }
        }
    </style>
</head>
<body>
"#;

const SHELL_TAIL: &str = "\n</body>\n</html>\n";

const TABLE_HEAD: &str = r#"<thead class="bg-gray-100">
                    <tr>
                        <th class="px-4 py-3 text-left text-xs font-medium text-gray-500 uppercase tracking-wider">User ID</th>
                        <th class="px-4 py-3 text-left text-xs font-medium text-gray-500 uppercase tracking-wider">Timestamp</th>
                        <th class="px-4 py-3 text-left text-xs font-medium text-gray-500 uppercase tracking-wider">Sentiment</th>
                        <th class="px-4 py-3 text-left text-xs font-medium text-gray-500 uppercase tracking-wider">GPS Coords</th>
                        <th class="px-4 py-3 text-left text-xs font-medium text-gray-500 uppercase tracking-wider">Video</th>
                    </tr>
                </thead>"#;

/// Wraps `content` in the page shell.
pub fn shell(content: &str) -> String {
    [SHELL_HEAD, content, SHELL_TAIL].concat()
}

/// Renders the listing page for `records`, which should already be
/// capped to the page size.
pub fn render_page(records: &[Record], year: i32) -> String {
    let export = if records.is_empty() {
        String::new()
    } else {
        format!(
            r#"<a href="{}" class="inline-block mt-4 px-4 py-2 bg-white text-blue-700 font-semibold rounded-lg shadow">Download CSV</a>"#,
            EXPORT_PATH
        )
    };

    let content = format!(
        r#"<div class="max-w-7xl mx-auto p-4 sm:p-6 lg:p-8">
        <header class="mb-8 p-6 bg-blue-600 rounded-xl shadow-lg">
            <h1 class="text-4xl font-extrabold text-white">EmoGo Data Download Portal</h1>
            <p class="mt-2 text-xl text-blue-200">Public access to the latest collected vlogs.</p>
            <p class="mt-2 text-sm text-blue-300">Showing {count} records.</p>
            {export}
        </header>
        <div class="bg-white shadow-xl rounded-xl overflow-hidden">
            <div class="p-6 bg-gray-50 border-b border-gray-200">
                <h2 class="text-2xl font-semibold text-gray-800">Latest records</h2>
            </div>
            <div class="overflow-x-auto">
                <table class="min-w-full divide-y divide-gray-200">
                {head}
                <tbody class="bg-white divide-y divide-gray-200">
{rows}
                </tbody>
                </table>
            </div>
        </div>
        {footer}
    </div>"#,
        count = records.len(),
        export = export,
        head = TABLE_HEAD,
        rows = render_rows(records),
        footer = footer(year),
    );

    shell(&content)
}

/// Renders one row per record, or the placeholder row if there are none.
pub fn render_rows(records: &[Record]) -> String {
    if records.is_empty() {
        return format!(
            r#"<tr id="{}">
    <td colspan="5" class="px-4 py-12 text-center text-gray-500 text-lg">
        <p>No records found.</p>
    </td>
</tr>"#,
            PLACEHOLDER_ID
        );
    }

    records.iter().map(render_row).collect::<Vec<_>>().join("\n")
}

pub fn render_row(record: &Record) -> String {
    let sentiment = sentiment::resolve(record.sentiment);

    format!(
        r#"<tr class="{class} border-b hover:bg-gray-50">
    <td class="px-4 py-3 text-sm font-medium text-gray-900">{user}</td>
    <td class="px-4 py-3 text-sm text-gray-500">{timestamp}</td>
    <td class="px-4 py-3 text-sm text-gray-900"><span class="font-semibold {hint}">{label}</span> ({code})</td>
    <td class="px-4 py-3 text-sm text-gray-500">{coordinates}</td>
    <td class="px-4 py-3 text-sm font-mono text-gray-700"><a href="{path}" download="vlog_{id}.mp4" class="text-blue-500 hover:text-blue-700 font-medium" target="_blank">Download/Play</a></td>
</tr>"#,
        class = ROW_CLASS,
        user = text(&record.user_id.to_string()),
        timestamp = text(&timestamp::for_listing(&record.timestamp)),
        hint = sentiment.hint,
        label = sentiment.label,
        code = record.sentiment,
        coordinates = format_coordinates(record.lat, record.lng),
        path = attribute(&record.vlog_path),
        id = attribute(&record.id),
    )
}

/// Formats a coordinate pair to six decimal places.
pub fn format_coordinates(lat: f64, lng: f64) -> String {
    format!("{:.6}, {:.6}", lat, lng)
}

/// Shown when the store cannot be reached.
pub fn render_unavailable_page() -> String {
    shell(r#"<h1 class="p-6 text-2xl font-bold text-red-700">Error: database connection unavailable. Check the connection settings.</h1>"#)
}

/// Shown when the store is reachable but the listing failed.
pub fn render_error_page(message: &str, year: i32) -> String {
    let content = format!(
        r#"<div class="max-w-7xl mx-auto p-4 sm:p-6 lg:p-8">
        <div class="p-6 bg-red-100 border-l-4 border-red-500 text-red-700">
            <p class="font-bold">Database Error</p>
            <p>Could not load records. Check the database connection and collection name.</p>
            <p class="text-xs mt-2">Details: {message}</p>
        </div>
        {footer}
    </div>"#,
        message = text(message),
        footer = footer(year),
    );

    shell(&content)
}

fn footer(year: i32) -> String {
    format!(
        r#"<footer class="mt-10 pt-6 border-t border-gray-200 text-center text-sm text-gray-500">
            <p>&copy; {} EmoGo Backend.</p>
        </footer>"#,
        year
    )
}
