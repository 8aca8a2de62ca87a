use std::env;
use std::sync::Mutex;

use slog::{Drain, Fuse, Level, LevelFilter};
use slog_async::Async;
use slog_json::Json;

pub use slog::{debug, error, info, o, trace, warn, Discard, Logger};

/// The environment variable holding the minimum level to emit.
pub const LEVEL_VARIABLE: &str = "BACKEND_LOG_LEVEL";

/// Builds the root logger: JSON lines on stderr, written from a
/// background thread, filtered by [`LEVEL_VARIABLE`].
pub fn initialize_logger() -> Logger {
    let level = env::var(LEVEL_VARIABLE)
        .ok()
        .and_then(|l| parse_level(&l))
        .unwrap_or(Level::Info);

    let drain = Mutex::new(Json::default(std::io::stderr())).map(Fuse);
    let drain = LevelFilter::new(drain, level).fuse();
    let drain = Async::new(drain).build().fuse();

    Logger::root(
        drain,
        o!("service" => info::NAME, "version" => info::VERSION, "revision" => info::REVISION, "build_timestamp" => info::BUILD_TIMESTAMP),
    )
}

/// Accepts the level names `slog` uses, in any case, plus `warning`.
pub fn parse_level(name: &str) -> Option<Level> {
    match name.trim().to_ascii_lowercase().as_str() {
        "trace" => Some(Level::Trace),
        "debug" => Some(Level::Debug),
        "info" => Some(Level::Info),
        "warn" | "warning" => Some(Level::Warning),
        "error" => Some(Level::Error),
        "critical" => Some(Level::Critical),
        _ => None,
    }
}
