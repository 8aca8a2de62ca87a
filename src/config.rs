use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_CONNECTION_STRING: &str = "postgres://localhost:5432/emogo";
pub const DEFAULT_COLLECTION: &str = "datacsv";
pub const DEFAULT_EXPORT_NAME: &str = "emogo_data";

/// Returns the value of the named environment variable, or `default`
/// if it is unset.
pub fn get_variable_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_owned())
}

/// Parses the named environment variable, falling back to `default`
/// if it is unset. Panics if it is set but cannot be parsed.
pub fn parse_variable_or<T>(name: &str, default: T) -> T
where
    T: FromStr,
    T::Err: Display,
{
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .unwrap_or_else(|e| panic!("parse {} ({:?}): {}", name, value, e)),
        Err(_) => default,
    }
}

/// Like [`parse_variable_or`], for counts that must be at least 1.
pub fn get_count_or(name: &str, default: u32) -> u32 {
    match parse_variable_or(name, default) {
        0 => panic!("{} must be at least 1", name),
        n => n,
    }
}

/// Reads a whole number of seconds from the named environment variable.
pub fn get_duration_or(name: &str, default_seconds: u64) -> Duration {
    Duration::from_secs(parse_variable_or(name, default_seconds))
}
