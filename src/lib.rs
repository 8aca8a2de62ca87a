pub mod config;
pub mod db;
pub mod environment;
pub mod errors;
pub mod record;
pub mod render;
pub mod routes;
pub mod sentiment;
pub mod timestamp;
