//! Build metadata reported by the logger and the admin health check.

pub const NAME: &str = "vlog-backend";

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Source revision, injected by the deployment pipeline.
pub const REVISION: Option<&str> = option_env!("BACKEND_REVISION");

pub const BUILD_TIMESTAMP: Option<&str> = option_env!("BUILD_TIMESTAMP");
