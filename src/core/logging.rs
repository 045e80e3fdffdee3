//! Logging configuration and initialization
//!
//! Sets up the tracing subscriber used by the server and the RAG pipeline.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Levels accepted in the `[server] log_level` setting
const VALID_LEVELS: [&str; 7] = ["trace", "debug", "info", "warning", "warn", "error", "critical"];

/// Normalize a configured log level to a `tracing` directive
///
/// Only the first word is considered so trailing comments are tolerated.
/// Unknown values fall back to "info".
pub fn normalize_level(log_level: &str) -> &'static str {
    let level = log_level
        .split_whitespace()
        .next()
        .unwrap_or("info")
        .to_lowercase();

    if !VALID_LEVELS.contains(&level.as_str()) {
        return "info";
    }

    match level.as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "warning" | "warn" => "warn",
        "error" | "critical" => "error",
        _ => "info",
    }
}

/// Initialize the logging system with the specified level
///
/// `RUST_LOG` takes precedence over the configured level when set.
pub fn init_logging(log_level: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(normalize_level(log_level)));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
