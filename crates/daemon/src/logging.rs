//! Logging setup
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: filter directives (default: `pushq=info`)
//! - `PUSHQ_LOG_FORMAT`: `pretty` (default) or `json`
//! - `PUSHQ_LOG_DIR`: also write plain-text logs to a daily rolling file here

use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LOG_FILTER: &str = "pushq=info";
const LOG_FILE_PREFIX: &str = "pushq-worker.log";

/// Initialize the global subscriber.
///
/// The returned guard flushes the file writer on drop; keep it alive for
/// the whole process.
pub fn init_logging() -> Result<Option<WorkerGuard>> {
    let log_format = std::env::var("PUSHQ_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_LOG_FILTER))?;

    let (file_layer, guard) = match std::env::var("PUSHQ_LOG_DIR") {
        Ok(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        Err(_) => (None, None),
    };

    match log_format.as_str() {
        "json" => {
            // Production: JSON structured logging
            tracing_subscriber::registry()
                .with(env_filter)
                .with(file_layer)
                .with(fmt::layer().json())
                .try_init()?;
        }
        _ => {
            // Development: Pretty formatting with colors
            tracing_subscriber::registry()
                .with(env_filter)
                .with(file_layer)
                .with(fmt::layer().pretty())
                .try_init()?;
        }
    }

    Ok(guard)
}
