//! Logging setup.
//!
//! Installs a global `tracing` subscriber with:
//! - Environment-based level filtering (`RUST_LOG` wins over the config)
//! - Human-readable console output or JSON structured logs

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

use crate::config::LoggingConfig;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable console output (for development).
    Console,
    /// JSON structured logging (for production).
    Json,
}

impl LogFormat {
    /// Parse a format name; anything but `"json"` is console output.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Console,
        }
    }
}

/// Resolved logging settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    /// Filter directive (e.g., "info", "qplace_engine=debug").
    pub filter: String,
    /// Output format.
    pub format: LogFormat,
}

impl From<&LoggingConfig> for LogSettings {
    fn from(config: &LoggingConfig) -> Self {
        Self {
            filter: config.level.clone(),
            format: LogFormat::parse(&config.format),
        }
    }
}

impl LogSettings {
    /// Settings from environment variables.
    ///
    /// - `RUST_LOG`: filter directive (default: "info")
    /// - `QPLACE_LOG_FORMAT`: "console" or "json" (default: "console")
    pub fn from_env() -> Self {
        Self {
            filter: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            format: std::env::var("QPLACE_LOG_FORMAT")
                .map_or(LogFormat::Console, |f| LogFormat::parse(&f)),
        }
    }
}

/// Install the global subscriber.
///
/// Fails (without panicking) if a global subscriber is already set.
pub fn init_logging(settings: &LogSettings) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = match settings.format {
        LogFormat::Console => fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(true)
            .with_line_number(true)
            .pretty()
            .boxed(),
        LogFormat::Json => fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .json()
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
