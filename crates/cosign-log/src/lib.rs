//! Logging setup for the cosign coordinator.
//!
//! Re-exports the tracing macros so the other crates log through one place,
//! and installs the global subscriber for the binary and for tests.

use std::fmt;
use std::str::FromStr;

pub use tracing::{debug, error, info, instrument, span, trace, warn, Level, Span};
pub use tracing_subscriber::{fmt as fmt_layer, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Error raised when the subscriber cannot be installed
pub type InitError = Box<dyn std::error::Error + Send + Sync>;

/// Output format of the global subscriber, always written to stderr
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Structured JSON, one event per line
    #[default]
    Json,
    /// Human readable single-line output
    Text,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "text" | "pretty" => Ok(LogFormat::Text),
            other => Err(format!("unknown log format:: {other}")),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Json => f.write_str("json"),
            LogFormat::Text => f.write_str("text"),
        }
    }
}

/// Initialize the global subscriber from `RUST_LOG`, defaulting to `info`
pub fn init_tracing(format: LogFormat) -> Result<(), InitError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    install(filter, format)
}

/// Initialize the global subscriber with a specific level filter
pub fn init_tracing_with_level(level: &str, format: LogFormat) -> Result<(), InitError> {
    let filter = EnvFilter::try_new(level)?;
    install(filter, format)
}

/// Initialize tracing for tests with simplified output
pub fn init_tracing_test() -> Result<(), InitError> {
    tracing_subscriber::registry()
        .with(EnvFilter::new("debug"))
        .with(fmt_layer::layer().with_test_writer())
        .try_init()?;

    Ok(())
}

fn install(filter: EnvFilter, format: LogFormat) -> Result<(), InitError> {
    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt_layer::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true)
                    .json(),
            )
            .try_init()?,
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt_layer::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .compact(),
            )
            .try_init()?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parsing() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("TEXT".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert_eq!("pretty".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert!("xml".parse::<LogFormat>().is_err());
        assert_eq!(LogFormat::default().to_string(), "json");
    }

    #[test]
    fn test_invalid_level_rejected() {
        assert!(init_tracing_with_level("cosign=loud", LogFormat::Text).is_err());
    }

    #[test]
    #[tracing::instrument]
    fn test_instrument_attribute() {
        let _ = init_tracing_test();
        info!(safe = "0xabc", "instrumented");
    }
}
