//! Logging initialization.
//!
//! Library code only emits `tracing` events. Hosts call [`init_logging`] once
//! at startup to install a subscriber.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Output format for the installed subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    Pretty,
    /// Structured JSONL.
    Json,
}

impl LogFormat {
    fn from_env() -> Self {
        match std::env::var("ECENCY_LOG_FORMAT")
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase()
            .as_str()
        {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

/// Initialize the global tracing subscriber.
///
/// The filter comes from `RUST_LOG` when set, otherwise from `level`.
/// Calling this more than once is harmless.
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(parse_level(level).as_str().to_ascii_lowercase()));

    let result = match LogFormat::from_env() {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_current_span(false))
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .try_init(),
    };

    if result.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}

/// Map a level name to a [`tracing::Level`]. Unknown names mean INFO.
pub fn parse_level(level: &str) -> tracing::Level {
    let name = level.trim().to_ascii_lowercase();
    match name.as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "warn" | "warning" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::Level;

    #[test]
    fn test_level_names() {
        let cases = [
            ("trace", Level::TRACE),
            ("debug", Level::DEBUG),
            ("info", Level::INFO),
            ("warning", Level::WARN),
            ("error", Level::ERROR),
        ];
        for (name, expected) in cases {
            assert_eq!(parse_level(name), expected, "{name}");
        }
    }

    #[test]
    fn test_level_names_ignore_case_and_padding() {
        assert_eq!(parse_level(" DEBUG "), Level::DEBUG);
        assert_eq!(parse_level("Warn"), Level::WARN);
    }

    #[test]
    fn test_unrecognized_level_is_info() {
        assert_eq!(parse_level(""), Level::INFO);
        assert_eq!(parse_level("loud"), Level::INFO);
    }

    #[test]
    fn test_repeated_init_is_harmless() {
        init_logging("debug");
        init_logging("info");
    }
}
