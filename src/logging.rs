// SPDX-License-Identifier: MIT
// Copyright 2026 Tyler Zervas

//! Logging setup and structured event helpers.
//!
//! Events are emitted with `tracing` under these targets:
//!
//! | Target | Emitted by |
//! |--------|------------|
//! | `openvinojs::memory` | heap allocation, free and usage snapshots |
//! | `openvinojs::marshal` | tensor copies into native memory |
//! | `openvinojs::inference` | native inference calls and their duration |
//! | `openvinojs::runtime` | model loading |
//! | `openvinojs::fs` | virtual filesystem uploads |
//!
//! Library code only emits events. Installing a subscriber is left to the
//! embedding application, which can call [`init_logging`] or bring its own.
//! The `RUST_LOG` environment variable always overrides the configured
//! level, e.g. `RUST_LOG=openvinojs::memory=trace`.

use std::sync::Once;
use std::time::Duration;

use crate::shape::Shape;

/// Configuration for logging initialization.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Default log level when `RUST_LOG` is not set.
    pub default_level: LogLevel,
    /// Include timestamps in log output.
    pub with_timestamps: bool,
    /// Include target (module path) in log output.
    pub with_target: bool,
    /// Include source file and line numbers.
    pub with_file_line: bool,
    /// Use ANSI colors (disable for file output).
    pub with_ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            default_level: LogLevel::Info,
            with_timestamps: true,
            with_target: true,
            with_file_line: false,
            with_ansi: true,
        }
    }
}

impl LogConfig {
    /// Create a new logging configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default log level.
    #[must_use]
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.default_level = level;
        self
    }

    /// Enable or disable timestamps.
    #[must_use]
    pub fn with_timestamps(mut self, enable: bool) -> Self {
        self.with_timestamps = enable;
        self
    }

    /// Enable or disable ANSI colors.
    #[must_use]
    pub fn with_ansi(mut self, enable: bool) -> Self {
        self.with_ansi = enable;
        self
    }

    /// Verbose output with file/line info, for working on a backend.
    #[must_use]
    pub fn development() -> Self {
        Self {
            default_level: LogLevel::Debug,
            with_timestamps: true,
            with_target: true,
            with_file_line: true,
            with_ansi: true,
        }
    }

    /// Plain output for log ingestion.
    #[must_use]
    pub fn production() -> Self {
        Self {
            default_level: LogLevel::Info,
            with_timestamps: true,
            with_target: false,
            with_file_line: false,
            with_ansi: false,
        }
    }

    /// Minimal output, captured by the test harness.
    #[must_use]
    pub fn testing() -> Self {
        Self {
            default_level: LogLevel::Warn,
            with_timestamps: false,
            with_target: false,
            with_file_line: false,
            with_ansi: false,
        }
    }
}

/// Log level enumeration. Maps to tracing levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Errors only.
    Error,
    /// Warnings and above.
    Warn,
    /// Informational messages and above.
    #[default]
    Info,
    /// Debug messages and above.
    Debug,
    /// All messages including trace.
    Trace,
}

impl LogLevel {
    /// Convert to a tracing filter string.
    fn as_filter_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }

    /// Parse a level name, case-insensitively.
    ///
    /// Unrecognized names yield `None`.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "error" => Some(Self::Error),
            "warn" | "warning" => Some(Self::Warn),
            "info" => Some(Self::Info),
            "debug" => Some(Self::Debug),
            "trace" => Some(Self::Trace),
            _ => None,
        }
    }
}

static INIT_LOGGING: Once = Once::new();

/// Install the global tracing subscriber.
///
/// Only the first call has an effect; later calls return immediately.
///
/// ## Example
///
/// ```rust
/// use openvinojs_core::{init_logging, LogConfig};
///
/// init_logging(&LogConfig::testing());
/// // No-op
/// init_logging(&LogConfig::development());
/// ```
pub fn init_logging(config: &LogConfig) {
    INIT_LOGGING.call_once(|| {
        let filter = std::env::var("RUST_LOG")
            .unwrap_or_else(|_| config.default_level.as_filter_str().to_string());

        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(config.with_ansi)
            .with_target(config.with_target)
            .with_file(config.with_file_line)
            .with_line_number(config.with_file_line);

        // try_init: an embedding application may already own the global subscriber
        let installed = if config.with_timestamps {
            builder.try_init()
        } else {
            builder.without_time().try_init()
        };
        if installed.is_err() {
            tracing::debug!("global subscriber already installed");
        }
    });
}

/// Log a snapshot of native heap usage.
///
/// ## Arguments
///
/// * `allocated_bytes` - Currently allocated bytes
/// * `peak_bytes` - Peak allocation
/// * `live_allocations` - Blocks not yet freed
/// * `context` - What operation the snapshot follows
#[allow(clippy::cast_precision_loss)]
pub fn log_heap_usage(
    allocated_bytes: usize,
    peak_bytes: usize,
    live_allocations: usize,
    context: &str,
) {
    let allocated_kb = allocated_bytes as f64 / 1024.0;
    let peak_kb = peak_bytes as f64 / 1024.0;

    tracing::debug!(
        target: "openvinojs::memory",
        allocated_kb = format!("{allocated_kb:.2}"),
        peak_kb = format!("{peak_kb:.2}"),
        live_allocations,
        context,
        "heap usage"
    );
}

/// Log one native inference call.
pub fn log_inference(precision: &str, shape: &Shape, elapsed: Duration, produced_output: bool) {
    let elapsed_ms = elapsed.as_secs_f64() * 1000.0;

    tracing::debug!(
        target: "openvinojs::inference",
        precision,
        shape = %shape,
        elapsed_ms = format!("{elapsed_ms:.3}"),
        produced_output,
        "inference time"
    );
}

pub use tracing::{debug, error, info, trace, warn};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_config_default() {
        let config = LogConfig::default();
        assert!(matches!(config.default_level, LogLevel::Info));
        assert!(config.with_timestamps);
        assert!(config.with_ansi);
    }

    #[test]
    fn test_log_config_builder() {
        let config = LogConfig::new()
            .with_level(LogLevel::Debug)
            .with_timestamps(false)
            .with_ansi(false);

        assert!(matches!(config.default_level, LogLevel::Debug));
        assert!(!config.with_timestamps);
        assert!(!config.with_ansi);
    }

    #[test]
    fn test_log_config_presets() {
        let dev = LogConfig::development();
        assert!(matches!(dev.default_level, LogLevel::Debug));
        assert!(dev.with_file_line);

        let prod = LogConfig::production();
        assert!(!prod.with_ansi);
        assert!(!prod.with_target);

        let test = LogConfig::testing();
        assert!(matches!(test.default_level, LogLevel::Warn));
        assert!(!test.with_timestamps);
    }

    #[test]
    fn test_log_level_parse() {
        assert_eq!(LogLevel::parse("TRACE"), Some(LogLevel::Trace));
        assert_eq!(LogLevel::parse("warning"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::parse("verbose"), None);
        assert_eq!(LogLevel::Error.as_filter_str(), "error");
    }

    #[test]
    fn test_helpers_without_subscriber() {
        log_heap_usage(4096, 8192, 2, "after compile");
        log_inference("uint8", &Shape::from_dims(&[1, 3]), Duration::from_micros(1500), true);
    }
}
