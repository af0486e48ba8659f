//! Structured logging setup for minapack
//!
//! Diagnostics go to stderr through `tracing`, so that build output on
//! stdout stays clean. `RUST_LOG` overrides the configured level.
//!
//! # Example
//!
//! ```no_run
//! use minapack::util::logging::{self, LoggingConfig};
//! use tracing::{debug, info};
//!
//! logging::init_logging(LoggingConfig::for_cli(Some("debug"), false, false));
//!
//! info!("Build started");
//! debug!(platform = "wx", "Preparing context");
//! ```

use std::env;
use std::io;
use std::str::FromStr;
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

const LEVEL_ENV: &str = "MINAPACK_LOG_LEVEL";
const JSON_ENV: &str = "MINAPACK_LOG_JSON";
const HOSTED_ENV: &str = "MINAPACK_HOSTED";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines
    Pretty,
    /// One JSON object per event, for hosted runs
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: Level,
    pub format: LogFormat,
    /// Include the module target (e.g., minapack::merge) in logs
    pub include_target: bool,
    /// Include file and line number information
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::with_level(Level::INFO)
    }
}

impl LoggingConfig {
    pub fn with_level(level: Level) -> Self {
        Self {
            level,
            format: LogFormat::Pretty,
            include_target: true,
            include_location: false,
        }
    }

    /// JSON output with full metadata
    pub fn hosted(level: Level) -> Self {
        Self {
            level,
            format: LogFormat::Json,
            include_target: true,
            include_location: true,
        }
    }

    /// Level precedence: `--log-level`, then `-v`/`-q`, then
    /// `MINAPACK_LOG_LEVEL`. Hosted runs and `MINAPACK_LOG_JSON` switch to JSON.
    pub fn for_cli(log_level: Option<&str>, verbose: bool, quiet: bool) -> Self {
        let level = match log_level {
            Some(level) => parse_level(level),
            None if verbose => Level::DEBUG,
            None if quiet => Level::ERROR,
            None => env::var(LEVEL_ENV)
                .map(|level| parse_level(&level))
                .unwrap_or(Level::INFO),
        };

        if env_flag(HOSTED_ENV) {
            Self::hosted(level)
        } else if env_flag(JSON_ENV) {
            Self {
                format: LogFormat::Json,
                ..Self::with_level(level)
            }
        } else {
            Self::with_level(level)
        }
    }
}

fn env_flag(key: &str) -> bool {
    env::var(key)
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

/// Parses a log level, falling back to INFO with a notice on stderr
///
/// ```
/// use minapack::util::logging::parse_level;
/// use tracing::Level;
///
/// assert_eq!(parse_level("debug"), Level::DEBUG);
/// assert_eq!(parse_level("WARN"), Level::WARN);
/// assert_eq!(parse_level("loud"), Level::INFO);
/// ```
pub fn parse_level(level_str: &str) -> Level {
    Level::from_str(level_str.trim()).unwrap_or_else(|_| {
        eprintln!(
            "Invalid log level '{}', defaulting to INFO. Valid levels: trace, debug, info, warn, error",
            level_str
        );
        Level::INFO
    })
}

fn build_filter(level: Level) -> EnvFilter {
    if env::var("RUST_LOG").is_ok() {
        return EnvFilter::from_default_env();
    }
    EnvFilter::try_new(format!("warn,minapack={}", level))
        .unwrap_or_else(|_| EnvFilter::new(level.to_string()))
}

/// Installs the global subscriber. Only the first call has an effect.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let (json, pretty) = match config.format {
            LogFormat::Json => (
                Some(
                    fmt::layer()
                        .json()
                        .with_writer(io::stderr)
                        .with_target(config.include_target)
                        .with_file(config.include_location)
                        .with_line_number(config.include_location),
                ),
                None,
            ),
            LogFormat::Pretty => (
                None,
                Some(
                    fmt::layer()
                        .with_writer(io::stderr)
                        .with_target(config.include_target)
                        .with_file(config.include_location)
                        .with_line_number(config.include_location),
                ),
            ),
        };

        tracing_subscriber::registry()
            .with(build_filter(config.level))
            .with(json)
            .with(pretty)
            .init();
    });
}
