//! Configuration management for minapack
//!
//! Settings are loaded from environment variables with defaults.
//!
//! # Environment Variables
//!
//! - `MINAPACK_CACHE_DIR`: Merge cache root, relative to the project - default: ".CACHE"
//! - `MINAPACK_MERGE_CONCURRENCY`: Concurrent copies per merge phase - default: "32"
//! - `MINAPACK_COLLISION_POLICY`: Flattened-path collisions (last-wins|first-wins|error) - default: "last-wins"
//! - `MINAPACK_HOSTED`: Hosted mode; the first compile error fails the build - default: "false"
//! - `MINAPACK_COMPILER`: Command line of the external bundler - no default
//! - `MINAPACK_SCAFFOLD_TEMPLATE`: Template directory for the legacy web shell - no default
//! - `MINAPACK_LOG_LEVEL`: Logging level - default: "info"
//!
//! # Example
//!
//! ```no_run
//! use minapack::MinapackConfig;
//!
//! let config = MinapackConfig::from_env().expect("malformed environment");
//! config.validate().expect("Invalid configuration");
//! println!("{}", config);
//! ```

use crate::merge::{CollisionPolicy, DEFAULT_MERGE_CONCURRENCY};
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

const DEFAULT_CACHE_DIR: &str = ".CACHE";
const DEFAULT_LOG_LEVEL: &str = "info";
const MAX_MERGE_CONCURRENCY: usize = 1024;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    /// Failed to parse configuration value
    #[error("Failed to parse {field}: {error}")]
    ParseError { field: String, error: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct MinapackConfig {
    /// Merge cache root; relative paths resolve against the project
    pub cache_dir: PathBuf,

    /// Upper bound on concurrent copies in one merge phase
    pub merge_concurrency: usize,

    pub collision_policy: CollisionPolicy,

    /// Hosted mode turns the first compile error into a failed build
    pub hosted: bool,

    /// External bundler command line
    pub compiler: Option<String>,

    /// Legacy web shell template directory
    pub scaffold_template: Option<PathBuf>,

    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
}

fn parse_var<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::ParseError {
                field: key.to_string(),
                error: e.to_string(),
            }),
        Err(_) => Ok(None),
    }
}

fn parse_flag(key: &str) -> Result<Option<bool>, ConfigError> {
    match env::var(key) {
        Ok(raw) => match raw.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" => Ok(Some(true)),
            "0" | "false" | "no" | "" => Ok(Some(false)),
            other => Err(ConfigError::ParseError {
                field: key.to_string(),
                error: format!("expected a boolean, got {}", other),
            }),
        },
        Err(_) => Ok(None),
    }
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Default for MinapackConfig {
    /// Loads from the environment; malformed values fall back to defaults
    fn default() -> Self {
        Self {
            cache_dir: non_empty("MINAPACK_CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_DIR)),
            merge_concurrency: parse_var("MINAPACK_MERGE_CONCURRENCY")
                .ok()
                .flatten()
                .unwrap_or(DEFAULT_MERGE_CONCURRENCY),
            collision_policy: parse_var("MINAPACK_COLLISION_POLICY")
                .ok()
                .flatten()
                .unwrap_or_default(),
            hosted: parse_flag("MINAPACK_HOSTED").ok().flatten().unwrap_or(false),
            compiler: non_empty("MINAPACK_COMPILER"),
            scaffold_template: non_empty("MINAPACK_SCAFFOLD_TEMPLATE").map(PathBuf::from),
            log_level: env::var("MINAPACK_LOG_LEVEL")
                .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
                .to_lowercase(),
        }
    }
}

impl MinapackConfig {
    /// Loads from the environment, rejecting malformed values
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            merge_concurrency: parse_var("MINAPACK_MERGE_CONCURRENCY")?
                .unwrap_or(DEFAULT_MERGE_CONCURRENCY),
            collision_policy: parse_var("MINAPACK_COLLISION_POLICY")?.unwrap_or_default(),
            hosted: parse_flag("MINAPACK_HOSTED")?.unwrap_or(false),
            ..defaults
        })
    }

    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if any value is out of range
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.merge_concurrency == 0 {
            return Err(ConfigError::ValidationFailed(
                "Merge concurrency must be at least 1".to_string(),
            ));
        }
        if self.merge_concurrency > MAX_MERGE_CONCURRENCY {
            return Err(ConfigError::ValidationFailed(format!(
                "Merge concurrency cannot exceed {}",
                MAX_MERGE_CONCURRENCY
            )));
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                    self.log_level
                )))
            }
        }

        Ok(())
    }

    /// Absolute cache root for `project_dir`
    pub fn cache_root(&self, project_dir: &Path) -> PathBuf {
        if self.cache_dir.is_absolute() {
            self.cache_dir.clone()
        } else {
            project_dir.join(&self.cache_dir)
        }
    }
}

impl fmt::Display for MinapackConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Minapack Configuration:")?;
        writeln!(f, "  Cache Dir: {}", self.cache_dir.display())?;
        writeln!(f, "  Merge Concurrency: {}", self.merge_concurrency)?;
        writeln!(f, "  Collision Policy: {}", self.collision_policy)?;
        writeln!(f, "  Hosted: {}", self.hosted)?;
        if let Some(ref compiler) = self.compiler {
            writeln!(f, "  Compiler: {}", compiler)?;
        }
        if let Some(ref template) = self.scaffold_template {
            writeln!(f, "  Scaffold Template: {}", template.display())?;
        }
        writeln!(f, "  Log Level: {}", self.log_level)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    /// Helper to temporarily set environment variables for testing
    struct EnvGuard {
        key: String,
        old_value: Option<String>,
    }

    impl EnvGuard {
        fn set(key: &str, value: &str) -> Self {
            let old_value = env::var(key).ok();
            env::set_var(key, value);
            Self {
                key: key.to_string(),
                old_value,
            }
        }

        fn unset(key: &str) -> Self {
            let old_value = env::var(key).ok();
            env::remove_var(key);
            Self {
                key: key.to_string(),
                old_value,
            }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            match &self.old_value {
                Some(v) => env::set_var(&self.key, v),
                None => env::remove_var(&self.key),
            }
        }
    }

    const ALL_KEYS: &[&str] = &[
        "MINAPACK_CACHE_DIR",
        "MINAPACK_MERGE_CONCURRENCY",
        "MINAPACK_COLLISION_POLICY",
        "MINAPACK_HOSTED",
        "MINAPACK_COMPILER",
        "MINAPACK_SCAFFOLD_TEMPLATE",
        "MINAPACK_LOG_LEVEL",
    ];

    fn clear_all() -> Vec<EnvGuard> {
        ALL_KEYS.iter().map(|key| EnvGuard::unset(key)).collect()
    }

    #[test]
    #[serial]
    fn test_default_configuration() {
        let _guards = clear_all();

        let config = MinapackConfig::default();

        assert_eq!(config.cache_dir, PathBuf::from(DEFAULT_CACHE_DIR));
        assert_eq!(config.merge_concurrency, DEFAULT_MERGE_CONCURRENCY);
        assert_eq!(config.collision_policy, CollisionPolicy::LastWins);
        assert!(!config.hosted);
        assert!(config.compiler.is_none());
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_environment_variable_parsing() {
        let _cleared = clear_all();
        let _guards = vec![
            EnvGuard::set("MINAPACK_CACHE_DIR", "/var/cache/minapack"),
            EnvGuard::set("MINAPACK_MERGE_CONCURRENCY", "8"),
            EnvGuard::set("MINAPACK_COLLISION_POLICY", "first-wins"),
            EnvGuard::set("MINAPACK_HOSTED", "1"),
            EnvGuard::set("MINAPACK_COMPILER", "node build.js"),
            EnvGuard::set("MINAPACK_LOG_LEVEL", "DEBUG"),
        ];

        let config = MinapackConfig::from_env().unwrap();

        assert_eq!(config.cache_dir, PathBuf::from("/var/cache/minapack"));
        assert_eq!(config.merge_concurrency, 8);
        assert_eq!(config.collision_policy, CollisionPolicy::FirstWins);
        assert!(config.hosted);
        assert_eq!(config.compiler.as_deref(), Some("node build.js"));
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    #[serial]
    fn test_strict_loading_rejects_malformed_values() {
        let _cleared = clear_all();
        let _guard = EnvGuard::set("MINAPACK_MERGE_CONCURRENCY", "many");

        let err = MinapackConfig::from_env().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::ParseError { ref field, .. } if field == "MINAPACK_MERGE_CONCURRENCY"
        ));

        // The lenient loader falls back instead.
        assert_eq!(
            MinapackConfig::default().merge_concurrency,
            DEFAULT_MERGE_CONCURRENCY
        );
    }

    #[test]
    #[serial]
    fn test_invalid_collision_policy() {
        let _cleared = clear_all();
        let _guard = EnvGuard::set("MINAPACK_COLLISION_POLICY", "newest");

        assert!(MinapackConfig::from_env().is_err());
    }

    #[test]
    #[serial]
    fn test_configuration_validation_invalid_concurrency() {
        let _cleared = clear_all();
        let mut config = MinapackConfig::default();
        config.merge_concurrency = 0;
        assert!(config.validate().is_err());

        config.merge_concurrency = MAX_MERGE_CONCURRENCY + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial]
    fn test_configuration_validation_invalid_log_level() {
        let _cleared = clear_all();
        let mut config = MinapackConfig::default();
        config.log_level = "invalid".to_string();

        assert!(config.validate().is_err());
    }

    #[test]
    #[serial]
    fn test_cache_root_resolution() {
        let _cleared = clear_all();
        let mut config = MinapackConfig::default();
        assert_eq!(
            config.cache_root(Path::new("/work/app")),
            PathBuf::from("/work/app/.CACHE")
        );

        config.cache_dir = PathBuf::from("/tmp/shared");
        assert_eq!(
            config.cache_root(Path::new("/work/app")),
            PathBuf::from("/tmp/shared")
        );
    }

    #[test]
    #[serial]
    fn test_config_display() {
        let _cleared = clear_all();
        let config = MinapackConfig::default();
        let display = format!("{}", config);
        assert!(display.contains("Minapack Configuration:"));
        assert!(display.contains("Collision Policy: last-wins"));
    }
}
