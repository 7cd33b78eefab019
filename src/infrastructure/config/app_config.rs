//! Application configuration.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::domain::entities::KeyStrategy;
use crate::infrastructure::image::http_origin::DEFAULT_TIMEOUT_SECS;
use crate::infrastructure::image::memory_cache::DEFAULT_CACHE_SIZE;

pub(crate) const APP_NAME: &str = "oxicache";
pub(crate) const APP_QUALIFIER: &str = "com";
pub(crate) const APP_ORGANIZATION: &str = "linuxmobile";

/// Log level configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level.
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trace => write!(f, "trace"),
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Application configuration, loaded from `config.toml` and overridden by CLI flags.
#[derive(Debug, Serialize, Deserialize)]
pub struct AppConfig {
    /// Log file path. Logs go to stderr when unset.
    #[serde(default)]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Image cache configuration.
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Image cache configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of decoded images kept in memory.
    #[serde(default = "default_memory_capacity")]
    pub memory_capacity: usize,

    /// Directory for the disk tier. Defaults to the platform cache directory.
    ///
    /// The directory is never size-limited or expired; remove it (or run
    /// `oxicache purge`) to reclaim space.
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,

    /// How addresses map to cache keys.
    #[serde(default)]
    pub key_strategy: KeyStrategy,

    /// Origin request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// User agent sent to the origin.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            memory_capacity: default_memory_capacity(),
            cache_dir: None,
            key_strategy: KeyStrategy::default(),
            request_timeout_secs: default_request_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl CacheConfig {
    /// Returns the default disk tier directory (`<platform cache dir>/images`).
    #[must_use]
    pub fn default_cache_dir() -> PathBuf {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME).map_or_else(
            || std::env::temp_dir().join(APP_NAME).join("cache").join("images"),
            |dirs| dirs.cache_dir().join("images"),
        )
    }

    /// Returns the effective disk tier directory.
    #[must_use]
    pub fn effective_cache_dir(&self) -> PathBuf {
        self.cache_dir.clone().unwrap_or_else(Self::default_cache_dir)
    }
}

const fn default_memory_capacity() -> usize {
    DEFAULT_CACHE_SIZE
}

const fn default_request_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_user_agent() -> String {
    crate::DEFAULT_USER_AGENT.to_string()
}

use super::args::CliArgs;

impl AppConfig {
    /// Merges CLI arguments into the configuration.
    pub fn merge_with_args(&mut self, args: &CliArgs) {
        if let Some(log_path) = &args.log_path {
            self.log_path = Some(log_path.clone());
        }
        if let Some(log_level) = args.log_level {
            self.log_level = log_level;
        }
        if let Some(cache_dir) = &args.cache_dir {
            self.cache.cache_dir = Some(cache_dir.clone());
        }
        if let Some(capacity) = args.memory_capacity {
            self.cache.memory_capacity = capacity;
        }
        if let Some(strategy) = args.key_strategy {
            self.cache.key_strategy = strategy;
        }
        if let Some(timeout) = args.timeout {
            self.cache.request_timeout_secs = timeout;
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_path: None,
            log_level: LogLevel::Info,
            cache: CacheConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_parse_config_with_cache_section() {
        let toml_content = r#"
            log_level = "debug"

            [cache]
            memory_capacity = 250
            cache_dir = "/var/cache/photos"
            key_strategy = "last-path-segment"
        "#;

        let config: AppConfig = toml::from_str(toml_content).expect("Failed to parse config");

        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.cache.memory_capacity, 250);
        assert_eq!(
            config.cache.effective_cache_dir(),
            PathBuf::from("/var/cache/photos")
        );
        assert_eq!(config.cache.key_strategy, KeyStrategy::LastPathSegment);
        assert_eq!(config.cache.request_timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();

        assert_eq!(config.log_level, LogLevel::Info);
        assert_eq!(config.cache.memory_capacity, DEFAULT_CACHE_SIZE);
        assert_eq!(config.cache.key_strategy, KeyStrategy::Hashed);
        assert!(config.cache.effective_cache_dir().ends_with("images"));
    }

    #[test]
    fn test_cli_overrides_file() {
        let mut config: AppConfig = toml::from_str("[cache]\nmemory_capacity = 5").unwrap();
        let args = CliArgs::parse_from([
            "oxicache",
            "--memory-capacity",
            "42",
            "--key-strategy",
            "last-path-segment",
            "stats",
        ]);

        config.merge_with_args(&args);

        assert_eq!(config.cache.memory_capacity, 42);
        assert_eq!(config.cache.key_strategy, KeyStrategy::LastPathSegment);
    }
}
