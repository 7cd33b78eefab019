//! Application configuration.

/// TOML-backed settings.
pub mod app_config;
/// Command-line arguments.
pub mod args;
/// Configuration file location and first-run creation.
pub mod storage;

pub use app_config::{AppConfig, CacheConfig, LogLevel};
pub use args::{CliArgs, Command};
pub use storage::{ConfigError, StorageManager};
