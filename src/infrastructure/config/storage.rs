//! Reading and first-run creation of `config.toml`.

use super::app_config::{APP_NAME, APP_ORGANIZATION, APP_QUALIFIER, AppConfig};
use directories::ProjectDirs;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

const CONFIG_FILE_NAME: &str = "config.toml";

/// Failure to locate, read or create the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform exposes no configuration directory.
    #[error("failed to determine config directory")]
    NoConfigDir,
    /// Reading or writing the file failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// The default configuration could not be rendered.
    #[error("toml serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Owner of the configuration file location.
#[derive(Debug, Clone)]
pub struct StorageManager {
    config_path: PathBuf,
}

impl StorageManager {
    /// Points at `config.toml` in the platform configuration directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoConfigDir`] if the directory cannot be determined.
    pub fn new() -> Result<Self, ConfigError> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| Self::at(dirs.config_dir().join(CONFIG_FILE_NAME)))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Points at an explicit configuration file.
    #[must_use]
    pub const fn at(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    /// Loads the configuration, writing defaults on first run.
    ///
    /// A file that fails to parse is left untouched and defaults are used.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read or created.
    pub fn load_config(&self) -> Result<AppConfig, ConfigError> {
        let content = match fs::read_to_string(&self.config_path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return self.write_default();
            }
            Err(e) => return Err(e.into()),
        };

        Ok(toml::from_str(&content).unwrap_or_else(|e| {
            warn!(
                path = %self.config_path.display(),
                error = %e,
                "Failed to parse config file, using defaults"
            );
            AppConfig::default()
        }))
    }

    fn write_default(&self) -> Result<AppConfig, ConfigError> {
        info!(path = %self.config_path.display(), "Creating default config");
        let config = AppConfig::default();
        let content = toml::to_string_pretty(&config)?;

        let dir = match self.config_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let mut temp_file = tempfile::NamedTempFile::new_in(dir)?;
        temp_file.write_all(content.as_bytes())?;
        temp_file.persist(&self.config_path).map_err(|e| e.error)?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::config::{CacheConfig, LogLevel};
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_is_created_with_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE_NAME);

        let config = StorageManager::at(path.clone()).load_config().unwrap();

        assert_eq!(config.cache, CacheConfig::default());
        let written: AppConfig = toml::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written.cache, CacheConfig::default());
        assert_eq!(fs::read_dir(path.parent().unwrap()).unwrap().count(), 1);
    }

    #[test]
    fn test_existing_file_is_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "log_level = \"warn\"\n[cache]\nmemory_capacity = 7\n").unwrap();

        let config = StorageManager::at(path).load_config().unwrap();

        assert_eq!(config.log_level, LogLevel::Warn);
        assert_eq!(config.cache.memory_capacity, 7);
    }

    #[test]
    fn test_malformed_file_falls_back_and_is_kept() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "invalid_toml = [").unwrap();

        let config = StorageManager::at(path.clone()).load_config().unwrap();

        assert_eq!(config.cache, CacheConfig::default());
        assert_eq!(fs::read_to_string(&path).unwrap(), "invalid_toml = [");
    }

    #[test]
    fn test_unreadable_path_is_an_error() {
        let dir = tempdir().unwrap();

        let result = StorageManager::at(dir.path().to_path_buf()).load_config();

        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
