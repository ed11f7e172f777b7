//! Application configuration.
//!
//! Loaded from a TOML file with `[api]`, `[cache]` and `[logging]` sections.
//! Every field has a default, so a missing file or section yields a usable
//! configuration. A few environment variables override file values.

use crate::error::ConfigError;
use crate::types::DEFAULT_CACHE_DURATION;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

pub const ENV_API_BASE_URL: &str = "AIDEN_API_BASE_URL";
pub const ENV_CACHE_PATH: &str = "AIDEN_CACHE_PATH";

pub const DEFAULT_CACHE_PREFIX: &str = "community_data_";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub cache: CacheSettings,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000/api".to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub duration_secs: u64,
    pub prefix: String,
    /// File backing the cache. `None` keeps the cache in memory only.
    pub store_path: Option<PathBuf>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            duration_secs: DEFAULT_CACHE_DURATION.as_secs(),
            prefix: DEFAULT_CACHE_PREFIX.to_string(),
            store_path: None,
        }
    }
}

impl CacheSettings {
    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "aiden=info,community_client=info,community_data=info".to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(contents)?;
        Ok(config)
    }

    /// Reads the file at `path`, falling back to defaults when it does not exist.
    /// Environment overrides are applied and the result validated.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = match std::fs::read_to_string(path) {
            Ok(contents) => {
                info!("Loading configuration from {}", path.display());
                Self::from_toml_str(&contents)?
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(
                    "No configuration file at {}, using defaults",
                    path.display()
                );
                Self::default()
            }
            Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                return Err(ConfigError::PermissionDenied {
                    path: path.display().to_string(),
                });
            }
            Err(e) => {
                return Err(ConfigError::InvalidFormat {
                    details: format!("{}: {}", path.display(), e),
                });
            }
        };

        config.apply_env_overrides(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(base_url) = lookup(ENV_API_BASE_URL) {
            debug!("{} overrides api.base_url", ENV_API_BASE_URL);
            self.api.base_url = base_url;
        }
        if let Some(path) = lookup(ENV_CACHE_PATH) {
            debug!("{} overrides cache.store_path", ENV_CACHE_PATH);
            self.cache.store_path = Some(PathBuf::from(path));
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api.base_url.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "api.base_url".to_string(),
            });
        }
        if self.api.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "api.request_timeout_secs".to_string(),
                value: "0".to_string(),
            });
        }
        if self.cache.duration_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "cache.duration_secs".to_string(),
                value: "0".to_string(),
            });
        }
        if self.cache.prefix.is_empty() {
            return Err(ConfigError::ValidationFailed {
                reason: "cache.prefix must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.cache.prefix, "community_data_");
        assert_eq!(config.cache.duration(), Duration::from_secs(300));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
            [api]
            base_url = "https://aiden.example/api"

            [cache]
            duration_secs = 60
            "#,
        )
        .unwrap();

        assert_eq!(config.api.base_url, "https://aiden.example/api");
        assert_eq!(config.api.request_timeout_secs, 30);
        assert_eq!(config.cache.duration_secs, 60);
        assert_eq!(config.cache.prefix, DEFAULT_CACHE_PREFIX);
    }

    #[test]
    fn test_malformed_toml_is_a_parse_error() {
        let result = AppConfig::from_toml_str("[api\nbase_url = 1");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_validation_rejects_zero_timeout() {
        let mut config = AppConfig::default();
        config.api.request_timeout_secs = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AppConfig::default();
        config.apply_env_overrides(|name| match name {
            ENV_API_BASE_URL => Some("http://override/api".to_string()),
            ENV_CACHE_PATH => Some("/tmp/aiden-cache.json".to_string()),
            _ => None,
        });

        assert_eq!(config.api.base_url, "http://override/api");
        assert_eq!(
            config.cache.store_path,
            Some(PathBuf::from("/tmp/aiden-cache.json"))
        );
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load(&dir.path().join("missing.toml")).unwrap();
        assert_eq!(config.cache.prefix, DEFAULT_CACHE_PREFIX);
    }

    #[test]
    fn test_load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[logging]\nfilter = \"debug\"").unwrap();

        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.logging.filter, "debug");
    }
}
