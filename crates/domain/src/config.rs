//! Configuration management

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_DB_FILE, DEFAULT_DB_POOL_SIZE, DEFAULT_IMPORT_BATCH_SIZE, DEFAULT_ITEM_DELAY_MS,
    DEFAULT_MAX_PASS_SECS, DEFAULT_PULL_BASE_INTERVAL_SECS, DEFAULT_PULL_COLLECTIONS,
    DEFAULT_PULL_MAX_INTERVAL_SECS, DEFAULT_PULL_MIN_INTERVAL_SECS, DEFAULT_PUSH_INTERVAL_SECS,
    DEFAULT_REMOTE_TIMEOUT_SECS,
};
use crate::{PartsProError, Result};

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub remote: RemoteConfig,
    pub push: PushConfig,
    pub pull: PullConfig,
    pub import: ImportConfig,
}

/// Local database configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
    pub pool_size: u32,
}

/// Remote document store endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Base URL of the REST gateway; `None` keeps the app fully offline.
    pub base_url: Option<String>,
    #[serde(skip_serializing)]
    pub api_token: Option<String>,
    pub timeout_secs: u64,
}

/// Push worker settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PushConfig {
    pub enabled: bool,
    pub interval_secs: u64,
    pub item_delay_ms: u64,
    pub max_pass_secs: u64,
}

/// Pull service settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PullConfig {
    pub enabled: bool,
    pub base_interval_secs: u64,
    pub min_interval_secs: u64,
    pub max_interval_secs: u64,
    pub collections: Vec<String>,
}

/// Bulk import settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    pub batch_size: usize,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: DEFAULT_DB_FILE.to_string(), pool_size: DEFAULT_DB_POOL_SIZE }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self { base_url: None, api_token: None, timeout_secs: DEFAULT_REMOTE_TIMEOUT_SECS }
    }
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: DEFAULT_PUSH_INTERVAL_SECS,
            item_delay_ms: DEFAULT_ITEM_DELAY_MS,
            max_pass_secs: DEFAULT_MAX_PASS_SECS,
        }
    }
}

impl Default for PullConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_interval_secs: DEFAULT_PULL_BASE_INTERVAL_SECS,
            min_interval_secs: DEFAULT_PULL_MIN_INTERVAL_SECS,
            max_interval_secs: DEFAULT_PULL_MAX_INTERVAL_SECS,
            collections: DEFAULT_PULL_COLLECTIONS.iter().map(|c| (*c).to_string()).collect(),
        }
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self { batch_size: DEFAULT_IMPORT_BATCH_SIZE }
    }
}

impl PushConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn item_delay(&self) -> Duration {
        Duration::from_millis(self.item_delay_ms)
    }

    pub fn max_pass(&self) -> Duration {
        Duration::from_secs(self.max_pass_secs)
    }
}

impl PullConfig {
    pub fn base_interval(&self) -> Duration {
        Duration::from_secs(self.base_interval_secs)
    }

    pub fn min_interval(&self) -> Duration {
        Duration::from_secs(self.min_interval_secs)
    }

    pub fn max_interval(&self) -> Duration {
        Duration::from_secs(self.max_interval_secs)
    }
}

impl Config {
    /// Reject values the workers cannot run with.
    ///
    /// # Errors
    /// Returns `PartsProError::Config` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.database.path.trim().is_empty() {
            return Err(PartsProError::Config("database.path must not be empty".into()));
        }
        if self.database.pool_size == 0 {
            return Err(PartsProError::Config("database.pool_size must be at least 1".into()));
        }
        if self.push.interval_secs == 0 {
            return Err(PartsProError::Config("push.interval_secs must be positive".into()));
        }
        if self.push.max_pass_secs == 0 {
            return Err(PartsProError::Config("push.max_pass_secs must be positive".into()));
        }
        let pull = &self.pull;
        if pull.min_interval_secs == 0
            || pull.min_interval_secs > pull.base_interval_secs
            || pull.base_interval_secs > pull.max_interval_secs
        {
            return Err(PartsProError::Config(format!(
                "pull intervals must satisfy 0 < min ({}) <= base ({}) <= max ({})",
                pull.min_interval_secs, pull.base_interval_secs, pull.max_interval_secs
            )));
        }
        if self.import.batch_size == 0 {
            return Err(PartsProError::Config("import.batch_size must be at least 1".into()));
        }
        if let Some(url) = &self.remote.base_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(PartsProError::Config(format!(
                    "remote.base_url must be an http(s) URL, got {url}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_sync_constants() {
        let config = Config::default();

        assert_eq!(config.push.interval(), Duration::from_secs(30));
        assert_eq!(config.push.item_delay(), Duration::from_millis(50));
        assert_eq!(config.push.max_pass(), Duration::from_secs(300));
        assert_eq!(config.import.batch_size, 100);
        assert!(config.pull.collections.iter().any(|c| c == "products"));
        config.validate().unwrap();
    }

    #[test]
    fn partial_documents_fill_in_defaults() {
        let config: Config =
            serde_json::from_str(r#"{ "push": { "interval_secs": 10 } }"#).unwrap();

        assert_eq!(config.push.interval_secs, 10);
        assert_eq!(config.push.item_delay_ms, 50);
        assert_eq!(config.database, DatabaseConfig::default());
    }

    #[test]
    fn validate_rejects_inverted_pull_bounds() {
        let mut config = Config::default();
        config.pull.min_interval_secs = 7200;

        let err = config.validate().unwrap_err();
        assert!(matches!(err, PartsProError::Config(_)));
    }

    #[test]
    fn validate_rejects_non_http_remote() {
        let mut config = Config::default();
        config.remote.base_url = Some("ftp://example.com".into());

        assert!(config.validate().is_err());
    }

    #[test]
    fn api_token_is_not_serialized() {
        let mut config = Config::default();
        config.remote.api_token = Some("secret".into());

        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret"));
    }
}
