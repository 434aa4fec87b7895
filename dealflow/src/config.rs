//! Configuration loaded with Figment
//!
//! Sources in precedence order (later sources override earlier ones):
//! 1. Built-in defaults
//! 2. `dealflow.toml`, `dealflow.yaml`, `dealflow.json` in the given directory
//! 3. `DEALFLOW_` environment variables; `__` separates nested keys, e.g.
//!    `DEALFLOW_FEED__MAX_PAGE_SIZE=50`

use crate::error::{DealflowError, Result};
use crate::types::DEFAULT_MAX_RANK_LEN;
use figment::{
    providers::{Env, Format, Json, Serialized, Toml, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Base name of the configuration files
pub const CONFIG_FILE_STEM: &str = "dealflow";

/// Environment variable prefix
pub const ENV_PREFIX: &str = "DEALFLOW_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DealflowConfig {
    /// SQLite database file
    pub database_path: PathBuf,
    /// Longest rank before a column is re-ranked
    pub max_rank_len: usize,
    /// Extra attempts for a move that hit a rank conflict or a busy database
    pub move_retries: u32,
    /// How long a writer waits on a locked database
    pub busy_timeout_ms: u64,
    /// Capacity of the in-process event channel
    pub event_capacity: usize,
    pub feed: FeedConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub default_page_size: usize,
    pub max_page_size: usize,
    /// Prefix of the detail URLs projected into feed rows
    pub url_base: String,
}

impl Default for DealflowConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("dealflow.db"),
            max_rank_len: DEFAULT_MAX_RANK_LEN,
            move_retries: 3,
            busy_timeout_ms: 5_000,
            event_capacity: 256,
            feed: FeedConfig::default(),
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            default_page_size: 15,
            max_page_size: 100,
            url_base: "/app".to_string(),
        }
    }
}

impl DealflowConfig {
    /// Load from the current working directory and the environment
    pub fn load() -> Result<Self> {
        Self::load_from(std::env::current_dir()?)
    }

    /// Load from config files in `dir` and the environment
    pub fn load_from(dir: impl AsRef<Path>) -> Result<Self> {
        let config: Self = Self::figment(dir.as_ref()).extract()?;
        config.validate()?;
        debug!(
            database = %config.database_path.display(),
            max_rank_len = config.max_rank_len,
            "loaded configuration"
        );
        Ok(config)
    }

    /// The layered figment, exposed so callers can merge overrides on top
    pub fn figment(dir: &Path) -> Figment {
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(dir.join(format!("{CONFIG_FILE_STEM}.toml"))))
            .merge(Yaml::file(dir.join(format!("{CONFIG_FILE_STEM}.yaml"))))
            .merge(Json::file(dir.join(format!("{CONFIG_FILE_STEM}.json"))))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_rank_len < 2 {
            return Err(DealflowError::invalid_value(
                "max_rank_len",
                "must be at least 2",
            ));
        }
        if self.feed.max_page_size == 0 {
            return Err(DealflowError::invalid_value(
                "feed.max_page_size",
                "must be positive",
            ));
        }
        if self.feed.default_page_size == 0 || self.feed.default_page_size > self.feed.max_page_size
        {
            return Err(DealflowError::invalid_value(
                "feed.default_page_size",
                format!("must be between 1 and {}", self.feed.max_page_size),
            ));
        }
        if self.event_capacity == 0 {
            return Err(DealflowError::invalid_value(
                "event_capacity",
                "must be positive",
            ));
        }
        Ok(())
    }

    pub fn with_database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = path.into();
        self
    }

    pub fn with_max_rank_len(mut self, max_rank_len: usize) -> Self {
        self.max_rank_len = max_rank_len;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    #[serial]
    fn test_defaults_without_files() {
        let temp = TempDir::new().unwrap();
        let config = DealflowConfig::load_from(temp.path()).unwrap();
        assert_eq!(config, DealflowConfig::default());
        assert_eq!(config.feed.default_page_size, 15);
    }

    #[test]
    #[serial]
    fn test_toml_file_overrides_defaults() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("dealflow.toml"),
            "max_rank_len = 10\n[feed]\nmax_page_size = 40\n",
        )
        .unwrap();

        let config = DealflowConfig::load_from(temp.path()).unwrap();
        assert_eq!(config.max_rank_len, 10);
        assert_eq!(config.feed.max_page_size, 40);
        assert_eq!(config.feed.default_page_size, 15);
    }

    #[test]
    #[serial]
    fn test_yaml_then_env_precedence() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("dealflow.yaml"), "move_retries: 7\n").unwrap();

        std::env::set_var("DEALFLOW_MOVE_RETRIES", "9");
        std::env::set_var("DEALFLOW_FEED__URL_BASE", "/crm");
        let config = DealflowConfig::load_from(temp.path());
        std::env::remove_var("DEALFLOW_MOVE_RETRIES");
        std::env::remove_var("DEALFLOW_FEED__URL_BASE");

        let config = config.unwrap();
        assert_eq!(config.move_retries, 9);
        assert_eq!(config.feed.url_base, "/crm");
    }

    #[test]
    #[serial]
    fn test_invalid_values_rejected() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("dealflow.toml"), "max_rank_len = 1\n").unwrap();
        let err = DealflowConfig::load_from(temp.path()).unwrap_err();
        assert!(matches!(err, DealflowError::InvalidValue { .. }));

        fs::write(
            temp.path().join("dealflow.toml"),
            "[feed]\ndefault_page_size = 500\n",
        )
        .unwrap();
        assert!(DealflowConfig::load_from(temp.path()).is_err());
    }

    #[test]
    #[serial]
    fn test_malformed_file_is_config_error() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("dealflow.json"), "{ not json").unwrap();
        let err = DealflowConfig::load_from(temp.path()).unwrap_err();
        assert!(matches!(err, DealflowError::Config(_)));
    }
}
