//! Engine configuration
//!
//! Engine-wide settings live in one JSON file: logging and the default run
//! options applied to definitions that do not carry their own. Per-site
//! selectors are not part of it; they belong to each `CrawlerDefinition`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{info, warn};

use crate::domain::CrawlerOptions;

/// Complete engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub logging: LoggingConfig,

    /// Run options for definitions that carry none; applied through
    /// `Crawler::with_engine_config`
    pub crawler: CrawlerOptions,
}

/// Logging configuration settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,

    /// Enable JSON formatted file logs
    pub json_format: bool,

    pub console_output: bool,

    pub file_output: bool,

    /// Directory for log files; `logs/` next to the executable when unset
    pub log_dir: Option<PathBuf>,

    pub file_name: String,

    /// Module-specific level filters (e.g., "scraper": "warn")
    pub module_filters: HashMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            json_format: defaults::LOG_JSON_FORMAT,
            console_output: defaults::LOG_CONSOLE_OUTPUT,
            file_output: defaults::LOG_FILE_OUTPUT,
            log_dir: None,
            file_name: defaults::LOG_FILE_NAME.to_string(),
            module_filters: {
                let mut filters = HashMap::new();
                filters.insert("html5ever".to_string(), "warn".to_string());
                filters.insert("selectors".to_string(), "warn".to_string());
                filters.insert("tokio".to_string(), "info".to_string());
                filters
            },
        }
    }
}

/// Configuration manager for loading and saving settings
pub struct ConfigManager {
    pub config_path: PathBuf,
}

impl ConfigManager {
    /// Get the application configuration directory
    pub fn get_config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get user config directory")?
            .join(defaults::APP_DIR_NAME);

        Ok(config_dir)
    }

    /// Manager for the default config location
    pub fn new() -> Result<Self> {
        let config_path = Self::get_config_dir()?.join(defaults::CONFIG_FILE_NAME);
        Ok(Self { config_path })
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: path.into(),
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Load configuration from file, creating default if it doesn't exist.
    ///
    /// A file that no longer parses is backed up next to itself and replaced
    /// with defaults.
    pub async fn load_config(&self) -> Result<EngineConfig> {
        if !self.config_path.exists() {
            info!("Configuration file not found, creating default: {:?}", self.config_path);
            let default_config = EngineConfig::default();
            self.save_config(&default_config).await?;
            return Ok(default_config);
        }

        let content = fs::read_to_string(&self.config_path)
            .await
            .context("Failed to read configuration file")?;

        match serde_json::from_str::<EngineConfig>(&content) {
            Ok(config) => {
                info!("Loaded configuration from: {:?}", self.config_path);
                Ok(config)
            }
            Err(parse_error) => {
                warn!("Configuration file could not be parsed: {}", parse_error);

                let backup_path = self.config_path.with_extension("json.corrupted");
                if let Err(e) = fs::copy(&self.config_path, &backup_path).await {
                    warn!("Failed to create backup of corrupted config: {}", e);
                } else {
                    info!("Backed up corrupted config to: {:?}", backup_path);
                }

                let default_config = EngineConfig::default();
                self.save_config(&default_config)
                    .await
                    .context("Failed to save default configuration")?;
                Ok(default_config)
            }
        }
    }

    pub async fn save_config(&self, config: &EngineConfig) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("Failed to create directory: {parent:?}"))?;
            }
        }

        let content =
            serde_json::to_string_pretty(config).context("Failed to serialize configuration")?;
        fs::write(&self.config_path, content)
            .await
            .context("Failed to write configuration file")?;

        Ok(())
    }
}

/// Default engine configuration values
pub mod defaults {
    pub const APP_DIR_NAME: &str = "brand-crawler";

    pub const CONFIG_FILE_NAME: &str = "engine_config.json";

    /// Default maximum pages processed in parallel
    pub const MAX_CONCURRENCY: usize = 3;

    /// Default request ceiling for one crawl
    pub const MAX_REQUESTS_PER_CRAWL: usize = 1000;

    pub const MAX_RETRIES: u32 = 3;

    /// Default per-request timeout in seconds
    pub const REQUEST_TIMEOUT_SECONDS: u64 = 60;

    /// Default pause after a "load more" click in milliseconds
    pub const SETTLE_DELAY_MS: u64 = 1500;

    // Test-mode ceilings
    pub const TEST_MODE_MAX_CONCURRENCY: usize = 1;

    pub const TEST_MODE_REQUEST_TIMEOUT_SECONDS: u64 = 30;

    /// "Load more" clicks allowed per listing
    pub const LOAD_MORE_MAX_CLICKS: usize = 20;

    pub const TEST_MODE_LOAD_MORE_MAX_CLICKS: usize = 1;

    /// Extra listing pages followed by next-button / page-number pagination
    pub const MAX_EXTRA_PAGES: usize = 50;

    pub const TEST_MODE_MAX_EXTRA_PAGES: usize = 1;

    /// `onclick` handler shape used to mine detail ids, e.g. `goView('123')`
    pub const DETAIL_ID_PATTERN: &str = r"go\w*\('([^']+)'\)";

    // Log configuration defaults
    pub const LOG_LEVEL: &str = "info";

    pub const LOG_JSON_FORMAT: bool = false;

    pub const LOG_CONSOLE_OUTPUT: bool = true;

    pub const LOG_FILE_OUTPUT: bool = false;

    pub const LOG_FILE_NAME: &str = "brand-crawler.log";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ConfigManager::with_path(dir.path().join("nested").join("engine.json"));

        let config = manager.load_config().await.unwrap();
        assert_eq!(config, EngineConfig::default());
        assert!(manager.config_path().exists());
    }

    #[tokio::test]
    async fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.json");
        std::fs::write(&path, r#"{ "crawler": { "maxConcurrency": 8 } }"#).unwrap();

        let config = ConfigManager::with_path(&path).load_config().await.unwrap();
        assert_eq!(config.crawler.max_concurrency, 8);
        assert_eq!(config.crawler.max_retries, defaults::MAX_RETRIES);
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[tokio::test]
    async fn corrupted_file_is_backed_up_and_reset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.json");
        std::fs::write(&path, "{ not json").unwrap();

        let config = ConfigManager::with_path(&path).load_config().await.unwrap();
        assert_eq!(config, EngineConfig::default());
        assert!(path.with_extension("json.corrupted").exists());
    }
}
