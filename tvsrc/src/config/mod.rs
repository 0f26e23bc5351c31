//! Update configuration.
//!
//! The configuration is an explicit value handed to the pipeline. It is read
//! from `user_config.toml` when present, otherwise `config.toml`, otherwise the
//! built-in defaults. `TVSRC_CONFIG` points at an explicit file instead.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Error, Result};

/// Configuration file picked up when present.
pub const USER_CONFIG_FILE: &str = "user_config.toml";
/// Fallback configuration file.
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";
/// Environment variable overriding the configuration path.
pub const CONFIG_ENV: &str = "TVSRC_CONFIG";

/// Working result file, published over `final_file`.
pub const WORKING_RESULT_FILE: &str = "result_new.txt";
/// Working log file, published over the final log.
pub const WORKING_LOG_FILE: &str = "result_new.log";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateConfig {
    /// Catalog file with categories, channels and fallback URLs.
    pub source_file: PathBuf,
    /// Published result file.
    pub final_file: PathBuf,
    /// Enable the probe/ranking stage.
    pub open_sort: bool,
    /// Enable the subscription-list provider.
    pub open_subscribe: bool,
    /// Enable the multicast/search-engine provider.
    pub open_multicast: bool,
    /// Enable the online-search provider.
    pub open_online_search: bool,
    /// Subscription lists fetched by the subscribe provider.
    pub subscribe_urls: Vec<String>,
    /// URLs containing any of these keywords are rejected.
    pub url_keywords_blacklist: Vec<String>,
    /// Maximum URLs written per channel.
    pub urls_limit: Option<usize>,
    /// Per-request timeout used by providers and probes.
    pub probe_timeout_secs: u64,
    /// Proxy URL for outgoing requests. `"none"` disables proxying.
    pub proxy: Option<String>,
    /// Size at which the working log rotates.
    pub log_max_bytes: u64,
    /// Rotated log files kept next to the working log.
    pub log_backups: usize,

    /// Set by `load` when the user configuration file was used.
    #[serde(skip)]
    pub user_config: bool,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            source_file: PathBuf::from("demo.txt"),
            final_file: PathBuf::from("result.txt"),
            open_sort: true,
            open_subscribe: true,
            open_multicast: false,
            open_online_search: false,
            subscribe_urls: Vec::new(),
            url_keywords_blacklist: Vec::new(),
            urls_limit: None,
            probe_timeout_secs: 5,
            proxy: None,
            log_max_bytes: 10 * 1024 * 1024,
            log_backups: 3,
            user_config: false,
        }
    }
}

impl UpdateConfig {
    /// Load the configuration from the well-known locations.
    pub fn load() -> Result<Self> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            let path = PathBuf::from(path);
            let user_config = path.file_name().is_some_and(|n| n == USER_CONFIG_FILE);
            let mut config = Self::from_file(&path)?;
            config.user_config = user_config;
            return Ok(config);
        }
        Self::load_from_dir(Path::new("."))
    }

    /// Load the configuration from `dir`, preferring the user file.
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        let user_path = dir.join(USER_CONFIG_FILE);
        if user_path.is_file() {
            let mut config = Self::from_file(&user_path)?;
            config.user_config = true;
            return Ok(config);
        }

        let default_path = dir.join(DEFAULT_CONFIG_FILE);
        if default_path.is_file() {
            return Self::from_file(&default_path);
        }

        debug!("No configuration file found, using defaults");
        Ok(Self::default())
    }

    /// Parse and validate a TOML configuration file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::io_path("reading config", path, e))?;
        let config = Self::from_toml(&raw)
            .map_err(|e| Error::config(format!("{}: {e}", path.display())))?;
        debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Parse and validate TOML text.
    pub fn from_toml(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw).map_err(|e| Error::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.final_file.as_os_str().is_empty() {
            return Err(Error::config("final_file must not be empty"));
        }
        if self.probe_timeout_secs == 0 {
            return Err(Error::config("probe_timeout_secs must be greater than 0"));
        }
        if self.urls_limit == Some(0) {
            return Err(Error::config("urls_limit must be greater than 0 when set"));
        }
        Ok(())
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    /// Final log file matching the configuration source.
    pub fn final_log_file(&self) -> PathBuf {
        if self.user_config {
            PathBuf::from("user_result.log")
        } else {
            PathBuf::from("result.log")
        }
    }

    pub fn working_result_file(&self) -> PathBuf {
        PathBuf::from(WORKING_RESULT_FILE)
    }

    pub fn working_log_file(&self) -> PathBuf {
        PathBuf::from(WORKING_LOG_FILE)
    }
}
