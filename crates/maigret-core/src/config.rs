//! Configuration management for Maigret.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides.

use crate::error::{ConfigError, ConfigResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Remote location of the community-maintained site catalog.
pub const DEFAULT_CATALOG_URL: &str =
    "https://raw.githubusercontent.com/sherlock-project/sherlock/master/sherlock/resources/data.json";

/// Local SOCKS5 endpoint of a Tor daemon.
pub const DEFAULT_PROXY_ADDRESS: &str = "socks5://127.0.0.1:9050";

/// Browser-like user agent sent with every probe.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Main application configuration.
///
/// This is loaded from `~/.config/maigret/config.toml` (or platform equivalent).
/// If the file doesn't exist, default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Site catalog location
    pub catalog: CatalogConfig,
    /// Probe engine settings
    pub probing: ProbingConfig,
    /// Anonymizing proxy settings
    pub proxy: ProxyConfig,
    /// Screenshot capture settings
    pub screenshot: ScreenshotConfig,
    /// Content download settings
    pub download: DownloadConfig,
}

impl AppConfig {
    /// Load configuration from disk, falling back to defaults if not found.
    ///
    /// # Errors
    /// Returns error if:
    /// - Config directory cannot be determined
    /// - File exists but cannot be read
    /// - File contents are not valid TOML
    pub fn load() -> ConfigResult<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from `config_path`; a missing file means defaults.
    pub fn load_from(config_path: &Path) -> ConfigResult<Self> {
        if config_path.exists() {
            tracing::debug!("Loading config from {}", config_path.display());
            let contents = fs::read_to_string(config_path)?;
            let config: Self = toml::from_str(&contents)?;
            config.validate()?;
            Ok(config)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration with environment variable overrides.
    ///
    /// Supports the following environment variables:
    /// - `MAIGRET_CONCURRENCY`: Override the probe concurrency limit
    /// - `MAIGRET_TIMEOUT_SECS`: Override the per-request timeout
    /// - `MAIGRET_PROXY`: Override the anonymizing proxy address
    /// - `MAIGRET_CATALOG`: Override the local catalog path
    pub fn load_with_env() -> ConfigResult<Self> {
        let mut config = Self::load()?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup function.
    ///
    /// Values that fail to parse are ignored.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("MAIGRET_CONCURRENCY") {
            if let Ok(limit) = val.parse() {
                self.probing.concurrency_limit = limit;
                tracing::debug!("Override probing.concurrency_limit from env: {}", limit);
            }
        }

        if let Some(val) = lookup("MAIGRET_TIMEOUT_SECS") {
            if let Ok(secs) = val.parse() {
                self.probing.request_timeout_secs = secs;
                tracing::debug!("Override probing.request_timeout_secs from env: {}", secs);
            }
        }

        if let Some(val) = lookup("MAIGRET_PROXY") {
            if !val.is_empty() {
                tracing::debug!("Override proxy.address from env: {}", val);
                self.proxy.address = val;
            }
        }

        if let Some(val) = lookup("MAIGRET_CATALOG") {
            if !val.is_empty() {
                self.catalog.path = PathBuf::from(val);
                tracing::debug!(
                    "Override catalog.path from env: {}",
                    self.catalog.path.display()
                );
            }
        }
    }

    /// Check values that would make the probe engine unusable.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.probing.concurrency_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "probing.concurrency_limit".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        if self.probing.screenshot_concurrency_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "probing.screenshot_concurrency_limit".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        if self.probing.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "probing.request_timeout_secs".to_string(),
                reason: "must be at least 1 second".to_string(),
            });
        }

        if !self.proxy.address.starts_with("socks5://") && !self.proxy.address.starts_with("socks5h://")
        {
            return Err(ConfigError::InvalidValue {
                field: "proxy.address".to_string(),
                reason: format!("expected a socks5:// URL, got '{}'", self.proxy.address),
            });
        }

        Ok(())
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/maigret/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs = ProjectDirs::from("com", "maigret", "maigret").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }
}

/// Where the site catalog lives locally and where it is refreshed from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Local catalog file
    pub path: PathBuf,
    /// Remote catalog fetched on first run or `--update`
    pub remote_url: String,
    /// Timeout for the catalog download in seconds
    pub fetch_timeout_secs: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data.json"),
            remote_url: DEFAULT_CATALOG_URL.to_string(),
            fetch_timeout_secs: 60,
        }
    }
}

/// Probe engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbingConfig {
    /// Maximum in-flight probes
    pub concurrency_limit: usize,
    /// Maximum in-flight probes while screenshots are being captured
    pub screenshot_concurrency_limit: usize,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
    /// Extra attempts for probes that fail at the network level
    pub max_retries: u32,
    /// Maximum redirects followed per probe
    pub max_redirects: usize,
    /// User agent string
    pub user_agent: String,
}

impl Default for ProbingConfig {
    fn default() -> Self {
        Self {
            concurrency_limit: 32,
            screenshot_concurrency_limit: 8,
            request_timeout_secs: 10,
            max_retries: 2,
            max_redirects: 10,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Anonymizing proxy settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// SOCKS5 endpoint used when anonymization is requested
    pub address: String,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_PROXY_ADDRESS.to_string(),
        }
    }
}

/// Screenshot capture settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenshotConfig {
    /// Output directory, one subdirectory per username
    pub dir: PathBuf,
    /// Browser window width
    pub window_width: u32,
    /// Browser window height
    pub window_height: u32,
    /// Navigation timeout in seconds
    pub navigation_timeout_secs: u64,
    /// Optional explicit Chrome/Chromium executable
    pub chrome_path: Option<PathBuf>,
}

impl Default for ScreenshotConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("screenshots"),
            window_width: 1024,
            window_height: 768,
            navigation_timeout_secs: 60,
            chrome_path: None,
        }
    }
}

/// Content download settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Output directory, one subdirectory per username
    pub dir: PathBuf,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("downloads"),
        }
    }
}

/// Transport parameters handed to the probe engine for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Route probes through the SOCKS5 proxy
    pub use_anonymizing_proxy: bool,
    /// SOCKS5 proxy URL
    pub proxy_address: String,
    /// Per-request timeout
    pub request_timeout: Duration,
    /// Maximum in-flight probes
    pub concurrency_limit: usize,
    /// Extra attempts for network failures
    pub max_retries: u32,
    /// Maximum redirects followed per probe
    pub max_redirects: usize,
    /// User agent string
    pub user_agent: String,
}

impl TransportConfig {
    /// Derive the transport for a run.
    ///
    /// Screenshots share CPU and network with the probes, so the lower
    /// `screenshot_concurrency_limit` applies while they are enabled.
    #[must_use]
    pub fn from_app_config(config: &AppConfig, use_anonymizing_proxy: bool, screenshots: bool) -> Self {
        let concurrency_limit = if screenshots {
            config.probing.screenshot_concurrency_limit
        } else {
            config.probing.concurrency_limit
        };

        Self {
            use_anonymizing_proxy,
            proxy_address: config.proxy.address.clone(),
            request_timeout: Duration::from_secs(config.probing.request_timeout_secs),
            concurrency_limit,
            max_retries: config.probing.max_retries,
            max_redirects: config.probing.max_redirects,
            user_agent: config.probing.user_agent.clone(),
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self::from_app_config(&AppConfig::default(), false, false)
    }
}
