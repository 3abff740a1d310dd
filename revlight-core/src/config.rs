//! Configuration management for Revlight
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (REVLIGHT_*)
//! 3. Config file (~/.config/revlight/config.toml)
//! 4. Default values

use std::path::{Path, PathBuf};
use std::time::Duration;

use humantime_serde::re::humantime;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{Error, PollPolicy, Result, Severity};

/// Review backend configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the review backend
    pub url: String,

    /// Timeout for a single HTTP request
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:5000".to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Background colors per severity
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct HighlightConfig {
    pub high: String,
    pub medium: String,
    pub low: String,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            high: "rgba(255,0,0,0.3)".to_string(),
            medium: "rgba(255,255,0,0.3)".to_string(),
            low: "rgba(0,0,255,0.3)".to_string(),
        }
    }
}

impl HighlightConfig {
    /// Background color for a severity
    pub fn color(&self, severity: Severity) -> &str {
        match severity {
            Severity::High => &self.high,
            Severity::Medium => &self.medium,
            Severity::Low => &self.low,
        }
    }
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Backend connection settings
    pub backend: BackendConfig,

    /// Feedback polling
    pub poll: PollPolicy,

    /// Highlight colors
    pub highlight: HighlightConfig,
}

impl Config {
    /// Load configuration from the default config file location
    ///
    /// Returns default config if file doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();

        if let Some(path) = config_path {
            if path.exists() {
                return Self::load_from_file(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(Error::Io)?;
        toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Get the default config file path
    ///
    /// Returns `~/.config/revlight/config.toml` on Unix
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("revlight").join("config.toml"))
    }

    /// Apply environment variable overrides
    ///
    /// Supported variables:
    /// - REVLIGHT_BACKEND_URL: Backend base URL
    /// - REVLIGHT_POLL_INTERVAL: Delay between polls (e.g. `2s`, `500ms`)
    /// - REVLIGHT_POLL_MAX_ATTEMPTS: Attempt budget (`0` for no limit)
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var("REVLIGHT_BACKEND_URL") {
            self.backend.url = url;
        }

        if let Ok(interval) = std::env::var("REVLIGHT_POLL_INTERVAL") {
            match humantime::parse_duration(&interval) {
                Ok(interval) => self.poll.interval = interval,
                Err(e) => warn!(value = %interval, error = %e, "Ignoring invalid REVLIGHT_POLL_INTERVAL"),
            }
        }

        if let Ok(max) = std::env::var("REVLIGHT_POLL_MAX_ATTEMPTS") {
            match max.trim().parse::<u32>() {
                Ok(0) => self.poll.max_attempts = None,
                Ok(max) => self.poll.max_attempts = Some(max),
                Err(e) => warn!(value = %max, error = %e, "Ignoring invalid REVLIGHT_POLL_MAX_ATTEMPTS"),
            }
        }

        self
    }

    /// Apply CLI flag overrides
    pub fn with_cli_overrides(
        mut self,
        backend_url: Option<String>,
        poll_interval: Option<Duration>,
    ) -> Self {
        if let Some(url) = backend_url {
            self.backend.url = url;
        }

        if let Some(interval) = poll_interval {
            self.poll.interval = interval;
        }

        self
    }

    /// Load configuration with all overrides applied
    ///
    /// Priority: CLI > env > config file > defaults
    pub fn load_with_overrides(
        backend_url: Option<String>,
        poll_interval: Option<Duration>,
    ) -> Result<Self> {
        let config = Self::load()?
            .with_env_overrides()
            .with_cli_overrides(backend_url, poll_interval);
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration is usable
    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.backend.url).map_err(|e| {
            Error::Config(format!("Invalid backend URL {}: {}", self.backend.url, e))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "Backend URL must be http or https, got {}",
                url.scheme()
            )));
        }
        if self.backend.request_timeout.is_zero() {
            return Err(Error::Config(
                "request_timeout must be greater than zero".to_string(),
            ));
        }
        self.poll.validate().map_err(Error::Config)
    }
}
