//! Application configuration structures.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Dashboard API connection settings
    #[serde(default)]
    pub api: ApiConfig,

    /// CSV export settings
    #[serde(default)]
    pub export: ExportConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        let base = Url::parse(&self.api.base_url)?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(AppError::validation(format!(
                "api.base_url must be http(s), got '{}'",
                base.scheme()
            )));
        }
        if self.api.user_agent.trim().is_empty() {
            return Err(AppError::validation("api.user_agent is empty"));
        }
        if self.api.timeout_secs == 0 {
            return Err(AppError::validation("api.timeout_secs must be > 0"));
        }
        if self.api.submission_limit == 0 {
            return Err(AppError::validation("api.submission_limit must be > 0"));
        }
        if self.export.output_dir.trim().is_empty() {
            return Err(AppError::validation("export.output_dir is empty"));
        }
        Ok(())
    }
}

/// Dashboard API connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the dashboard API (without the `/api` prefix)
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// How many submissions to request per load
    #[serde(default = "defaults::submission_limit")]
    pub submission_limit: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            timeout_secs: defaults::timeout(),
            user_agent: defaults::user_agent(),
            submission_limit: defaults::submission_limit(),
        }
    }
}

/// CSV export settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Directory the CSV file is written to
    #[serde(default = "defaults::output_dir")]
    pub output_dir: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: defaults::output_dir(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log level when RUST_LOG is not set
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

mod defaults {
    /// Fallback when no build-time API base was supplied.
    const LOCAL_API_BASE: &str = "http://localhost:5000";

    pub fn base_url() -> String {
        option_env!("COVERAGE_API_BASE")
            .unwrap_or(LOCAL_API_BASE)
            .to_string()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn user_agent() -> String {
        concat!("coverage-admin/", env!("CARGO_PKG_VERSION")).into()
    }
    pub fn submission_limit() -> usize {
        500
    }
    pub fn output_dir() -> String {
        ".".into()
    }
    pub fn log_level() -> String {
        "info".into()
    }
}
