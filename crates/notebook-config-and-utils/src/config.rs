//! Configuration management for the notebook client.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Default remote authority URL (can be overridden at compile time via NOTEBOOK_SERVER_URL).
pub const DEFAULT_SERVER_URL: &str = match option_env!("NOTEBOOK_SERVER_URL") {
    Some(url) => url,
    None => "http://localhost:8000",
};

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Environment variable overriding the log level.
const ENV_LOG_LEVEL: &str = "NOTEBOOK_LOG_LEVEL";
/// Environment variable overriding the server URL.
const ENV_SERVER_URL: &str = "NOTEBOOK_SERVER_URL";

/// Client configuration.
///
/// Every field has a default so a partial `config.json` is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Base URL of the remote authority.
    pub server_url: String,
    /// Timeout applied to every remote call.
    pub request_timeout_secs: u64,
    /// Lifetime granted to a freshly issued access credential.
    pub access_token_lifetime_secs: i64,
    /// Lifetime granted to a refresh credential at sign-in.
    pub refresh_token_lifetime_secs: i64,
    /// An access credential this close to expiry is treated as expired.
    pub token_expiry_margin_secs: i64,
    /// Throttle window for note title updates.
    pub title_throttle_ms: u64,
    /// Throttle window for note content updates.
    pub content_throttle_ms: u64,
    /// Throttle window for tag label and section name updates.
    pub label_throttle_ms: u64,
    /// Poll interval of the connectivity monitor while healthy.
    pub health_poll_interval_secs: u64,
    /// Delay between health retries while unhealthy.
    pub health_retry_delay_secs: u64,
    /// Consecutive failed health probes before the monitor gives up.
    pub health_max_retries: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            server_url: DEFAULT_SERVER_URL.to_string(),
            request_timeout_secs: 20,
            access_token_lifetime_secs: 300,
            refresh_token_lifetime_secs: 86_400,
            token_expiry_margin_secs: 10,
            title_throttle_ms: 3_000,
            content_throttle_ms: 5_000,
            label_throttle_ms: 3_000,
            health_poll_interval_secs: 5,
            health_retry_delay_secs: 10,
            health_max_retries: 5,
        }
    }
}

impl Config {
    /// Load configuration from the config file, falling back to defaults.
    /// Environment variables win over the file.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            debug!(path = %config_path.display(), "Loading config file");
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.load_from_env();
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    fn load_from_env(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(level) = lookup(ENV_LOG_LEVEL).filter(|v| !v.trim().is_empty()) {
            self.log_level = level;
        }
        if let Some(url) = lookup(ENV_SERVER_URL).filter(|v| !v.trim().is_empty()) {
            self.server_url = url;
        }
    }

    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> CoreResult<()> {
        self.server_url()?;
        if self.access_token_lifetime_secs <= self.token_expiry_margin_secs {
            return Err(CoreError::Config(
                "access_token_lifetime_secs must exceed token_expiry_margin_secs".to_string(),
            ));
        }
        if self.title_throttle_ms == 0 || self.content_throttle_ms == 0 {
            return Err(CoreError::Config(
                "throttle windows must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Get the server URL as a parsed URL.
    pub fn server_url(&self) -> CoreResult<Url> {
        Url::parse(&self.server_url).map_err(CoreError::from)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn title_throttle(&self) -> Duration {
        Duration::from_millis(self.title_throttle_ms)
    }

    pub fn content_throttle(&self) -> Duration {
        Duration::from_millis(self.content_throttle_ms)
    }

    pub fn label_throttle(&self) -> Duration {
        Duration::from_millis(self.label_throttle_ms)
    }

    pub fn health_poll_interval(&self) -> Duration {
        Duration::from_secs(self.health_poll_interval_secs)
    }

    pub fn health_retry_delay(&self) -> Duration {
        Duration::from_secs(self.health_retry_delay_secs)
    }
}
