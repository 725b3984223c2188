use std::net::SocketAddr;
use std::path::Path;

use serde::Deserialize;

/// Environment variable holding the eBay application id (Client ID).
pub const APP_ID_VAR: &str = "EBAY_APP_ID";

pub const DEFAULT_ENDPOINT: &str = "https://svcs.ebay.com/services/search/FindingService/v1";
pub const DEFAULT_TIMEOUT_MS: u64 = 8000;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Reading config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parsing config file: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Settings of the running service.
///
/// Everything except the application id can come from an optional YAML file.
/// The application id is only ever taken from the environment and may be
/// missing, in which case lookups answer with a configuration error.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(skip)]
    pub app_id: Option<String>,
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 80))
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            endpoint: default_endpoint(),
            timeout_ms: default_timeout_ms(),
            log_level: default_log_level(),
            app_id: None,
        }
    }
}

impl Config {
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes to unit, not to a map
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        Ok(serde_yaml::from_str(content)?)
    }

    /// Loads the YAML file (if given) and picks up the application id from the
    /// process environment.
    pub async fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                let content = tokio::fs::read_to_string(path).await?;
                Self::from_yaml(&content)?
            }
            None => Self::default(),
        };

        config.app_id = std::env::var(APP_ID_VAR)
            .ok()
            .filter(|id| !id.is_empty());

        Ok(config)
    }

    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.timeout_ms)
    }

    pub fn log_level(&self) -> tracing::Level {
        self.log_level.parse().unwrap_or(tracing::Level::INFO)
    }
}
