//! Configuration management
//!
//! Settings come from an optional TOML file, overlaid by environment
//! variables of the form `GWONBOARD__SECTION__KEY` (for example
//! `GWONBOARD__HTTP__TIMEOUT=20`).

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const ENV_PREFIX: &str = "GWONBOARD";

/// Root configuration structure
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    /// HTTP client settings shared by every gateway session
    #[serde(default)]
    pub http: HttpConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,

    /// External IP lookup service
    #[serde(default)]
    pub public_ip: PublicIpConfig,

    /// Device record store
    #[serde(default)]
    pub store: StoreConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HttpConfig {
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,

    /// User-Agent sent to gateways; they reject requests without a browser one
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            connect_timeout: default_connect_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Log level, overridden by RUST_LOG when set
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PublicIpConfig {
    /// Plain-text "what is my IP" endpoint
    #[serde(default = "default_public_ip_url")]
    pub url: String,
}

impl Default for PublicIpConfig {
    fn default() -> Self {
        Self {
            url: default_public_ip_url(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StoreConfig {
    /// Path of the JSON device store
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

// Default value functions
fn default_timeout() -> u64 {
    10
}

fn default_connect_timeout() -> u64 {
    5
}

pub(crate) fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/143.0.0.0 Safari/537.36 Edg/143.0.0.0"
        .to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_public_ip_url() -> String {
    "https://api.ipify.org/".to_string()
}

fn default_store_path() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("gwonboard/devices.json"))
        .unwrap_or_else(|| PathBuf::from("devices.json"))
}

impl Config {
    /// Load configuration from `explicit`, or from the first default
    /// location that exists, then apply environment overrides.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(p) if !p.exists() => bail!("Config file not found: {}", p.display()),
            Some(p) => Some(p.to_path_buf()),
            None => Self::search_paths().into_iter().find(|p| p.exists()),
        };

        let mut builder = ::config::Config::builder();
        match path {
            Some(ref path) => {
                tracing::debug!("Loading config from: {}", path.display());
                builder = builder.add_source(
                    ::config::File::from(path.as_path()).format(::config::FileFormat::Toml),
                );
            }
            None => tracing::debug!("No config file found, using defaults"),
        }

        builder
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to read config")?
            .try_deserialize()
            .context("Failed to parse config")
    }

    fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("gwonboard.toml")];
        if let Some(home) = dirs::config_dir() {
            paths.push(home.join("gwonboard/config.toml"));
        }
        paths
    }

    /// Render the effective configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }
}
