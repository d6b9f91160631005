use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub fixtures: FixturesConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_backend")]
    pub backend: StorageBackend,
    /// Directory holding one JSON file per storage key (the "profile")
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
            data_dir: default_data_dir(),
        }
    }
}

fn default_storage_backend() -> StorageBackend {
    StorageBackend::File
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    File,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Shared demo secret accepted for every customer account
    #[serde(default = "default_customer_secret")]
    pub customer_secret: String,
    /// Shared demo secret accepted for every professional account
    #[serde(default = "default_professional_secret")]
    pub professional_secret: String,
    /// Domain used to derive professional login emails from their names
    #[serde(default = "default_professional_email_domain")]
    pub professional_email_domain: String,
    /// Delay awaited before login/signup resolve (default: 0)
    #[serde(default)]
    pub simulated_latency_ms: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            customer_secret: default_customer_secret(),
            professional_secret: default_professional_secret(),
            professional_email_domain: default_professional_email_domain(),
            simulated_latency_ms: 0,
        }
    }
}

fn default_customer_secret() -> String {
    "user123".to_string()
}

fn default_professional_secret() -> String {
    "pro123".to_string()
}

fn default_professional_email_domain() -> String {
    "homeservices.com".to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LedgerConfig {
    /// Reject status changes that skip the intended booking lifecycle
    #[serde(default)]
    pub enforce_transitions: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FixturesConfig {
    /// Directory with services.json, professionals.json, users.json and admins.json.
    /// The embedded demo fixtures are used when unset.
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
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

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            info!("Loading configuration from {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Self::from_toml(&content)
        } else {
            info!("No config file found, using defaults");
            Ok(Config::default())
        }
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).with_context(|| "Failed to parse configuration file")
    }

    /// In-memory configuration used by tests and throwaway sessions.
    pub fn ephemeral() -> Self {
        let mut config = Self::default();
        config.storage.backend = StorageBackend::Memory;
        config
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            auth: AuthConfig::default(),
            ledger: LedgerConfig::default(),
            fixtures: FixturesConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
