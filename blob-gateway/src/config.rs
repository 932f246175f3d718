use serde::{Deserialize, Serialize};
use shared::observability::{LogFormat, LogLevel};
use std::env;

pub const DEFAULT_PORT: u16 = 3000;
/// Same as the multipart extractor's own default
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 2 * 1024 * 1024;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
    pub environment: String,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub connection_string: String,
    /// Only container creation requires this
    pub account_name: Option<String>,
    pub text_container: String,
    pub image_container: String,
}

impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageConfig")
            .field("connection_string", &"<redacted>")
            .field("account_name", &self.account_name)
            .field("text_container", &self.text_container)
            .field("image_container", &self.image_container)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: LogLevel,
    pub format: LogFormat,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let environment = var("APP_ENV").unwrap_or(defaults.server.environment);
        let production = environment == "production";

        let format = match var("LOG_FORMAT") {
            Some(raw) => raw
                .parse()
                .map_err(|_| ConfigError::InvalidValue("LOG_FORMAT", raw))?,
            None if production => LogFormat::Json,
            None => defaults.logging.format,
        };

        let level = match var("LOG_LEVEL") {
            Some(raw) => raw
                .parse()
                .map_err(|_| ConfigError::InvalidValue("LOG_LEVEL", raw))?,
            None => defaults.logging.level,
        };

        Ok(Config {
            server: ServerConfig {
                host: var("HOST").unwrap_or(defaults.server.host),
                port: match var("PORT") {
                    Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidPort)?,
                    None => defaults.server.port,
                },
                max_upload_bytes: match var("MAX_UPLOAD_BYTES") {
                    Some(raw) => raw
                        .trim()
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("MAX_UPLOAD_BYTES", raw))?,
                    None => defaults.server.max_upload_bytes,
                },
                environment,
            },
            storage: StorageConfig {
                connection_string: var("AZURE_STORAGE_CONNECTION_STRING")
                    .ok_or(ConfigError::MissingVar("AZURE_STORAGE_CONNECTION_STRING"))?,
                account_name: var("AZURE_STORAGE_ACCOUNT_NAME"),
                text_container: var("TEXT_CONTAINER").unwrap_or(defaults.storage.text_container),
                image_container: var("IMAGE_CONTAINER")
                    .unwrap_or(defaults.storage.image_container),
            },
            logging: LoggingConfig { level, format },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::InvalidPort);
        }

        if self.server.max_upload_bytes == 0 {
            return Err(ConfigError::InvalidConfig(
                "Upload limit must be > 0".to_string(),
            ));
        }

        if self.storage.text_container.is_empty() || self.storage.image_container.is_empty() {
            return Err(ConfigError::InvalidConfig(
                "Container names must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.server.environment == "production"
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: DEFAULT_PORT,
                max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
                environment: "development".to_string(),
            },
            storage: StorageConfig {
                connection_string: String::new(),
                account_name: None,
                text_container: "textfiles".to_string(),
                image_container: "images".to_string(),
            },
            logging: LoggingConfig {
                level: LogLevel::Info,
                format: LogFormat::Pretty,
            },
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
