use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;
use thiserror::Error;

use crate::urlutils::EmailObfuscation;

/// Default number of records committed to Solr per chunk.
pub const DEFAULT_FLUSH_SIZE: usize = 100_000;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the synchronizer and its HTTP surface.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Base URL of the Solr core receiving the documents.
    pub solr_url: String,
    /// JSON Lines export of the bibliographic records.
    pub records_path: PathBuf,
    /// Directory holding `<recid>.txt` full-text attachments.
    pub fulltext_dir: Option<PathBuf>,
    /// Number of records submitted between two commits.
    pub flush_size: usize,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
    /// Public base URL of the site, used for generated links and images.
    pub site_url: String,
    /// Protection applied to email addresses embedded in pages.
    pub email_obfuscation: EmailObfuscation,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        let flush_size = load_env_optional("FLUSH_SIZE")
            .map(|value| {
                value
                    .parse::<usize>()
                    .ok()
                    .filter(|size| *size >= 1)
                    .ok_or_else(|| ConfigError::InvalidValue("FLUSH_SIZE".into()))
            })
            .transpose()?
            .unwrap_or(DEFAULT_FLUSH_SIZE);

        Ok(Self {
            solr_url: load_env("SOLR_URL")?,
            records_path: load_env_optional("RECORDS_PATH")
                .unwrap_or_else(|| "records.jsonl".to_string())
                .into(),
            fulltext_dir: load_env_optional("FULLTEXT_DIR").map(PathBuf::from),
            flush_size,
            server_port: load_env_optional("SERVER_PORT")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".into()))
                })
                .transpose()?,
            site_url: load_env_optional("SITE_URL")
                .unwrap_or_else(|| "http://localhost".to_string()),
            email_obfuscation: load_env_optional("EMAIL_OBFUSCATION_MODE")
                .map(|value| {
                    value
                        .parse::<i32>()
                        .ok()
                        .and_then(|mode| EmailObfuscation::try_from(mode).ok())
                        .ok_or_else(|| ConfigError::InvalidValue("EMAIL_OBFUSCATION_MODE".into()))
                })
                .transpose()?
                .unwrap_or_default(),
        })
    }
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    load_env_optional(key).ok_or_else(|| ConfigError::MissingVariable(key.to_string()))
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() -> Result<&'static Config, ConfigError> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    tracing::debug!(
        solr_url = %config.solr_url,
        records = %config.records_path.display(),
        fulltext_dir = ?config.fulltext_dir,
        flush_size = config.flush_size,
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    Ok(CONFIG.get_or_init(|| config))
}
