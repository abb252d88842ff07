//! Configuration parsing and validation.
//!
//! Configuration is loaded from a TOML file (default `./config/chunkscope.toml`).
//! Every section is optional:
//!
//! ```toml
//! [api]
//! base_url = "http://localhost:8000/api/v1"
//!
//! [listing]
//! per_page = 20
//!
//! [logging]
//! level = "info"
//! ```
//!
//! `CHUNKSCOPE_API_URL`, when set, replaces `api.base_url`.

use anyhow::{Context, Result};
use reqwest::Url;
use serde::Deserialize;
use std::path::Path;

/// Environment variable overriding [`ApiConfig::base_url`].
pub const API_URL_ENV: &str = "CHUNKSCOPE_API_URL";

/// Path used when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "./config/chunkscope.toml";

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub listing: ListingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8000/api/v1".to_string()
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ListingConfig {
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            per_page: default_per_page(),
        }
    }
}

fn default_per_page() -> u32 {
    20
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct LoggingConfig {
    /// `tracing` filter directive used when `RUST_LOG` is unset.
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

/// Read, parse and validate the config at `path`.
///
/// The file must exist. Applies the environment override before validating.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    finish(config)
}

/// Like [`load_config`], but a missing file at the default path yields the
/// defaults instead of an error.
pub fn load_or_default(path: &Path) -> Result<Config> {
    if !path.exists() && path == Path::new(DEFAULT_CONFIG_PATH) {
        return finish(Config::default());
    }
    load_config(path)
}

fn finish(config: Config) -> Result<Config> {
    let config = apply_env_override(config, std::env::var(API_URL_ENV).ok());
    validate(&config)?;
    Ok(config)
}

/// Replace `api.base_url` with `value` when it is set and non-empty.
pub fn apply_env_override(mut config: Config, value: Option<String>) -> Config {
    if let Some(url) = value.filter(|v| !v.trim().is_empty()) {
        config.api.base_url = url;
    }
    config
}

pub fn validate(config: &Config) -> Result<()> {
    // Validate api
    let url = Url::parse(&config.api.base_url)
        .with_context(|| format!("api.base_url is not a valid URL: '{}'", config.api.base_url))?;
    match url.scheme() {
        "http" | "https" => {}
        other => anyhow::bail!(
            "api.base_url must use http or https, got '{}'",
            other
        ),
    }

    // Validate listing
    if !(1..=100).contains(&config.listing.per_page) {
        anyhow::bail!("listing.per_page must be in [1, 100]");
    }

    if config.logging.level.trim().is_empty() {
        anyhow::bail!("logging.level must not be empty");
    }

    Ok(())
}
