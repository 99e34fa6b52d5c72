//! Engine connection and index configuration.
//!
//! Configuration lives in `~/.config/catalog-search/config.toml` (or a path
//! given with `--config`):
//!
//! ```toml
//! [engine]
//! url = "http://localhost:9200"
//! username = "elastic"
//! timeout_ms = 10000
//!
//! [indices]
//! catalog = "tech_books"
//! legal = "legal-documents-v2"
//!
//! [highlight]
//! pre_tag = "<mark>"
//! post_tag = "</mark>"
//! ```
//!
//! Environment variables override the file: `CATALOG_SEARCH_URL`,
//! `CATALOG_SEARCH_USER`, `CATALOG_SEARCH_PASSWORD`, `CATALOG_SEARCH_TIMEOUT_MS`.
//! Keep the password in the environment rather than the file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::search::highlight::{DEFAULT_POST_TAG, DEFAULT_PRE_TAG};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadFile(#[from] std::io::Error),

    #[error("Failed to parse config TOML: {0}")]
    ParseToml(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub url: String,
    pub username: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:9200".into(),
            username: None,
            password: None,
            timeout_ms: 10_000,
        }
    }
}

impl EngineConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IndexConfig {
    pub catalog: String,
    pub legal: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            catalog: "tech_books".into(),
            legal: "legal-documents-v2".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HighlightConfig {
    pub pre_tag: String,
    pub post_tag: String,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            pre_tag: DEFAULT_PRE_TAG.into(),
            post_tag: DEFAULT_POST_TAG.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct SearchConfig {
    pub engine: EngineConfig,
    pub indices: IndexConfig,
    pub highlight: HighlightConfig,
}

impl SearchConfig {
    /// Load from `path`, else the default config file if it exists, else
    /// defaults. Environment overrides are applied last, then validated.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut cfg = match path {
            Some(p) => Self::from_file(p)?,
            None => match default_config_path() {
                Some(p) if p.exists() => Self::from_file(&p)?,
                _ => Self::default(),
            },
        };
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        debug!(path = %path.display(), "loading config");
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(url) = dotenvy::var("CATALOG_SEARCH_URL") {
            self.engine.url = url;
        }
        if let Ok(user) = dotenvy::var("CATALOG_SEARCH_USER") {
            self.engine.username = Some(user);
        }
        if let Ok(password) = dotenvy::var("CATALOG_SEARCH_PASSWORD") {
            self.engine.password = Some(password);
        }
        if let Ok(val) = dotenvy::var("CATALOG_SEARCH_TIMEOUT_MS") {
            self.engine.timeout_ms = val.trim().parse::<u64>().map_err(|_| {
                ConfigError::Validation(format!(
                    "CATALOG_SEARCH_TIMEOUT_MS must be a number of milliseconds, got '{val}'"
                ))
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.engine.url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::Validation(format!(
                "engine.url must be an http(s) URL, got '{url}'"
            )));
        }
        if self.engine.timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "engine.timeout_ms must be greater than zero".into(),
            ));
        }
        if self.indices.catalog.trim().is_empty() || self.indices.legal.trim().is_empty() {
            return Err(ConfigError::Validation("index names must not be empty".into()));
        }
        if self.highlight.pre_tag.is_empty() || self.highlight.post_tag.is_empty() {
            return Err(ConfigError::Validation("highlight tags must not be empty".into()));
        }
        Ok(())
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("com", "catalog-search", "catalog-search")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}
