//! Configuration parsing and validation.
//!
//! EA Discovery is configured via a TOML file (default: `config/ead.toml`).
//! Every section has defaults, so an empty file is a valid configuration.
//!
//! # Example
//!
//! ```toml
//! [db]
//! path = "./data/ead.sqlite"
//!
//! [server]
//! bind = "127.0.0.1:7341"
//!
//! [model]
//! api_base = "https://api.anthropic.com"
//! model = "claude-sonnet-4-20250514"
//! analysis_max_tokens = 4000
//! generation_max_tokens = 8000
//! max_retries = 2
//! initial_backoff_ms = 500
//! timeout_secs = 120
//! upload_max_bytes = 16000000
//!
//! [store]
//! backend = "sqlite"          # or "rest"
//! # url = "https://project.supabase.co/rest/v1"
//! table = "engagements"
//! ```
//!
//! Secrets never live in the file: the model key is read from
//! `ANTHROPIC_API_KEY` on every request and the REST store key from
//! `EAD_STORE_KEY`. `UPLOAD_MAX_BYTES` overrides `model.upload_max_bytes`
//! when it holds a positive integer.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";
pub const STORE_KEY_ENV: &str = "EAD_STORE_KEY";
pub const UPLOAD_MAX_BYTES_ENV: &str = "UPLOAD_MAX_BYTES";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub db: DbConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data/ead.sqlite"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:7341".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_analysis_max_tokens")]
    pub analysis_max_tokens: u32,
    #[serde(default = "default_generation_max_tokens")]
    pub generation_max_tokens: u32,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_upload_max_bytes")]
    pub upload_max_bytes: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            model: default_model(),
            analysis_max_tokens: default_analysis_max_tokens(),
            generation_max_tokens: default_generation_max_tokens(),
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            timeout_secs: default_timeout_secs(),
            upload_max_bytes: default_upload_max_bytes(),
        }
    }
}

fn default_api_base() -> String {
    "https://api.anthropic.com".to_string()
}
fn default_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}
fn default_analysis_max_tokens() -> u32 {
    4000
}
fn default_generation_max_tokens() -> u32 {
    8000
}
fn default_max_retries() -> u32 {
    2
}
fn default_initial_backoff_ms() -> u64 {
    500
}
fn default_timeout_secs() -> u64 {
    120
}
fn default_upload_max_bytes() -> u64 {
    16_000_000
}

impl ModelConfig {
    /// Upload ceiling after applying the `UPLOAD_MAX_BYTES` override.
    pub fn effective_upload_max_bytes(&self) -> u64 {
        parse_upload_override(std::env::var(UPLOAD_MAX_BYTES_ENV).ok().as_deref())
            .unwrap_or(self.upload_max_bytes)
    }
}

/// Only a positive integer overrides the configured ceiling.
fn parse_upload_override(raw: Option<&str>) -> Option<u64> {
    raw.and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|v| *v > 0)
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Sqlite,
    Rest,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_table")]
    pub table: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Sqlite,
            url: None,
            table: default_table(),
        }
    }
}

fn default_table() -> String {
    "engagements".to_string()
}

impl Config {
    /// Defaults for every section, used when no config file exists.
    pub fn minimal() -> Self {
        Self::default()
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

/// Load `path` when it exists, otherwise fall back to [`Config::minimal`].
pub fn load_or_minimal(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        Ok(Config::minimal())
    }
}

fn validate(config: &Config) -> Result<()> {
    if config.model.api_base.trim().is_empty() {
        anyhow::bail!("model.api_base must not be empty");
    }
    if config.model.model.trim().is_empty() {
        anyhow::bail!("model.model must not be empty");
    }
    if config.model.analysis_max_tokens == 0 || config.model.generation_max_tokens == 0 {
        anyhow::bail!("model max_tokens values must be > 0");
    }
    if config.model.initial_backoff_ms == 0 {
        anyhow::bail!("model.initial_backoff_ms must be > 0");
    }
    if config.model.upload_max_bytes == 0 {
        anyhow::bail!("model.upload_max_bytes must be > 0");
    }
    if config.store.table.trim().is_empty() {
        anyhow::bail!("store.table must not be empty");
    }
    if config.store.backend == StoreBackend::Rest && config.store.url.is_none() {
        anyhow::bail!("store.url must be specified when store.backend is 'rest'");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    #[test]
    fn empty_file_uses_defaults() {
        let file = write_config("");
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.model.max_retries, 2);
        assert_eq!(config.model.initial_backoff_ms, 500);
        assert_eq!(config.model.analysis_max_tokens, 4000);
        assert_eq!(config.model.generation_max_tokens, 8000);
        assert_eq!(config.model.upload_max_bytes, 16_000_000);
        assert_eq!(config.store.backend, StoreBackend::Sqlite);
        assert_eq!(config.store.table, "engagements");
    }

    #[test]
    fn partial_sections_keep_field_defaults() {
        let file = write_config(
            r#"
[db]
path = "/tmp/x.sqlite"

[model]
model = "other-model"
"#,
        );
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.db.path, PathBuf::from("/tmp/x.sqlite"));
        assert_eq!(config.model.model, "other-model");
        assert_eq!(config.model.api_base, "https://api.anthropic.com");
    }

    #[test]
    fn rest_backend_requires_url() {
        let file = write_config("[store]\nbackend = \"rest\"\n");
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("store.url"));
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let file = write_config("[store]\nbackend = \"mongo\"\n");
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn upload_override_requires_positive_integer() {
        assert_eq!(parse_upload_override(Some("2048")), Some(2048));
        assert_eq!(parse_upload_override(Some(" 10 ")), Some(10));
        assert_eq!(parse_upload_override(Some("0")), None);
        assert_eq!(parse_upload_override(Some("-5")), None);
        assert_eq!(parse_upload_override(Some("lots")), None);
        assert_eq!(parse_upload_override(None), None);
    }

    #[test]
    fn missing_file_falls_back_to_minimal() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_or_minimal(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:7341");
    }
}
