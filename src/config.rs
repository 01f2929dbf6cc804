use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use physician_finder_core::search::{
    SearchSettings, DEFAULT_MAX_LIMIT, DEFAULT_PAGE_LIMIT, MIN_SIMILARITY_THRESHOLD,
};

/// Environment variable that overrides `db.url`.
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub db: DbConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
        }
    }
}

fn default_max_connections() -> u32 {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    #[serde(default = "default_limit")]
    pub default_limit: i64,
    #[serde(default = "default_max_limit")]
    pub max_limit: i64,
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
            similarity_threshold: default_similarity_threshold(),
        }
    }
}

fn default_limit() -> i64 {
    DEFAULT_PAGE_LIMIT
}
fn default_max_limit() -> i64 {
    DEFAULT_MAX_LIMIT
}
fn default_similarity_threshold() -> f64 {
    MIN_SIMILARITY_THRESHOLD
}

impl SearchConfig {
    pub fn settings(&self) -> SearchSettings {
        SearchSettings {
            default_limit: self.default_limit,
            max_limit: self.max_limit,
            similarity_threshold: self.similarity_threshold,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

impl Config {
    /// The database URL. Only `None` before [`load_config`] has run.
    pub fn database_url(&self) -> Result<&str> {
        self.db
            .url
            .as_deref()
            .context("No database URL configured. Set db.url or DATABASE_URL.")
    }
}

/// Reads, merges and validates the config file.
///
/// `DATABASE_URL` (including one loaded from `.env`) replaces `db.url`.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config = parse_config(&content, std::env::var(DATABASE_URL_ENV).ok())?;
    Ok(config)
}

/// Parses config text, applies the environment URL override, and validates.
pub fn parse_config(content: &str, env_database_url: Option<String>) -> Result<Config> {
    let mut config: Config =
        toml::from_str(content).with_context(|| "Failed to parse config file")?;

    if let Some(url) = env_database_url.filter(|u| !u.trim().is_empty()) {
        config.db.url = Some(url);
    }

    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    match config.db.url.as_deref() {
        None => anyhow::bail!("db.url must be set (or provide DATABASE_URL)"),
        Some(url) if url.trim().is_empty() => anyhow::bail!("db.url must not be empty"),
        Some(url) if !url.starts_with("postgres://") && !url.starts_with("postgresql://") => {
            anyhow::bail!("db.url must be a postgres:// or postgresql:// URL")
        }
        Some(_) => {}
    }

    if config.db.max_connections < 1 {
        anyhow::bail!("db.max_connections must be >= 1");
    }

    // Validate search
    if config.search.default_limit < 1 {
        anyhow::bail!("search.default_limit must be >= 1");
    }
    if config.search.max_limit < config.search.default_limit {
        anyhow::bail!(
            "search.max_limit ({}) must be >= search.default_limit ({})",
            config.search.max_limit,
            config.search.default_limit
        );
    }
    if !(0.0..=1.0).contains(&config.search.similarity_threshold) {
        anyhow::bail!("search.similarity_threshold must be in [0.0, 1.0]");
    }

    if config.server.bind.trim().is_empty() {
        anyhow::bail!("server.bind must not be empty");
    }

    Ok(())
}
