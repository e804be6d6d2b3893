use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_url: String,
    pub auth_token: Option<String>,
    /// Where the record store is persisted between sessions (disabled if unset).
    pub record_cache_path: Option<PathBuf>,
    pub asset_root: PathBuf,
    pub asset_cache_dir: PathBuf,
    pub query_cache_ttl: Option<Duration>,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from any key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let query_cache_ttl = match lookup("QUERY_CACHE_TTL_SECS") {
            Some(secs) => Some(Duration::from_secs(
                secs.trim()
                    .parse()
                    .context("QUERY_CACHE_TTL_SECS must be a whole number of seconds")?,
            )),
            None => None,
        };

        Ok(Self {
            api_url: lookup("API_URL")
                .unwrap_or_else(|| "http://localhost:8080/graphql".to_string()),
            auth_token: lookup("AUTH_TOKEN").filter(|token| !token.is_empty()),
            record_cache_path: lookup("RECORD_CACHE_PATH").map(PathBuf::from),
            asset_root: lookup("ASSET_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("assets")),
            asset_cache_dir: lookup("ASSET_CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".cache/assets")),
            query_cache_ttl,
        })
    }
}
