use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Pipeline configuration. Values come from defaults, then an optional TOML
/// file, then `MULTIVERSE_*` environment overrides, in that order.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Catalog service root; one list endpoint per collection hangs off it.
    pub base_url: String,
    /// Cache database URL; `None` means a SQLite file in the user data dir.
    pub database_url: Option<String>,
    /// TTL for merged search results (seconds).
    pub search_ttl_secs: i64,
    /// Per-request timeout. The backend cold-starts, so keep this generous.
    pub request_timeout_secs: u64,
    /// Per-collection item limit for full search/browse cycles.
    pub fetch_limit: u32,
    /// Per-collection limit for inline quick search.
    pub quick_limit: u32,
    /// Combined result cap for quick search.
    pub quick_cap: usize,
    /// Combined result cap for full search/browse cycles.
    pub max_results: usize,
    pub page_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "https://multiverse-backend.onrender.com/api".to_string(),
            database_url: None,
            search_ttl_secs: 10 * 60,
            request_timeout_secs: 20,
            fetch_limit: 100,
            quick_limit: 5,
            quick_cap: 8,
            max_results: 1000,
            page_size: crate::browse::DEFAULT_PAGE_SIZE,
        }
    }
}

impl Config {
    /// Load from an optional TOML file, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut cfg = match path {
            Some(p) => {
                let text = std::fs::read_to_string(p)
                    .with_context(|| format!("reading config file: {}", p.display()))?;
                toml::from_str(&text)
                    .with_context(|| format!("parsing config file: {}", p.display()))?
            }
            None => Config::default(),
        };
        cfg.apply_env();
        Ok(cfg)
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("MULTIVERSE_BASE_URL") {
            if !url.trim().is_empty() {
                self.base_url = url;
            }
        }
        if let Ok(url) = std::env::var("MULTIVERSE_DATABASE_URL") {
            if !url.trim().is_empty() {
                self.database_url = Some(url);
            }
        }
        if let Some(ttl) = env_parse("MULTIVERSE_SEARCH_TTL_SECS") {
            self.search_ttl_secs = ttl;
        }
        if let Some(timeout) = env_parse("MULTIVERSE_TIMEOUT_SECS") {
            self.request_timeout_secs = timeout;
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}
