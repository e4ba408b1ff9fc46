use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use uuid::Uuid;

/// Runtime configuration for the resolver, the catalog client and the community store.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    lookup_enabled: bool,
    lookup_interval_ms: u64,
    lookup_timeout_ms: u64,
    lookup_base_url: String,
    catalog_base_url: String,
    catalog_timeout_ms: u64,
    cache_capacity: usize,
    recent_limit: usize,
    top_limit: usize,
    request_timeout_ms: u64,
    community_name_max: usize,
    origin_store_path: Option<PathBuf>,
    user_agent: String,
    client_id: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        let client_id = format!("music-passport-{}", Uuid::new_v4());
        let user_agent = format!(
            "music-passport/{} ( https://musicbrainz.org ; unique-id={client_id} )",
            env!("CARGO_PKG_VERSION")
        );

        Self {
            lookup_enabled: true,
            lookup_interval_ms: 1100,
            lookup_timeout_ms: 3000,
            lookup_base_url: String::from("https://musicbrainz.org/ws/2"),
            catalog_base_url: String::from("https://api.spotify.com/v1"),
            catalog_timeout_ms: 15_000,
            cache_capacity: 10_000,
            recent_limit: 12,
            top_limit: 12,
            request_timeout_ms: 20_000,
            community_name_max: 80,
            origin_store_path: None,
            user_agent,
            client_id,
        }
    }
}

impl AppConfig {
    /// Reads an optional TOML file and then applies `PASSPORT_*` environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) if path.exists() => Self::from_toml_file(path)?,
            _ => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        Ok(config)
    }

    /// Applies overrides using `lookup` as the variable source.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("PASSPORT_LOOKUP_ENABLED") {
            self.lookup_enabled = parse_flag(&value)
                .with_context(|| format!("PASSPORT_LOOKUP_ENABLED has invalid value '{value}'"))?;
        }
        if let Some(value) = lookup("PASSPORT_LOOKUP_INTERVAL_MS") {
            self.lookup_interval_ms = value
                .trim()
                .parse()
                .with_context(|| format!("PASSPORT_LOOKUP_INTERVAL_MS has invalid value '{value}'"))?;
        }
        if let Some(value) = lookup("PASSPORT_CACHE_CAPACITY") {
            self.cache_capacity = value
                .trim()
                .parse()
                .with_context(|| format!("PASSPORT_CACHE_CAPACITY has invalid value '{value}'"))?;
        }
        if let Some(value) = lookup("PASSPORT_ORIGIN_STORE") {
            let trimmed = value.trim();
            self.origin_store_path = if trimmed.is_empty() {
                None
            } else {
                Some(PathBuf::from(trimmed))
            };
        }
        Ok(())
    }

    pub fn with_lookup_enabled(mut self, enabled: bool) -> Self {
        self.lookup_enabled = enabled;
        self
    }

    pub fn with_lookup_base_url(mut self, url: impl Into<String>) -> Self {
        self.lookup_base_url = url.into();
        self
    }

    pub fn with_origin_store_path(mut self, path: Option<PathBuf>) -> Self {
        self.origin_store_path = path;
        self
    }

    pub fn lookup_enabled(&self) -> bool {
        self.lookup_enabled
    }

    pub fn lookup_interval(&self) -> Duration {
        Duration::from_millis(self.lookup_interval_ms)
    }

    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.lookup_timeout_ms)
    }

    pub fn lookup_base_url(&self) -> &str {
        &self.lookup_base_url
    }

    pub fn catalog_base_url(&self) -> &str {
        &self.catalog_base_url
    }

    pub fn catalog_timeout(&self) -> Duration {
        Duration::from_millis(self.catalog_timeout_ms)
    }

    pub fn cache_capacity(&self) -> usize {
        self.cache_capacity
    }

    pub fn recent_limit(&self) -> usize {
        self.recent_limit
    }

    /// Number of top artists requested from the catalog, kept within the catalog's 1..=50 window.
    pub fn top_limit(&self) -> usize {
        self.top_limit.clamp(1, 50)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn community_name_max(&self) -> usize {
        self.community_name_max
    }

    pub fn origin_store_path(&self) -> Option<&Path> {
        self.origin_store_path.as_deref()
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
