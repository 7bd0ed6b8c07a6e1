// src/config/app.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::pipeline::PipelineOptions;

pub const ENV_CONFIG_PATH: &str = "NEWS_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/news.toml";

const MAX_CONCURRENCY: usize = 16;

fn default_feed_url() -> String {
    "https://www.goodnewsnetwork.org/feed/".to_string()
}
fn default_geocode_url() -> String {
    "https://nominatim.openstreetmap.org/search".to_string()
}
fn default_user_agent() -> String {
    "VoiceOfPeaceDemo/1.0 (+your-email@example.com)".to_string()
}
fn default_language() -> String {
    "en".to_string()
}
fn default_max_items() -> usize {
    crate::pipeline::DEFAULT_MAX_ITEMS
}
fn default_cache_ttl_secs() -> u64 {
    crate::cache::DEFAULT_TTL_SECS
}
fn default_http_timeout_secs() -> u64 {
    10
}
fn default_connect_timeout_secs() -> u64 {
    4
}
fn default_resolve_concurrency() -> usize {
    4
}
fn default_source_name() -> String {
    crate::pipeline::DEFAULT_SOURCE_NAME.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_feed_url")]
    pub feed_url: String,
    #[serde(default = "default_geocode_url")]
    pub geocode_url: String,
    /// Client label sent on every outbound request (Nominatim requires one).
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_max_items")]
    pub max_items: usize,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_resolve_concurrency")]
    pub resolve_concurrency: usize,
    #[serde(default = "default_source_name")]
    pub default_source_name: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            feed_url: default_feed_url(),
            geocode_url: default_geocode_url(),
            user_agent: default_user_agent(),
            language: default_language(),
            max_items: default_max_items(),
            cache_ttl_secs: default_cache_ttl_secs(),
            http_timeout_secs: default_http_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            resolve_concurrency: default_resolve_concurrency(),
            default_source_name: default_source_name(),
        }
    }
}

impl AppConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let cfg: AppConfig =
            toml::from_str(&data).with_context(|| format!("parsing {}", path.display()))?;
        Ok(cfg.sanitized())
    }

    /// Load config using env var + fallbacks, then apply env overrides:
    /// 1) $NEWS_CONFIG_PATH
    /// 2) config/news.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        let base = if let Ok(p) = env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from_file(&pb)?
        } else if Path::new(DEFAULT_CONFIG_PATH).exists() {
            Self::load_from_file(DEFAULT_CONFIG_PATH)?
        } else {
            Self::default()
        };
        Ok(base.with_env_overrides().sanitized())
    }

    fn with_env_overrides(mut self) -> Self {
        let non_empty = |key: &str| env::var(key).ok().filter(|v| !v.trim().is_empty());
        if let Some(v) = non_empty("NEWS_FEED_URL") {
            self.feed_url = v;
        }
        if let Some(v) = non_empty("GEOCODE_URL") {
            self.geocode_url = v;
        }
        if let Some(v) = non_empty("GEOCODE_USER_AGENT") {
            self.user_agent = v;
        }
        self
    }

    fn sanitized(mut self) -> Self {
        if self.max_items == 0 {
            self.max_items = default_max_items();
        }
        self.resolve_concurrency = self.resolve_concurrency.clamp(1, MAX_CONCURRENCY);
        if self.http_timeout_secs == 0 {
            self.http_timeout_secs = default_http_timeout_secs();
        }
        if self.connect_timeout_secs == 0 {
            self.connect_timeout_secs = default_connect_timeout_secs();
        }
        if self.user_agent.trim().is_empty() {
            self.user_agent = default_user_agent();
        }
        self
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            max_items: self.max_items,
            cache_ttl_secs: self.cache_ttl_secs,
            resolve_concurrency: self.resolve_concurrency,
            default_source_name: self.default_source_name.clone(),
        }
    }

    /// Shared client for feed + geocode requests. The timeout bounds every
    /// outbound call; a timed-out lookup is just another failed lookup.
    pub fn build_http_client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .user_agent(self.user_agent.as_str())
            .connect_timeout(Duration::from_secs(self.connect_timeout_secs))
            .timeout(Duration::from_secs(self.http_timeout_secs))
            .build()
            .context("building http client")
    }
}
