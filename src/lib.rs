// src/lib.rs
// Public library surface for the binary, the probe tool, and integration tests.

pub mod api;
pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod geocode;
pub mod ingest;
pub mod metrics;
pub mod pipeline;
pub mod resolver;

use std::sync::Arc;

pub use crate::api::{create_router, AppState};
pub use crate::config::AppConfig;

use crate::clock::SystemClock;
use crate::geocode::NominatimClient;
use crate::ingest::providers::rss::RssFeedProvider;
use crate::pipeline::NewsPipeline;
use crate::resolver::LocationResolver;

/// Wire the production pipeline (live feed, Nominatim, wall clock) from config.
pub fn build_pipeline(cfg: &AppConfig) -> anyhow::Result<NewsPipeline> {
    let http = cfg.build_http_client()?;
    let feed = Arc::new(RssFeedProvider::from_url(cfg.feed_url.clone(), http.clone()));
    let geocoder = Arc::new(NominatimClient::new(
        http,
        cfg.geocode_url.clone(),
        cfg.language.clone(),
    ));
    Ok(NewsPipeline::new(
        feed,
        LocationResolver::new(geocoder),
        Arc::new(SystemClock),
        cfg.pipeline_options(),
    ))
}

/// Full router as served by the binary (without `/metrics`).
pub fn app(cfg: &AppConfig) -> anyhow::Result<axum::Router> {
    let pipeline = build_pipeline(cfg)?;
    tracing::info!(
        feed = %cfg.feed_url,
        geocoder = %cfg.geocode_url,
        max_items = cfg.max_items,
        ttl_secs = cfg.cache_ttl_secs,
        "news pipeline ready"
    );
    Ok(create_router(AppState::new(pipeline)))
}
