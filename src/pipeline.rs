//! # Feed-to-Payload Pipeline
//! Cache check -> feed fetch -> first N entries -> per-article location
//! resolution -> payload -> cache store.
//!
//! Articles are resolved through a bounded `buffered` stream, which keeps
//! output in feed order regardless of completion order. A failed lookup only
//! leaves that article's location fields null; a failed feed fetch fails the
//! whole request and leaves the cache slot untouched.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use metrics::{counter, histogram};
use serde::{Deserialize, Serialize};

use crate::cache::{CacheStatus, FreshnessCache};
use crate::clock::Clock;
use crate::error::PipelineError;
use crate::ingest::types::{Article, FeedEntry, FeedSource};
use crate::ingest::{article_from_entry, truncate_chars};
use crate::resolver::{LocationResolver, ResolvedLocation};

/// Max feed entries turned into articles.
pub const DEFAULT_MAX_ITEMS: usize = 12;
/// Output cap for `summary` (the resolver sees the full text).
pub const SUMMARY_OUTPUT_CHARS: usize = 800;
pub const DEFAULT_SOURCE_NAME: &str = "GoodNewsNetwork";

/// Article + resolved location, as served to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedArticle {
    pub title: String,
    pub summary: String,
    pub link: String,
    pub date: DateTime<Utc>,
    pub source: String,
    pub country: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub place_name: Option<String>,
}

impl EnrichedArticle {
    pub fn new(article: Article, location: ResolvedLocation) -> Self {
        Self {
            title: article.title,
            summary: truncate_chars(&article.summary, SUMMARY_OUTPUT_CHARS),
            link: article.link,
            date: article.published_at,
            source: article.source_name,
            country: location.country,
            lat: location.point.map(|p| p.lat),
            lng: location.point.map(|p| p.lng),
            place_name: location.place_name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsPayload {
    pub items: Vec<EnrichedArticle>,
    pub fetched: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub max_items: usize,
    pub cache_ttl_secs: u64,
    pub resolve_concurrency: usize,
    pub default_source_name: String,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            max_items: DEFAULT_MAX_ITEMS,
            cache_ttl_secs: crate::cache::DEFAULT_TTL_SECS,
            resolve_concurrency: 4,
            default_source_name: DEFAULT_SOURCE_NAME.to_string(),
        }
    }
}

pub struct NewsPipeline {
    feed: Arc<dyn FeedSource>,
    resolver: LocationResolver,
    cache: FreshnessCache,
    clock: Arc<dyn Clock>,
    opts: PipelineOptions,
    /// Serializes refreshes so concurrent misses cost one upstream round.
    refresh: tokio::sync::Mutex<()>,
}

impl NewsPipeline {
    pub fn new(
        feed: Arc<dyn FeedSource>,
        resolver: LocationResolver,
        clock: Arc<dyn Clock>,
        opts: PipelineOptions,
    ) -> Self {
        let cache = FreshnessCache::new(opts.cache_ttl_secs, clock.clone());
        Self {
            feed,
            resolver,
            cache,
            clock,
            opts,
            refresh: tokio::sync::Mutex::new(()),
        }
    }

    pub fn cache(&self) -> &FreshnessCache {
        &self.cache
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.opts
    }

    /// Current payload, from the cache when fresh.
    pub async fn handle(&self) -> Result<(Arc<NewsPayload>, CacheStatus), PipelineError> {
        if let Some(hit) = self.cache.get() {
            counter!("news_cache_hits_total").increment(1);
            return Ok((hit, CacheStatus::Hit));
        }

        let _guard = self.refresh.lock().await;
        // Another request may have refreshed while we waited.
        if let Some(hit) = self.cache.get() {
            counter!("news_cache_hits_total").increment(1);
            return Ok((hit, CacheStatus::Hit));
        }
        counter!("news_cache_misses_total").increment(1);

        let t0 = std::time::Instant::now();
        let payload = Arc::new(self.refresh_payload().await?);
        self.cache.put(Arc::clone(&payload));
        histogram!("news_refresh_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

        tracing::info!(
            items = payload.items.len(),
            resolved = payload.items.iter().filter(|a| a.lat.is_some()).count(),
            "news payload refreshed"
        );
        Ok((payload, CacheStatus::Miss))
    }

    async fn refresh_payload(&self) -> Result<NewsPayload, PipelineError> {
        let feed = self.feed.fetch().await.map_err(|e| {
            counter!("news_feed_errors_total").increment(1);
            tracing::warn!(error = %e, provider = self.feed.name(), "feed fetch failed");
            PipelineError::Upstream(e)
        })?;

        let source_name = feed
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(self.opts.default_source_name.as_str())
            .to_string();
        let now = self.clock.now();

        let entries = feed.entries.into_iter().take(self.opts.max_items);
        let items: Vec<EnrichedArticle> = stream::iter(entries)
            .map(|entry| self.enrich(entry, &source_name, now))
            .buffered(self.opts.resolve_concurrency.max(1))
            .collect()
            .await;

        Ok(NewsPayload {
            items,
            fetched: self.clock.now(),
        })
    }

    async fn enrich(
        &self,
        entry: FeedEntry,
        source_name: &str,
        now: DateTime<Utc>,
    ) -> EnrichedArticle {
        let article = article_from_entry(&entry, source_name, now);
        let location = self.resolver.resolve(&article.title, &article.summary).await;
        EnrichedArticle::new(article, location)
    }
}
