#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use goodnews_geo::clock::ManualClock;
use goodnews_geo::geocode::{GeoMatch, Geocoder};
use goodnews_geo::ingest::providers::rss::parse_feed;
use goodnews_geo::ingest::types::{Feed, FeedError, FeedSource};
use goodnews_geo::pipeline::{NewsPipeline, PipelineOptions};
use goodnews_geo::resolver::LocationResolver;

pub const FEED_20: &str = include_str!("../fixtures/feed_20.xml");

/// Feed that serves a fixture until told to fail; counts fetches.
pub struct SwitchableFeed {
    xml: String,
    failing: Mutex<bool>,
    pub fetches: AtomicUsize,
}

impl SwitchableFeed {
    pub fn new(xml: &str) -> Self {
        Self {
            xml: xml.to_string(),
            failing: Mutex::new(false),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn set_failing(&self, on: bool) {
        *self.failing.lock().unwrap() = on;
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeedSource for SwitchableFeed {
    async fn fetch(&self) -> Result<Feed, FeedError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if *self.failing.lock().unwrap() {
            return Err(FeedError::Status(reqwest::StatusCode::SERVICE_UNAVAILABLE));
        }
        parse_feed(&self.xml)
    }
    fn name(&self) -> &'static str {
        "switchable"
    }
}

/// Geocoder with canned answers and optional per-query delays; records calls.
#[derive(Default)]
pub struct FakeGeocoder {
    answers: HashMap<String, GeoMatch>,
    delays: HashMap<String, Duration>,
    calls: Mutex<Vec<String>>,
}

impl FakeGeocoder {
    pub fn with_answer(mut self, query: &str, lat: f64, lng: f64) -> Self {
        self.answers.insert(
            query.to_string(),
            GeoMatch {
                lat,
                lng,
                display_name: format!("{query}, Earth"),
            },
        );
        self
    }

    pub fn with_delay(mut self, query: &str, delay: Duration) -> Self {
        self.delays.insert(query.to_string(), delay);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Geocoder for FakeGeocoder {
    async fn lookup(&self, query: &str) -> Option<GeoMatch> {
        if query.trim().is_empty() {
            return None;
        }
        self.calls.lock().unwrap().push(query.to_string());
        if let Some(d) = self.delays.get(query) {
            tokio::time::sleep(*d).await;
        }
        self.answers.get(query).cloned()
    }
    fn name(&self) -> &'static str {
        "fake"
    }
}

pub fn start_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2025, 9, 6, 9, 0, 0).unwrap(),
    ))
}

pub fn pipeline(
    feed: Arc<SwitchableFeed>,
    geo: Arc<FakeGeocoder>,
    clock: Arc<ManualClock>,
    opts: PipelineOptions,
) -> NewsPipeline {
    NewsPipeline::new(feed, LocationResolver::new(geo), clock, opts)
}
