use anyhow::{Context, Result};
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder (once per process) and publish the cache TTL.
    pub fn init(cache_ttl_secs: u64) -> Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;

        describe_counter!("news_cache_hits_total", "News requests served from the cache slot.");
        describe_counter!("news_cache_misses_total", "News requests that refreshed the payload.");
        describe_counter!("news_feed_errors_total", "Feed fetch/parse failures.");
        describe_counter!("geocode_requests_total", "Outbound geocode lookups.");
        describe_counter!("geocode_failures_total", "Geocode lookups that errored (absorbed).");
        describe_counter!(
            "resolver_stage_hits_total",
            "Articles located, by cascade stage (country/title/summary)."
        );
        describe_counter!("resolver_unresolved_total", "Articles left without a location.");
        describe_histogram!("news_refresh_ms", "Full payload refresh time in milliseconds.");
        describe_histogram!("feed_parse_ms", "Feed XML parse time in milliseconds.");
        describe_gauge!("news_cache_ttl_secs", "Configured payload cache TTL.");

        gauge!("news_cache_ttl_secs").set(cache_ttl_secs as f64);

        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
