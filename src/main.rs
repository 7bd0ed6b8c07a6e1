//! Good-news map service: Binary Entrypoint
//! Boots the Axum HTTP server: config, tracing, pipeline, optional `/metrics`.

use goodnews_geo::{metrics::Metrics, AppConfig};
use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Compact logs by default, JSON when `LOG_FORMAT=json`.
/// A no-op if the runtime already installed a subscriber.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("goodnews_geo=info,warn"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let res = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .try_init()
    };
    if res.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    init_tracing();

    let cfg = AppConfig::load_default()?;
    let mut router = goodnews_geo::app(&cfg)?;

    if std::env::var("METRICS_ENABLED").is_ok_and(|v| v == "1") {
        let metrics = Metrics::init(cfg.cache_ttl_secs)?;
        router = router.merge(metrics.router());
    }

    Ok(router.into())
}
