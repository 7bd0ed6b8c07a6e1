//! Resolve one headline (and optional summary) against the configured geocoder.
//!
//! Usage: `cargo run --bin geocode_probe -- "Kenya opens new wildlife corridor" ["summary"]`

use std::sync::Arc;

use goodnews_geo::geocode::NominatimClient;
use goodnews_geo::resolver::LocationResolver;
use goodnews_geo::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_target(false).init();

    let mut args = std::env::args().skip(1);
    let Some(title) = args.next() else {
        anyhow::bail!("usage: geocode_probe <title> [summary]");
    };
    let summary = args.next().unwrap_or_default();

    let cfg = AppConfig::load_default()?;
    let geocoder = NominatimClient::new(
        cfg.build_http_client()?,
        cfg.geocode_url.clone(),
        cfg.language.clone(),
    );
    let resolver = LocationResolver::new(Arc::new(geocoder));

    let loc = resolver.resolve(&title, &summary).await;
    let out = serde_json::json!({
        "title": title,
        "country": loc.country,
        "lat": loc.point.map(|p| p.lat),
        "lng": loc.point.map(|p| p.lng),
        "place_name": loc.place_name,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
