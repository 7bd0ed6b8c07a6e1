//! Geocode client: free-text place name -> coordinate, via a Nominatim-style
//! search endpoint. Every failure collapses into `None`.

use async_trait::async_trait;
use metrics::counter;
use reqwest::Client;
use serde::Deserialize;

/// One geocoder candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoMatch {
    pub lat: f64,
    pub lng: f64,
    pub display_name: String,
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Best single match for `query`, or `None` (empty query, transport error,
    /// non-2xx, empty result set, unparsable body).
    async fn lookup(&self, query: &str) -> Option<GeoMatch>;

    fn name(&self) -> &'static str;
}

pub struct NominatimClient {
    http: Client,
    search_url: String,
    language: String,
}

impl NominatimClient {
    /// `http` is expected to carry the identifying User-Agent and timeouts
    /// (see `config::build_http_client`).
    pub fn new(http: Client, search_url: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            http,
            search_url: search_url.into(),
            language: language.into(),
        }
    }

    async fn fetch_first(&self, query: &str) -> Result<Option<GeoMatch>, reqwest::Error> {
        let resp = self
            .http
            .get(&self.search_url)
            .query(&[
                ("format", "json"),
                ("q", query),
                ("limit", "1"),
                ("accept-language", self.language.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?;

        let candidates: Vec<Candidate> = resp.json().await?;
        Ok(candidates.into_iter().next().and_then(Candidate::into_match))
    }
}

#[async_trait]
impl Geocoder for NominatimClient {
    async fn lookup(&self, query: &str) -> Option<GeoMatch> {
        if query.trim().is_empty() {
            return None;
        }
        counter!("geocode_requests_total").increment(1);

        match self.fetch_first(query).await {
            Ok(Some(hit)) => Some(hit),
            Ok(None) => {
                tracing::debug!(query = %query, "geocode: no candidates");
                None
            }
            Err(e) => {
                tracing::warn!(error = ?e, query = %query, "geocode fail");
                counter!("geocode_failures_total").increment(1);
                None
            }
        }
    }

    fn name(&self) -> &'static str {
        "nominatim"
    }
}

/// Nominatim reports coordinates as strings; accept plain numbers too.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Coord {
    Num(f64),
    Text(String),
}

impl Coord {
    fn to_f64(&self) -> Option<f64> {
        let v = match self {
            Coord::Num(n) => Some(*n),
            Coord::Text(s) => s.trim().parse::<f64>().ok(),
        };
        v.filter(|v| v.is_finite())
    }
}

#[derive(Debug, Deserialize)]
struct Candidate {
    lat: Coord,
    lon: Coord,
    #[serde(default)]
    display_name: String,
}

impl Candidate {
    fn into_match(self) -> Option<GeoMatch> {
        Some(GeoMatch {
            lat: self.lat.to_f64()?,
            lng: self.lon.to_f64()?,
            display_name: self.display_name,
        })
    }
}
