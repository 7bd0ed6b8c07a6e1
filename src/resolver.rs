//! # Location Resolver
//! Turns an article's title + summary into a best-effort location.
//!
//! Stages run in order and the first one that yields coordinates wins:
//! 1. country heuristic: first listed country found in title or summary,
//!    geocoded by its name (only that one country is ever tried),
//! 2. the raw title,
//! 3. the first 200 chars of a short (< 300 chars) summary.

use std::sync::Arc;

use metrics::counter;
use serde::{Deserialize, Serialize};

use crate::geocode::{GeoMatch, Geocoder};

/// Countries checked by the heuristic, in priority order.
pub const COUNTRIES: &[&str] = &[
    "Spain",
    "United Kingdom",
    "India",
    "Kenya",
    "Brazil",
    "Japan",
    "United States",
    "USA",
    "Mexico",
    "Canada",
    "Australia",
    "Nigeria",
    "France",
    "Germany",
    "Italy",
    "Chile",
    "Peru",
    "Colombia",
];

/// Summaries at or above this many chars are too noisy to geocode.
pub const SUMMARY_QUERY_MAX_LEN: usize = 300;
/// Summary prefix used as the geocode query.
pub const SUMMARY_QUERY_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// Coordinates are a single `Option`, so lat/lng are always both set or both absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedLocation {
    pub point: Option<GeoPoint>,
    /// Set only when the country heuristic produced the coordinates.
    pub country: Option<String>,
    pub place_name: Option<String>,
}

impl ResolvedLocation {
    pub fn unresolved() -> Self {
        Self::default()
    }

    pub fn is_resolved(&self) -> bool {
        self.point.is_some()
    }

    fn from_match(m: GeoMatch, country: Option<&str>) -> Self {
        Self {
            point: Some(GeoPoint {
                lat: m.lat,
                lng: m.lng,
            }),
            country: country.map(str::to_string),
            place_name: Some(m.display_name),
        }
    }
}

/// Which cascade stage produced a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Country,
    Title,
    Summary,
}

impl Stage {
    fn label(self) -> &'static str {
        match self {
            Stage::Country => "country",
            Stage::Title => "title",
            Stage::Summary => "summary",
        }
    }
}

#[derive(Clone)]
pub struct LocationResolver {
    geocoder: Arc<dyn Geocoder>,
}

impl LocationResolver {
    pub fn new(geocoder: Arc<dyn Geocoder>) -> Self {
        Self { geocoder }
    }

    pub async fn resolve(&self, title: &str, summary: &str) -> ResolvedLocation {
        // 1) Country heuristic: only the first textual match is tried.
        if let Some(country) = detect_country(title, summary) {
            if let Some(m) = self.geocoder.lookup(country).await {
                return hit(Stage::Country, ResolvedLocation::from_match(m, Some(country)));
            }
            tracing::debug!(country, "country matched but geocode failed");
        }

        // 2) Raw title.
        if let Some(m) = self.geocoder.lookup(title).await {
            return hit(Stage::Title, ResolvedLocation::from_match(m, None));
        }

        // 3) Short summary prefix.
        if let Some(query) = summary_query(summary) {
            if let Some(m) = self.geocoder.lookup(&query).await {
                return hit(Stage::Summary, ResolvedLocation::from_match(m, None));
            }
        }

        counter!("resolver_unresolved_total").increment(1);
        tracing::debug!(geocoder = self.geocoder.name(), title, "no location resolved");
        ResolvedLocation::unresolved()
    }
}

fn hit(stage: Stage, loc: ResolvedLocation) -> ResolvedLocation {
    counter!("resolver_stage_hits_total", "stage" => stage.label()).increment(1);
    loc
}

/// First entry of `COUNTRIES` (list order, not text order) that occurs
/// case-insensitively in the title or the summary.
pub fn detect_country(title: &str, summary: &str) -> Option<&'static str> {
    let title = title.to_lowercase();
    let summary = summary.to_lowercase();
    COUNTRIES.iter().copied().find(|c| {
        let needle = c.to_lowercase();
        title.contains(&needle) || summary.contains(&needle)
    })
}

/// Query for the summary stage, if the summary qualifies.
pub fn summary_query(summary: &str) -> Option<String> {
    if summary.is_empty() || summary.chars().count() >= SUMMARY_QUERY_MAX_LEN {
        return None;
    }
    Some(summary.chars().take(SUMMARY_QUERY_CHARS).collect())
}
