// src/ingest/mod.rs
pub mod providers;
pub mod types;

use chrono::{DateTime, Utc};
use once_cell::sync::OnceCell;
use regex::Regex;

use crate::ingest::types::{Article, FeedEntry, FeedKind};

/// Strip markup tags, decode HTML entities, trim.
///
/// Unterminated tags at the end of the text (`"foo <a href"`) are dropped too.
pub fn strip_markup(s: &str) -> String {
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"</?[^>]+(>|$)").expect("valid tag regex"));
    let stripped = re_tags.replace_all(s, "");
    html_escape::decode_html_entities(&stripped).trim().to_string()
}

/// First `max` chars of `s` (char-boundary safe).
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// Best-available body text. Empty fields are skipped.
///
/// RSS leads with `description` (the teaser); `content:encoded` is the full
/// article and only used when the teaser is missing. Atom leads with `content`.
fn best_text(entry: &FeedEntry) -> &str {
    let (first, second) = match entry.kind {
        FeedKind::Rss => (&entry.description, &entry.content),
        FeedKind::Atom => (&entry.content, &entry.description),
    };
    [first.as_deref(), second.as_deref()]
        .into_iter()
        .flatten()
        .find(|s| !s.trim().is_empty())
        .unwrap_or_default()
}

/// Build the immutable `Article` for one entry. Missing dates fall back to `now`.
pub fn article_from_entry(entry: &FeedEntry, source_name: &str, now: DateTime<Utc>) -> Article {
    Article {
        title: entry.title.as_deref().map(str::trim).unwrap_or_default().to_string(),
        summary: strip_markup(best_text(entry)),
        link: entry.link.as_deref().map(str::trim).unwrap_or_default().to_string(),
        published_at: entry.published_at.unwrap_or(now),
        source_name: source_name.to_string(),
    }
}
