// src/ingest/types.rs
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Syndication format an entry came from; decides which body field leads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FeedKind {
    #[default]
    Rss,
    Atom,
}

/// One parsed feed entry, before markup stripping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedEntry {
    pub kind: FeedKind,
    pub title: Option<String>,
    pub link: Option<String>,
    /// `content:encoded` (RSS) or `content` (Atom); usually HTML.
    pub content: Option<String>,
    /// `description` (RSS) or `summary` (Atom).
    pub description: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

/// A whole feed document: channel title + entries in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Feed {
    pub title: Option<String>,
    pub entries: Vec<FeedEntry>,
}

/// Immutable article built from one feed entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    pub title: String,
    /// Markup stripped, trimmed. Uncapped; output capping happens at assembly.
    pub summary: String,
    pub link: String,
    pub published_at: DateTime<Utc>,
    pub source_name: String,
}

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("feed request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("feed responded with HTTP {0}")]
    Status(reqwest::StatusCode),

    #[error("feed is not a valid RSS or Atom document: {0}")]
    Parse(String),
}

#[async_trait::async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self) -> Result<Feed, FeedError>;
    fn name(&self) -> &'static str;
}
