//! # Freshness Cache
//! Single-slot, TTL-bounded memo of the last assembled news payload.
//!
//! `put` always overwrites the one slot; `get` ignores entries that are
//! older than the TTL (or stamped in the future) without evicting them.
//! Both take the same lock, so a reader never observes a half-written entry.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration as ChronoDuration, Utc};

use crate::clock::Clock;
use crate::pipeline::NewsPayload;

/// Default TTL: 10 minutes.
pub const DEFAULT_TTL_SECS: u64 = 600;

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub captured_at: DateTime<Utc>,
    pub payload: Arc<NewsPayload>,
}

/// Whether a response came from the cache slot or a fresh refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    pub fn as_header_value(self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
        }
    }
}

pub struct FreshnessCache {
    ttl: ChronoDuration,
    clock: Arc<dyn Clock>,
    slot: Mutex<Option<CacheEntry>>,
}

impl FreshnessCache {
    pub fn new(ttl_secs: u64, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl: ChronoDuration::seconds(ttl_secs.min(u32::MAX as u64) as i64),
            clock,
            slot: Mutex::new(None),
        }
    }

    pub fn ttl_secs(&self) -> u64 {
        self.ttl.num_seconds().max(0) as u64
    }

    /// Stored payload if `0 <= now - captured_at < ttl`, else `None`.
    pub fn get(&self) -> Option<Arc<NewsPayload>> {
        let now = self.clock.now();
        let slot = self.slot.lock().unwrap_or_else(|p| p.into_inner());
        let entry = slot.as_ref()?;
        let age = now.signed_duration_since(entry.captured_at);
        if age >= ChronoDuration::zero() && age < self.ttl {
            Some(Arc::clone(&entry.payload))
        } else {
            None
        }
    }

    /// Replace the slot with `{captured_at: now, payload}`.
    pub fn put(&self, payload: Arc<NewsPayload>) {
        let entry = CacheEntry {
            captured_at: self.clock.now(),
            payload,
        };
        *self.slot.lock().unwrap_or_else(|p| p.into_inner()) = Some(entry);
    }

    /// Raw slot contents, stale or not.
    pub fn peek(&self) -> Option<CacheEntry> {
        self.slot.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}
