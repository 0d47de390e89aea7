//! # Response Cache
//!
//! TTL cache for rendered report pages, keyed by requester and
//! normalized query. Only JSON page envelopes are stored; export
//! downloads bypass the cache entirely.
//!
//! ## Configuration
//!
//! Caching is configured via environment variable:
//! - `VANTAGE_CACHE_TTL`: Seconds an entry stays fresh (default: 600,
//!   0 disables caching by expiring every entry immediately)

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use vantage_core::PageEnvelope;

/// Default entry lifetime: ten minutes.
const DEFAULT_TTL: Duration = Duration::from_secs(600);

/// Read the cache TTL from `VANTAGE_CACHE_TTL` (seconds).
pub fn cache_ttl_from_env() -> Duration {
    std::env::var("VANTAGE_CACHE_TTL")
        .ok()
        .and_then(|s| s.parse().ok())
        .map_or(DEFAULT_TTL, Duration::from_secs)
}

// =============================================================================
// CACHE
// =============================================================================

struct CacheEntry {
    inserted: Instant,
    payload: PageEnvelope,
}

/// Thread-safe TTL cache of rendered report pages.
pub struct ResponseCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Fetch a fresh entry, evicting it if it has expired.
    pub fn get(&self, key: &str) -> Option<PageEnvelope> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(entry) = entries.get(key) {
            if entry.inserted.elapsed() < self.ttl {
                return Some(entry.payload.clone());
            }
        }
        entries.remove(key);
        None
    }

    /// Store a page, sweeping out expired entries first so the map
    /// never grows past the working set of live queries.
    pub fn insert(&self, key: String, payload: PageEnvelope) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.retain(|_, entry| entry.inserted.elapsed() < self.ttl);
        entries.insert(
            key,
            CacheEntry {
                inserted: Instant::now(),
                payload,
            },
        );
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn page(count: u64) -> PageEnvelope {
        PageEnvelope {
            count,
            next: None,
            previous: None,
            results: Vec::new(),
        }
    }

    #[test]
    fn test_fresh_entry_round_trips() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        cache.insert("1|page=1".to_string(), page(7));

        let hit = cache.get("1|page=1");
        assert_eq!(hit.map(|p| p.count), Some(7));
    }

    #[test]
    fn test_zero_ttl_expires_immediately() {
        let cache = ResponseCache::new(Duration::ZERO);
        cache.insert("1|page=1".to_string(), page(7));

        assert!(cache.get("1|page=1").is_none());
    }

    #[test]
    fn test_distinct_keys_do_not_collide() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        cache.insert("1|page=1".to_string(), page(1));
        cache.insert("2|page=1".to_string(), page(2));

        assert_eq!(cache.get("1|page=1").map(|p| p.count), Some(1));
        assert_eq!(cache.get("2|page=1").map(|p| p.count), Some(2));
    }
}
