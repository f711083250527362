//! TTL + LRU cache for ranked retrieval results.
//!
//! Keys are derived from the normalized (query, limit, filters) triple.
//! Expired entries are purged lazily on access, never swept proactively.
//! The cache is constructed once at process start and shared by handle;
//! it does not survive a restart.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use sha2::{Digest, Sha256};

use crate::domain::models::{SearchFilters, SearchResult};

/// Counters exposed by [`RetrievalCache::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub total_requests: u64,
}

impl CacheStats {
    /// Fraction of lookups that hit, 0.0 when nothing was requested.
    pub fn hit_rate(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.hits as f64 / self.total_requests as f64
        }
    }
}

struct CacheEntry {
    results: Vec<SearchResult>,
    /// Serialized result metadata, kept for substring invalidation.
    metadata_blob: String,
    inserted_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        self.inserted_at.elapsed() >= self.ttl
    }
}

struct CacheInner {
    entries: HashMap<String, CacheEntry>,
    /// Keys ordered least- to most-recently used.
    recency: VecDeque<String>,
    stats: CacheStats,
}

impl CacheInner {
    /// Move `key` to the most-recently-used position.
    fn promote(&mut self, key: &str) {
        self.recency.retain(|k| k != key);
        self.recency.push_back(key.to_string());
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
        self.recency.retain(|k| k != key);
    }
}

/// Process-wide retrieval result cache with TTL expiry and LRU eviction.
///
/// Size never exceeds the configured capacity, and a returned entry is
/// always within its TTL (expired entries are deleted before being
/// served). There is no single-flight deduplication: two logically
/// concurrent miss-then-store sequences for one key both call upstream.
pub struct RetrievalCache {
    capacity: usize,
    default_ttl: Duration,
    inner: Mutex<CacheInner>,
}

impl RetrievalCache {
    /// Create a cache holding at most `capacity` entries.
    ///
    /// A zero capacity is clamped to 1 so `set` always has room.
    pub fn new(capacity: usize, default_ttl: Duration) -> Self {
        Self {
            capacity: capacity.max(1),
            default_ttl,
            inner: Mutex::new(CacheInner {
                entries: HashMap::new(),
                recency: VecDeque::new(),
                stats: CacheStats::default(),
            }),
        }
    }

    /// Cache key: sha256 of the sorted-key JSON serialization of the
    /// normalized (trimmed, lowercased) query, the limit, and the
    /// filters.
    pub fn key(query: &str, limit: usize, filters: Option<&SearchFilters>) -> String {
        let normalized = query.trim().to_lowercase();
        // SearchFilters is a BTreeMap, so serialization order is stable.
        let serialized = serde_json::json!({
            "query": normalized,
            "limit": limit,
            "filters": filters,
        })
        .to_string();

        use std::fmt::Write as _;

        let digest = Sha256::digest(serialized.as_bytes());
        let mut key = String::with_capacity(digest.len() * 2);
        for byte in digest {
            // Writing into a String cannot fail.
            let _ = write!(key, "{byte:02x}");
        }
        key
    }

    /// Look up cached results. Counts a hit or a miss, purges the entry
    /// if its TTL elapsed, and promotes hits to most-recently-used.
    pub fn get(
        &self,
        query: &str,
        limit: usize,
        filters: Option<&SearchFilters>,
    ) -> Option<Vec<SearchResult>> {
        enum Lookup {
            Miss,
            Expired,
            Hit(Vec<SearchResult>),
        }

        let key = Self::key(query, limit, filters);
        let mut inner = self.lock();
        inner.stats.total_requests += 1;

        let lookup = match inner.entries.get(&key) {
            None => Lookup::Miss,
            Some(entry) if entry.is_expired() => Lookup::Expired,
            Some(entry) => Lookup::Hit(entry.results.clone()),
        };

        match lookup {
            Lookup::Hit(results) => {
                inner.promote(&key);
                inner.stats.hits += 1;
                Some(results)
            }
            Lookup::Expired => {
                inner.remove(&key);
                inner.stats.misses += 1;
                tracing::trace!(key = %key, "cache entry expired");
                None
            }
            Lookup::Miss => {
                inner.stats.misses += 1;
                None
            }
        }
    }

    /// Store results under the normalized key, evicting the
    /// least-recently-used entry first when at capacity.
    pub fn set(
        &self,
        query: &str,
        limit: usize,
        filters: Option<&SearchFilters>,
        results: Vec<SearchResult>,
        ttl: Option<Duration>,
    ) {
        let key = Self::key(query, limit, filters);
        let metadata_blob = results
            .iter()
            .map(|r| r.metadata.to_string())
            .collect::<Vec<_>>()
            .join("\n");

        let entry = CacheEntry {
            results,
            metadata_blob,
            inserted_at: Instant::now(),
            ttl: ttl.unwrap_or(self.default_ttl),
        };

        let mut inner = self.lock();
        if !inner.entries.contains_key(&key) && inner.entries.len() >= self.capacity {
            if let Some(lru) = inner.recency.pop_front() {
                inner.entries.remove(&lru);
                inner.stats.evictions += 1;
                tracing::debug!(evicted = %lru, "cache at capacity, evicted LRU entry");
            }
        }
        inner.entries.insert(key.clone(), entry);
        inner.promote(&key);
    }

    /// Remove every entry whose cached result metadata contains
    /// `pattern`. Linear in entries times metadata size, which is fine at
    /// the hundreds-to-low-thousands sizes this cache runs at.
    ///
    /// Returns the number of entries removed.
    pub fn invalidate_pattern(&self, pattern: &str) -> usize {
        let mut inner = self.lock();
        let doomed: Vec<String> = inner
            .entries
            .iter()
            .filter(|(_, entry)| entry.metadata_blob.contains(pattern))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &doomed {
            inner.remove(key);
        }
        if !doomed.is_empty() {
            tracing::debug!(pattern = %pattern, removed = doomed.len(), "invalidated cache entries");
        }
        doomed.len()
    }

    /// Current hit/miss/eviction counters.
    pub fn stats(&self) -> CacheStats {
        self.lock().stats
    }

    /// Number of live entries (expired-but-unpurged entries included).
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CacheInner> {
        // A poisoned lock means a panic mid-mutation; the counters may be
        // stale but the map itself is still structurally sound.
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn result(id: &str, score: f32) -> SearchResult {
        SearchResult::semantic(
            id.to_string(),
            format!("content of {id}"),
            score,
            json!({"document_type": "access_review", "company": "Acme"}),
        )
    }

    fn cache(capacity: usize) -> RetrievalCache {
        RetrievalCache::new(capacity, Duration::from_secs(60))
    }

    #[test]
    fn test_set_then_get_round_trips() {
        let cache = cache(10);
        cache.set("What controls exist?", 5, None, vec![result("a", 0.9)], None);

        let hit = cache.get("What controls exist?", 5, None).unwrap();
        assert_eq!(hit.len(), 1);
        assert_eq!(hit[0].document_id, "a");
    }

    #[test]
    fn test_key_normalizes_query() {
        let cache = cache(10);
        cache.set("  ACCESS Review  ", 5, None, vec![result("a", 0.9)], None);
        assert!(cache.get("access review", 5, None).is_some());
    }

    #[test]
    fn test_different_limit_is_different_key() {
        let cache = cache(10);
        cache.set("q", 5, None, vec![result("a", 0.9)], None);
        assert!(cache.get("q", 3, None).is_none());
    }

    #[test]
    fn test_expired_entry_misses_and_is_purged() {
        let cache = cache(10);
        cache.set("q", 5, None, vec![result("a", 0.9)], Some(Duration::ZERO));

        assert!(cache.get("q", 5, None).is_none());
        assert_eq!(cache.len(), 0);

        let stats = cache.stats();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_lru_eviction_removes_least_recently_used() {
        let cache = cache(3);
        cache.set("q1", 5, None, vec![result("a", 0.9)], None);
        cache.set("q2", 5, None, vec![result("b", 0.8)], None);
        cache.set("q3", 5, None, vec![result("c", 0.7)], None);

        // Touch q1 so q2 becomes the LRU entry.
        assert!(cache.get("q1", 5, None).is_some());

        cache.set("q4", 5, None, vec![result("d", 0.6)], None);

        assert_eq!(cache.len(), 3);
        assert!(cache.get("q2", 5, None).is_none());
        assert!(cache.get("q1", 5, None).is_some());
        assert!(cache.get("q4", 5, None).is_some());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_overwrite_same_key_does_not_evict() {
        let cache = cache(2);
        cache.set("q1", 5, None, vec![result("a", 0.9)], None);
        cache.set("q2", 5, None, vec![result("b", 0.8)], None);
        cache.set("q1", 5, None, vec![result("a2", 0.95)], None);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.stats().evictions, 0);
        assert_eq!(cache.get("q1", 5, None).unwrap()[0].document_id, "a2");
    }

    #[test]
    fn test_invalidate_pattern_removes_matching_entries() {
        let cache = cache(10);
        cache.set("q1", 5, None, vec![result("a", 0.9)], None);
        let other = SearchResult::semantic(
            "b".to_string(),
            "other".to_string(),
            0.5,
            json!({"company": "Globex"}),
        );
        cache.set("q2", 5, None, vec![other], None);

        let removed = cache.invalidate_pattern("Acme");
        assert_eq!(removed, 1);
        assert!(cache.get("q1", 5, None).is_none());
        assert!(cache.get("q2", 5, None).is_some());
    }

    #[test]
    fn test_hit_rate() {
        let cache = cache(10);
        cache.set("q", 5, None, vec![result("a", 0.9)], None);
        let _ = cache.get("q", 5, None);
        let _ = cache.get("missing", 5, None);

        let stats = cache.stats();
        assert_eq!(stats.total_requests, 2);
        assert!((stats.hit_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_filters_participate_in_key() {
        let cache = cache(10);
        let mut filters = SearchFilters::new();
        filters.insert("frameworks".to_string(), json!(["SOX"]));

        cache.set("q", 5, Some(&filters), vec![result("a", 0.9)], None);
        assert!(cache.get("q", 5, None).is_none());
        assert!(cache.get("q", 5, Some(&filters)).is_some());
    }
}
