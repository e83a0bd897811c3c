//! Endpoint-scoped caches (spec §4.7): a snapshot cache for resources
//! submitted alongside a request, and an LRU of terminology expansions.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use lru::LruCache;
use serde_json::Value;

const RESOURCE_CACHE_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);
const RESOURCE_CACHE_DEFAULT_TIMEOUT: Duration = Duration::from_secs(30 * 60);

struct ResourceCacheEntry {
    resources: Vec<Value>,
    last_used: Instant,
}

/// Maps a client-supplied cache id to the extra resources (`ValueSet`
/// supplements, inline `CodeSystem`s, etc) it submitted with a prior
/// request, so a follow-up request can reference them by id instead of
/// resending the full payload.
pub struct ResourceCache {
    timeout: Duration,
    entries: Mutex<HashMap<String, ResourceCacheEntry>>,
}

impl ResourceCache {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_default_timeout() -> Self {
        Self::new(RESOURCE_CACHE_DEFAULT_TIMEOUT)
    }

    pub fn put(&self, cache_id: impl Into<String>, resources: Vec<Value>) {
        let mut entries = self.entries.lock().expect("resource cache poisoned");
        entries.insert(
            cache_id.into(),
            ResourceCacheEntry {
                resources,
                last_used: Instant::now(),
            },
        );
    }

    pub fn get(&self, cache_id: &str) -> Option<Vec<Value>> {
        let mut entries = self.entries.lock().expect("resource cache poisoned");
        let entry = entries.get_mut(cache_id)?;
        entry.last_used = Instant::now();
        Some(entry.resources.clone())
    }

    /// Evict entries whose `last_used` predates `timeout`. Intended to
    /// be called on a 5-minute tick (spec §4.7); exposed directly so
    /// callers can drive the tick with whatever scheduler the binary
    /// uses (`tokio::time::interval` in the server).
    pub fn sweep(&self) -> usize {
        let mut entries = self.entries.lock().expect("resource cache poisoned");
        let before = entries.len();
        let timeout = self.timeout;
        entries.retain(|_, e| e.last_used.elapsed() < timeout);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("resource cache poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub fn sweep_interval() -> Duration {
    RESOURCE_CACHE_SWEEP_INTERVAL
}

struct ExpansionEntry {
    value: Value,
    approx_bytes: usize,
}

/// LRU keyed by `canonical_url + expansion fingerprint`, with an
/// optional resident-memory ceiling in megabytes. The entry-count bound
/// and the memory bound are both enforced; whichever is tighter wins.
pub struct ExpansionCache {
    inner: Mutex<LruCache<String, ExpansionEntry>>,
    memory_threshold_bytes: Option<usize>,
}

impl ExpansionCache {
    pub fn new(capacity: usize, memory_threshold_mb: Option<usize>) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).expect("capacity must be nonzero");
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
            memory_threshold_bytes: memory_threshold_mb.map(|mb| mb * 1024 * 1024),
        }
    }

    /// `canonical` is the value set (or code system) URL; `fingerprint`
    /// hashes the expansion parameters (filter, includeDesignations,
    /// paging offset/count, ...) so distinct expansions of the same
    /// canonical URL don't collide.
    pub fn key(canonical: &str, fingerprint: &str) -> String {
        format!("{canonical}#{fingerprint}")
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        let mut inner = self.inner.lock().expect("expansion cache poisoned");
        inner.get(key).map(|e| e.value.clone())
    }

    pub fn put(&self, key: String, value: Value) {
        let approx_bytes = value.to_string().len();
        let mut inner = self.inner.lock().expect("expansion cache poisoned");
        inner.put(key, ExpansionEntry { value, approx_bytes });
        self.enforce_memory_threshold(&mut inner);
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("expansion cache poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn resident_bytes(inner: &LruCache<String, ExpansionEntry>) -> usize {
        inner.iter().map(|(_, e)| e.approx_bytes).sum()
    }

    /// When the resident estimate crosses the configured threshold,
    /// evict the oldest half of entries in one sweep (spec §4.7).
    /// Called on every `put`, and again on the shared 5-minute tick so
    /// a quiet cache still sheds memory after a burst of large
    /// expansions.
    pub fn enforce_memory_threshold_tick(&self) {
        let mut inner = self.inner.lock().expect("expansion cache poisoned");
        self.enforce_memory_threshold(&mut inner);
    }

    fn enforce_memory_threshold(&self, inner: &mut LruCache<String, ExpansionEntry>) {
        let Some(threshold) = self.memory_threshold_bytes else {
            return;
        };
        if Self::resident_bytes(inner) <= threshold {
            return;
        }
        let evict_count = inner.len() / 2;
        for _ in 0..evict_count {
            if inner.pop_lru().is_none() {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resource_cache_round_trips() {
        let cache = ResourceCache::new(Duration::from_secs(60));
        cache.put("abc", vec![json!({"resourceType": "ValueSet"})]);
        assert_eq!(cache.get("abc").unwrap().len(), 1);
        assert!(cache.get("missing").is_none());
    }

    #[test]
    fn resource_cache_sweep_evicts_stale_entries() {
        let cache = ResourceCache::new(Duration::from_millis(1));
        cache.put("abc", vec![json!({})]);
        std::thread::sleep(Duration::from_millis(10));
        assert_eq!(cache.sweep(), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn expansion_cache_evicts_by_capacity() {
        let cache = ExpansionCache::new(1, None);
        cache.put("a".into(), json!({"n": 1}));
        cache.put("b".into(), json!({"n": 2}));
        assert_eq!(cache.len(), 1);
        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_some());
    }

    #[test]
    fn expansion_cache_evicts_oldest_half_over_memory_threshold() {
        let cache = ExpansionCache::new(100, Some(0));
        cache.put("a".into(), json!({"n": 1}));
        cache.put("b".into(), json!({"n": 2}));
        cache.put("c".into(), json!({"n": 3}));
        cache.enforce_memory_threshold_tick();
        assert!(cache.len() < 3);
    }
}
