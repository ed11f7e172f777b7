//! Response cache over a [`KeyValueStore`].
//!
//! Entries are stored as JSON `{"data": ..., "timestamp": <unix ms>}` under
//! keys of the form `prefix + endpoint + "_" + JSON(sorted params)`. Expiry is
//! enforced lazily when an entry is read; nothing sweeps the store in the
//! background. Storage failures are logged and swallowed so a broken store
//! behaves like an empty one.

use crate::storage::KeyValueStore;
use aiden_core::{
    CacheConfig, CacheEntry, CacheMetrics, CacheSettings, DEFAULT_CACHE_DURATION,
    DEFAULT_CACHE_PREFIX,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Source of the current time in Unix milliseconds.
pub trait Clock: Send + Sync + Debug {
    fn now_millis(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start_millis: i64) -> Self {
        Self {
            now: AtomicI64::new(start_millis),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now.fetch_add(by.as_millis() as i64, Ordering::SeqCst);
    }

    pub fn set(&self, millis: i64) {
        self.now.store(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Builds a cache key. Parameters are sorted by name before serialization,
/// so the order they are supplied in never changes the key.
pub fn cache_key<I, K, V>(prefix: &str, base_key: &str, params: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    let sorted: BTreeMap<String, Value> = params
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect();
    let serialized = serde_json::to_string(&sorted).unwrap_or_default();
    format!("{}{}_{}", prefix, base_key, serialized)
}

#[derive(Deserialize)]
struct EntryTimestamp {
    timestamp: i64,
}

#[derive(Debug, Clone)]
pub struct CacheClient {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    prefix: String,
    default_duration: Duration,
}

impl CacheClient {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            prefix: DEFAULT_CACHE_PREFIX.to_string(),
            default_duration: DEFAULT_CACHE_DURATION,
        }
    }

    pub fn from_settings(store: Arc<dyn KeyValueStore>, settings: &CacheSettings) -> Self {
        Self::new(store)
            .with_prefix(settings.prefix.clone())
            .with_default_duration(settings.duration())
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_default_duration(mut self, duration: Duration) -> Self {
        self.default_duration = duration;
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn default_duration(&self) -> Duration {
        self.default_duration
    }

    pub fn cache_key<I, K, V>(&self, base_key: &str, params: I) -> String
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        cache_key(&self.prefix, base_key, params)
    }

    /// Stores `data` stamped with the current time. Failures are logged only.
    pub fn set<T: Serialize>(&self, key: &str, data: &T) {
        let entry = CacheEntry {
            data,
            timestamp: self.clock.now_millis(),
        };

        let serialized = match serde_json::to_string(&entry) {
            Ok(serialized) => serialized,
            Err(e) => {
                warn!("Failed to serialize cache entry {}: {}", key, e);
                return;
            }
        };

        match self.store.set_item(key, &serialized) {
            Ok(()) => debug!("Cached {} ({} bytes)", key, serialized.len()),
            Err(e) => warn!("Failed to write cache entry {}: {}", key, e),
        }
    }

    /// Returns the cached value when present and fresh. Forced refreshes and
    /// stale entries are removed from the store and reported as misses, as
    /// are unreadable entries.
    pub fn get<T: DeserializeOwned>(&self, key: &str, config: &CacheConfig) -> Option<T> {
        let raw = match self.store.get_item(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!("Failed to read cache entry {}: {}", key, e);
                return None;
            }
        };

        if config.force_refresh {
            debug!("Force refresh requested, dropping {}", key);
            self.remove(key);
            return None;
        }

        let entry: CacheEntry<T> = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Ignoring malformed cache entry {}: {}", key, e);
                return None;
            }
        };

        let duration = config.duration.unwrap_or(self.default_duration);
        let age = self.clock.now_millis() - entry.timestamp;
        if age > duration.as_millis() as i64 {
            debug!("Cache entry {} is stale ({}ms old)", key, age);
            self.remove(key);
            return None;
        }

        Some(entry.data)
    }

    pub fn invalidate(&self, key: &str) {
        debug!("Invalidating cache entry {}", key);
        self.remove(key);
    }

    /// Removes every entry under the prefix, or only those whose key contains
    /// `pattern`. Keys outside the prefix are never touched.
    pub fn clear(&self, pattern: Option<&str>) -> usize {
        let mut removed = 0;
        for key in self.prefixed_keys() {
            if pattern.map_or(true, |p| key.contains(p)) && self.remove(&key) {
                removed += 1;
            }
        }
        debug!("Cleared {} cache entries (pattern: {:?})", removed, pattern);
        removed
    }

    /// Size is the summed byte length of stored values.
    pub fn metrics(&self) -> CacheMetrics {
        let mut metrics = CacheMetrics::default();

        for key in self.prefixed_keys() {
            let raw = match self.store.get_item(&key) {
                Ok(Some(raw)) => raw,
                Ok(None) => continue,
                Err(e) => {
                    warn!("Failed to read cache entry {}: {}", key, e);
                    continue;
                }
            };

            metrics.entries += 1;
            metrics.size += raw.len();

            if let Ok(stamp) = serde_json::from_str::<EntryTimestamp>(&raw) {
                metrics.oldest_entry = Some(
                    metrics
                        .oldest_entry
                        .map_or(stamp.timestamp, |oldest| oldest.min(stamp.timestamp)),
                );
                metrics.newest_entry = Some(
                    metrics
                        .newest_entry
                        .map_or(stamp.timestamp, |newest| newest.max(stamp.timestamp)),
                );
            }
        }

        metrics
    }

    /// Age in milliseconds of every readable entry.
    pub fn status(&self) -> BTreeMap<String, i64> {
        let now = self.clock.now_millis();
        self.prefixed_keys()
            .into_iter()
            .filter_map(|key| {
                let raw = self.store.get_item(&key).ok().flatten()?;
                let stamp: EntryTimestamp = serde_json::from_str(&raw).ok()?;
                Some((key, now - stamp.timestamp))
            })
            .collect()
    }

    fn prefixed_keys(&self) -> Vec<String> {
        match self.store.keys() {
            Ok(keys) => keys
                .into_iter()
                .filter(|key| key.starts_with(&self.prefix))
                .collect(),
            Err(e) => {
                warn!("Failed to list cache keys: {}", e);
                Vec::new()
            }
        }
    }

    fn remove(&self, key: &str) -> bool {
        match self.store.remove_item(key) {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to remove cache entry {}: {}", key, e);
                false
            }
        }
    }
}
