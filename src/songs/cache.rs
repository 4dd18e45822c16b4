//! Query result caching.
//!
//! [`CacheCoordinator`] wraps a [`CacheBackend`] and implements the
//! read-through policy: a hit returns the stored JSON without running the
//! computation, a miss runs it and stores successful results. Failures are
//! never stored.

use super::error::QueryError;
use super::params::CacheKey;
use crate::server::metrics;
use anyhow::Result;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Storage behind the cache coordinator. Values are opaque bytes.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()>;
}

// =============================================================================
// In-memory LRU backend
// =============================================================================

struct Entry {
    value: Vec<u8>,
    expires_at: Instant,
    tick: u64,
}

#[derive(Default)]
struct LruState {
    entries: HashMap<String, Entry>,
    // tick -> key, smallest tick is the least recently used entry
    recency: BTreeMap<u64, String>,
    next_tick: u64,
}

impl LruState {
    fn touch(&mut self, key: &str) {
        let tick = self.next_tick;
        self.next_tick += 1;
        if let Some(entry) = self.entries.get_mut(key) {
            self.recency.remove(&entry.tick);
            entry.tick = tick;
            self.recency.insert(tick, key.to_string());
        }
    }

    fn remove(&mut self, key: &str) {
        if let Some(entry) = self.entries.remove(key) {
            self.recency.remove(&entry.tick);
        }
    }
}

/// Process-local LRU cache with per-entry TTL. Expiry is checked lazily on
/// lookup, eviction happens on insert once `max_entries` is exceeded.
pub struct InMemoryCache {
    state: Mutex<LruState>,
    max_entries: usize,
}

impl InMemoryCache {
    pub fn new(max_entries: usize) -> Self {
        InMemoryCache {
            state: Mutex::new(LruState::default()),
            max_entries,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LruState> {
        // The state is consistent after every statement, a poisoned lock is still usable.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get_at(&self, key: &str, now: Instant) -> Option<Vec<u8>> {
        let mut state = self.lock();
        let expired = match state.entries.get(key) {
            None => return None,
            Some(entry) => entry.expires_at <= now,
        };
        if expired {
            state.remove(key);
            metrics::set_cache_entries(state.entries.len());
            return None;
        }
        state.touch(key);
        state.entries.get(key).map(|entry| entry.value.clone())
    }

    fn set_at(&self, key: &str, value: Vec<u8>, ttl: Duration, now: Instant) {
        if self.max_entries == 0 {
            return;
        }
        let mut state = self.lock();
        state.remove(key);
        let tick = state.next_tick;
        state.next_tick += 1;
        state.entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: now + ttl,
                tick,
            },
        );
        state.recency.insert(tick, key.to_string());

        while state.entries.len() > self.max_entries {
            let Some((_, evicted)) = state.recency.pop_first() else {
                break;
            };
            debug!("Evicting least recently used cache entry {}", evicted);
            state.entries.remove(&evicted);
        }
        metrics::set_cache_entries(state.entries.len());
    }
}

#[async_trait]
impl CacheBackend for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.get_at(key, Instant::now()))
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        self.set_at(key, value, ttl, Instant::now());
        Ok(())
    }
}

// =============================================================================
// Coordinator
// =============================================================================

pub struct CacheCoordinator {
    backend: Arc<dyn CacheBackend>,
    ttl: Duration,
    empty_ttl: Duration,
}

impl CacheCoordinator {
    /// `empty_ttl` applies to empty results, `ttl` to everything else.
    pub fn new(backend: Arc<dyn CacheBackend>, ttl: Duration, empty_ttl: Duration) -> Self {
        CacheCoordinator {
            backend,
            ttl,
            empty_ttl,
        }
    }

    /// Return the cached value for `key`, or run `compute` and cache its result.
    pub async fn get_or_compute<T, F, Fut>(
        &self,
        key: &CacheKey,
        compute: F,
    ) -> Result<Vec<T>, QueryError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<T>, QueryError>>,
    {
        let kind = key.kind().as_str();
        match self.backend.get(key.as_str()).await {
            Ok(Some(bytes)) => match serde_json::from_slice::<Vec<T>>(&bytes) {
                Ok(value) => {
                    debug!("Cache hit for {}", key);
                    metrics::record_cache_lookup(kind, "hit");
                    return Ok(value);
                }
                Err(err) => warn!("Discarding unreadable cache entry {}: {}", key, err),
            },
            Ok(None) => {}
            Err(err) => warn!("Cache lookup for {} failed: {:#}", key, err),
        }

        debug!("Cache miss for {}", key);
        metrics::record_cache_lookup(kind, "miss");
        let value = compute().await?;

        let ttl = if value.is_empty() {
            self.empty_ttl
        } else {
            self.ttl
        };
        match serde_json::to_vec(&value) {
            Ok(bytes) => {
                if let Err(err) = self.backend.set(key.as_str(), bytes, ttl).await {
                    warn!("Failed to store cache entry {}: {:#}", key, err);
                }
            }
            Err(err) => warn!("Failed to serialize cache entry {}: {}", key, err),
        }
        Ok(value)
    }
}
