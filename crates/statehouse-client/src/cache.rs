//! Short-TTL request cache.
//!
//! Collapses bursts of identical calls triggered by redundant UI updates
//! into a single network request. This is not a general-purpose cache: the
//! TTL is deliberately short so real data changes are never masked, and only
//! successful JSON responses are ever stored.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use statehouse_core::error::Result;

use crate::request::JsonResponse;

/// Default entry lifetime. Long enough to collapse duplicate bursts, short
/// enough that a user-visible refresh always reaches the network.
pub const REQUEST_CACHE_TTL: Duration = Duration::from_millis(1200);

struct CacheEntry {
    stored_at: Instant,
    generation: u64,
    response: JsonResponse,
}

/// De-duplicating wrapper around network calls.
///
/// Explicitly constructed and passed by reference into the components that
/// need it, never an ambient singleton, so TTL eviction stays independently
/// testable.
pub struct RequestCache {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
    ttl: Duration,
    generation: Arc<std::sync::atomic::AtomicU64>,
}

impl RequestCache {
    /// Creates a cache with the default TTL.
    pub fn new() -> Self {
        Self::with_ttl(REQUEST_CACHE_TTL)
    }

    /// Creates a cache with an explicit TTL. Tests shrink it to exercise
    /// expiry without waiting.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl,
            generation: Arc::new(std::sync::atomic::AtomicU64::new(0)),
        }
    }

    /// Returns the cached response for `key` when a non-expired entry
    /// exists; otherwise runs `fetch`, stores a successful result, and
    /// schedules its eviction at TTL expiry.
    pub async fn execute<F, Fut>(&self, key: &str, fetch: F) -> Result<JsonResponse>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<JsonResponse>>,
    {
        {
            let entries = self.entries.read().await;
            if let Some(entry) = entries.get(key) {
                if entry.stored_at.elapsed() < self.ttl {
                    tracing::debug!("[RequestCache] Hit for {}", key);
                    return Ok(entry.response.clone());
                }
            }
        }

        let response = fetch().await?;

        let generation = self
            .generation
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        {
            let mut entries = self.entries.write().await;
            entries.insert(
                key.to_string(),
                CacheEntry {
                    stored_at: Instant::now(),
                    generation,
                    response: response.clone(),
                },
            );
        }
        self.schedule_eviction(key.to_string(), generation);

        Ok(response)
    }

    /// Drops all entries immediately.
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    fn schedule_eviction(&self, key: String, generation: u64) {
        let entries = Arc::clone(&self.entries);
        let ttl = self.ttl;
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            let mut entries = entries.write().await;
            // A newer entry under the same key outlives this eviction.
            if entries
                .get(&key)
                .is_some_and(|entry| entry.generation == generation)
            {
                entries.remove(&key);
            }
        });
    }
}

impl Default for RequestCache {
    fn default() -> Self {
        Self::new()
    }
}
