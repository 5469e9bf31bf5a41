// TTL cache with single-flight fetches, plus the global reload throttle
use crate::error::FetchError;
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::{Duration, Instant};
use tokio::sync::Mutex as AsyncMutex;

struct Entry<V> {
    fetched_at: Instant,
    value: V,
}

/// Per-key cache with TTL expiry and single-flight de-duplication.
///
/// Concurrent callers for the same key serialize on a per-key async
/// mutex: the first one runs the fetcher, the others wake up to a fresh
/// entry and return it without issuing a second request. A failed fetch
/// writes nothing, so the next caller retries (no negative caching).
pub struct FetchCache<K, V> {
    ttl: Duration,
    slots: StdMutex<HashMap<K, Arc<AsyncMutex<Option<Entry<V>>>>>>,
}

impl<K, V> FetchCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slots: StdMutex::new(HashMap::new()),
        }
    }

    fn slot(&self, key: &K) -> Arc<AsyncMutex<Option<Entry<V>>>> {
        let mut slots = self.slots.lock().unwrap();
        slots
            .entry(key.clone())
            .or_insert_with(|| Arc::new(AsyncMutex::new(None)))
            .clone()
    }

    pub async fn get_or_fetch<F, Fut>(
        &self,
        key: K,
        force_refresh: bool,
        fetcher: F,
    ) -> Result<V, FetchError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, FetchError>>,
    {
        let slot = self.slot(&key);
        let mut guard = slot.lock().await;

        if !force_refresh {
            if let Some(entry) = guard.as_ref() {
                if entry.fetched_at.elapsed() < self.ttl {
                    return Ok(entry.value.clone());
                }
            }
        }

        let value = fetcher().await?;
        *guard = Some(Entry {
            fetched_at: Instant::now(),
            value: value.clone(),
        });
        Ok(value)
    }

    /// Fresh cached value, without fetching.
    pub fn peek(&self, key: &K) -> Option<V> {
        let slot = self.slot(key);
        let guard = slot.try_lock().ok()?;
        guard
            .as_ref()
            .filter(|entry| entry.fetched_at.elapsed() < self.ttl)
            .map(|entry| entry.value.clone())
    }

    /// Drop everything, e.g. on an explicit backend re-sync.
    pub fn clear(&self) {
        self.slots.lock().unwrap().clear();
    }
}

/// Minimum-interval gate around the top-level "reload everything"
/// operation.
pub struct ReloadGate {
    min_interval: Duration,
    last_reload: StdMutex<Option<Instant>>,
}

impl ReloadGate {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_reload: StdMutex::new(None),
        }
    }

    /// Record the reload if allowed; a call inside the minimum interval
    /// is rejected and logged.
    pub fn try_acquire(&self) -> bool {
        let mut last = self.last_reload.lock().unwrap();
        if let Some(stamp) = *last {
            if stamp.elapsed() < self.min_interval {
                tracing::warn!("reload skipped to respect the request rate limit");
                return false;
            }
        }
        *last = Some(Instant::now());
        true
    }

    /// Backdate the stamp so one explicit user-initiated reload passes
    /// regardless of the interval.
    pub fn allow_immediate(&self) {
        *self.last_reload.lock().unwrap() = None;
    }
}
