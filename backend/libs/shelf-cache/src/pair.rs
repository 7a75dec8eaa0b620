//! Process-local cache keyed by an unordered pair of identifiers.
//!
//! Entries expire lazily after the TTL. Concurrent [`PairCache::fetch_deduped`]
//! calls for the same pair share one producer run: the first caller registers
//! a [`Shared`] future under the pair key and later callers await a clone of
//! it until it settles.

use crate::{ttl, CacheMetrics};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::time::{Duration, Instant};
use tracing::debug;

/// Order-independent key for two identifiers
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PairKey {
    low: String,
    high: String,
}

impl PairKey {
    pub fn new(a: &str, b: &str) -> Self {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        Self {
            low: low.to_string(),
            high: high.to_string(),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.low == id || self.high == id
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.low, self.high)
    }
}

#[derive(Debug, Clone)]
struct PairEntry<V> {
    value: V,
    created_at: Instant,
}

type InFlight<V, E> = Shared<BoxFuture<'static, Result<V, E>>>;

struct PairState<V, E> {
    entries: HashMap<PairKey, PairEntry<V>>,
    in_flight: HashMap<PairKey, InFlight<V, E>>,
    /// In-flight keys invalidated before they settled; their results are not stored
    discarded: HashSet<PairKey>,
}

struct PairCacheInner<V, E> {
    name: &'static str,
    ttl: Duration,
    state: Mutex<PairState<V, E>>,
    metrics: CacheMetrics,
}

impl<V, E> PairCacheInner<V, E> {
    fn lock(&self) -> MutexGuard<'_, PairState<V, E>> {
        // bookkeeping never panics midway, so a poisoned map is still consistent
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<V: Clone, E> PairState<V, E> {
    fn fresh(&mut self, key: &PairKey, ttl: Duration) -> Option<V> {
        let entry = self.entries.get(key)?;
        if entry.created_at.elapsed() < ttl {
            return Some(entry.value.clone());
        }
        self.entries.remove(key);
        None
    }
}

/// In-memory pair cache with in-flight de-duplication
pub struct PairCache<V, E> {
    inner: Arc<PairCacheInner<V, E>>,
}

impl<V, E> Clone for PairCache<V, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V, E> PairCache<V, E>
where
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Cache with the default five minute TTL
    pub fn new(name: &'static str) -> Self {
        Self::with_ttl(name, Duration::from_secs(ttl::PAIR))
    }

    pub fn with_ttl(name: &'static str, ttl: Duration) -> Self {
        Self {
            inner: Arc::new(PairCacheInner {
                name,
                ttl,
                state: Mutex::new(PairState {
                    entries: HashMap::new(),
                    in_flight: HashMap::new(),
                    discarded: HashSet::new(),
                }),
                metrics: CacheMetrics::new(),
            }),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }

    /// Stored value for the pair if it is younger than the TTL.
    /// A stale entry is evicted.
    pub fn get_if_fresh(&self, a: &str, b: &str) -> Option<V> {
        self.fresh(&PairKey::new(a, b))
    }

    pub fn put(&self, a: &str, b: &str, value: V) {
        store(&self.inner, PairKey::new(a, b), value);
    }

    /// Fresh value, else the in-flight result for the pair, else a new producer run.
    ///
    /// The producer runs on a spawned task and always settles, even if every
    /// caller stops waiting. A failed run caches nothing, so the next call
    /// starts over.
    pub async fn fetch_deduped<F, Fut>(&self, a: &str, b: &str, producer: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        let key = PairKey::new(a, b);

        let joined = {
            let mut state = self.inner.lock();
            if let Some(value) = state.fresh(&key, self.inner.ttl) {
                return Ok(value);
            }
            state.in_flight.get(&key).cloned()
        };
        if let Some(pending) = joined {
            self.inner.metrics.record_dedup_join(self.inner.name);
            return pending.await;
        }

        // the producer is called without holding the lock; its future does no work until polled
        let fut = producer();

        let shared = {
            let mut state = self.inner.lock();
            if let Some(value) = state.fresh(&key, self.inner.ttl) {
                return Ok(value);
            }
            match state.in_flight.get(&key) {
                Some(existing) => {
                    // another thread registered first, `fut` is dropped unpolled
                    self.inner.metrics.record_dedup_join(self.inner.name);
                    existing.clone()
                }
                None => {
                    let shared = settle_into(Arc::clone(&self.inner), key.clone(), fut);
                    state.in_flight.insert(key.clone(), shared.clone());
                    debug!(cache = self.inner.name, pair = %key, "Pair fetch started");
                    tokio::spawn(shared.clone());
                    shared
                }
            }
        };

        shared.await
    }

    /// Drop every entry mentioning `id`, or everything when `id` is `None`.
    ///
    /// Matching in-flight fetches still settle and answer their callers, but
    /// their results are not stored.
    pub fn invalidate(&self, id: Option<&str>) -> usize {
        let mut state = self.inner.lock();
        let before = state.entries.len();
        match id {
            Some(id) => state.entries.retain(|key, _| !key.contains(id)),
            None => state.entries.clear(),
        }
        let stale_flights: Vec<PairKey> = state
            .in_flight
            .keys()
            .filter(|key| id.map_or(true, |id| key.contains(id)))
            .cloned()
            .collect();
        state.discarded.extend(stale_flights);
        let removed = before - state.entries.len();
        debug!(cache = self.inner.name, id = ?id, removed = removed, "Pair cache invalidated");
        removed
    }

    /// Stored entries, stale ones included
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn in_flight_count(&self) -> usize {
        self.inner.lock().in_flight.len()
    }

    fn fresh(&self, key: &PairKey) -> Option<V> {
        self.inner.lock().fresh(key, self.inner.ttl)
    }
}

fn store<V, E>(inner: &PairCacheInner<V, E>, key: PairKey, value: V) {
    inner.lock().entries.insert(
        key,
        PairEntry {
            value,
            created_at: Instant::now(),
        },
    );
}

/// Wrap `fut` so that settling it updates the cache and clears the in-flight marker.
fn settle_into<V, E, Fut>(
    inner: Arc<PairCacheInner<V, E>>,
    key: PairKey,
    fut: Fut,
) -> InFlight<V, E>
where
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<V, E>> + Send + 'static,
{
    async move {
        let result = fut.await;
        {
            let mut state = inner.lock();
            state.in_flight.remove(&key);
            let discarded = state.discarded.remove(&key);
            if let (Ok(value), false) = (&result, discarded) {
                state.entries.insert(
                    key.clone(),
                    PairEntry {
                        value: value.clone(),
                        created_at: Instant::now(),
                    },
                );
            }
        }
        debug!(cache = inner.name, pair = %key, ok = result.is_ok(), "Pair fetch settled");
        result
    }
    .boxed()
    .shared()
}
