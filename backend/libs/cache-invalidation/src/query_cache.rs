//! Query caches that invalidation events act on.

use crate::event::EventKind;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Cached friendship queries of the current user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKey {
    Friends,
    PendingRequests,
    SentRequests,
    MutualFriends,
}

impl QueryKey {
    pub const ALL: [QueryKey; 4] = [
        QueryKey::Friends,
        QueryKey::PendingRequests,
        QueryKey::SentRequests,
        QueryKey::MutualFriends,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QueryKey::Friends => "friends",
            QueryKey::PendingRequests => "pending-requests",
            QueryKey::SentRequests => "sent-requests",
            QueryKey::MutualFriends => "mutual-friends",
        }
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Queries made stale by each event kind
pub fn stale_queries(kind: EventKind) -> &'static [QueryKey] {
    match kind {
        EventKind::RequestSent => &[QueryKey::SentRequests],
        EventKind::RequestAccepted => &[
            QueryKey::Friends,
            QueryKey::PendingRequests,
            QueryKey::SentRequests,
            QueryKey::MutualFriends,
        ],
        EventKind::RequestRejected => &[QueryKey::PendingRequests],
        EventKind::FriendRemoved => &[QueryKey::Friends, QueryKey::MutualFriends],
        EventKind::SentRequestCancelled => &[QueryKey::SentRequests],
    }
}

/// Local query cache that can mark a query stale.
///
/// Marking an already-stale query again must be harmless.
pub trait QueryCache: Send + Sync {
    fn invalidate(&self, key: QueryKey);
}

impl<F> QueryCache for F
where
    F: Fn(QueryKey) + Send + Sync,
{
    fn invalidate(&self, key: QueryKey) {
        self(key)
    }
}

/// Staleness flags per query.
///
/// The generation of a query only moves when it goes from fresh to stale,
/// so repeated invalidations leave it unchanged.
#[derive(Debug, Default)]
pub struct StaleQueryTracker {
    stale: Mutex<HashMap<QueryKey, u64>>,
    transitions: AtomicU64,
}

impl StaleQueryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<QueryKey, u64>> {
        // single map operations, so a poisoned map is still consistent
        self.stale.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_stale(&self, key: QueryKey) -> bool {
        self.lock().contains_key(&key)
    }

    /// Record a refetch of `key`
    pub fn mark_fresh(&self, key: QueryKey) {
        self.lock().remove(&key);
    }

    /// Currently stale queries in declaration order
    pub fn stale_queries(&self) -> Vec<QueryKey> {
        QueryKey::ALL
            .into_iter()
            .filter(|key| self.is_stale(*key))
            .collect()
    }

    /// Generation at which `key` last went stale, if it is stale
    pub fn generation(&self, key: QueryKey) -> Option<u64> {
        self.lock().get(&key).copied()
    }

    /// Number of fresh to stale transitions so far
    pub fn transitions(&self) -> u64 {
        self.transitions.load(Ordering::Relaxed)
    }
}

impl QueryCache for StaleQueryTracker {
    fn invalidate(&self, key: QueryKey) {
        let mut stale = self.lock();
        if !stale.contains_key(&key) {
            let generation = self.transitions.fetch_add(1, Ordering::Relaxed) + 1;
            stale.insert(key, generation);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_table() {
        assert_eq!(stale_queries(EventKind::RequestSent), &[QueryKey::SentRequests]);
        assert_eq!(stale_queries(EventKind::RequestAccepted).len(), 4);
        assert_eq!(
            stale_queries(EventKind::RequestRejected),
            &[QueryKey::PendingRequests]
        );
        assert_eq!(
            stale_queries(EventKind::FriendRemoved),
            &[QueryKey::Friends, QueryKey::MutualFriends]
        );
        assert_eq!(
            stale_queries(EventKind::SentRequestCancelled),
            &[QueryKey::SentRequests]
        );
    }

    #[test]
    fn test_every_kind_invalidates_something() {
        for kind in EventKind::ALL {
            assert!(!stale_queries(kind).is_empty(), "{} maps to nothing", kind);
        }
    }

    #[test]
    fn test_tracker_is_idempotent() {
        let tracker = StaleQueryTracker::new();
        tracker.invalidate(QueryKey::Friends);
        let first = tracker.generation(QueryKey::Friends);

        tracker.invalidate(QueryKey::Friends);
        assert_eq!(tracker.generation(QueryKey::Friends), first);
        assert_eq!(tracker.transitions(), 1);
        assert_eq!(tracker.stale_queries(), vec![QueryKey::Friends]);
    }

    #[test]
    fn test_tracker_mark_fresh() {
        let tracker = StaleQueryTracker::new();
        tracker.invalidate(QueryKey::SentRequests);
        tracker.mark_fresh(QueryKey::SentRequests);

        assert!(!tracker.is_stale(QueryKey::SentRequests));
        assert!(tracker.stale_queries().is_empty());

        tracker.invalidate(QueryKey::SentRequests);
        assert_eq!(tracker.transitions(), 2);
    }

    #[test]
    fn test_tracker_survives_poisoned_lock() {
        let tracker = std::sync::Arc::new(StaleQueryTracker::new());
        tracker.invalidate(QueryKey::Friends);

        let poisoner = tracker.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.stale.lock().unwrap();
            panic!("listener crashed mid-update");
        })
        .join();
        assert!(tracker.stale.is_poisoned());

        tracker.invalidate(QueryKey::SentRequests);
        assert!(tracker.is_stale(QueryKey::SentRequests));
        assert_eq!(
            tracker.stale_queries(),
            vec![QueryKey::Friends, QueryKey::SentRequests]
        );

        tracker.mark_fresh(QueryKey::Friends);
        assert!(!tracker.is_stale(QueryKey::Friends));
        assert_eq!(tracker.generation(QueryKey::SentRequests), Some(2));
    }

    #[test]
    fn test_closure_query_cache() {
        let seen = Mutex::new(Vec::new());
        let cache = |key: QueryKey| seen.lock().unwrap().push(key);
        cache.invalidate(QueryKey::MutualFriends);
        assert_eq!(*seen.lock().unwrap(), vec![QueryKey::MutualFriends]);
    }
}
