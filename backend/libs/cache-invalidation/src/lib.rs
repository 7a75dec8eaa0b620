//! Cross-context cache invalidation for Shelf clients
//!
//! Each running context (browser tab, app process) keeps its own query cache.
//! When one context changes a friendship it announces the change, and every
//! other context marks the affected queries stale. Only the event identity
//! travels; the data is refetched by whoever needs it.
//!
//! # Architecture
//!
//! ```text
//! Context A:
//!   1. Accept friend request
//!   2. invalidator.publish(RequestAccepted, payload)
//!      {"event_kind":"request-accepted","payload":{...},"timestamp":"..."}
//!      ↓
//! Broadcast channel "shelf:friends-sync" (local bus or Redis Pub/Sub)
//!      ↓
//! Context B, C (A never hears its own frame):
//!   3. Decode event, look up stale queries
//!   4. query_cache.invalidate(friends | pending-requests | sent-requests | mutual-friends)
//! ```
//!
//! # Example
//!
//! ```no_run
//! use cache_invalidation::{
//!     CrossContextInvalidator, EventKind, EventPayload, LocalBus, StaleQueryTracker,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let bus = LocalBus::new("shelf:friends-sync");
//!     let tab_a = CrossContextInvalidator::connect(
//!         Arc::new(bus.connect()),
//!         Arc::new(StaleQueryTracker::new()),
//!     )
//!     .await;
//!     let tracker_b = Arc::new(StaleQueryTracker::new());
//!     let _tab_b = CrossContextInvalidator::connect(Arc::new(bus.connect()), tracker_b.clone()).await;
//!
//!     tab_a
//!         .publish(EventKind::RequestAccepted, EventPayload::new("u1").with_other_user("u2"))
//!         .await;
//! }
//! ```

mod config;
mod error;
mod event;
mod invalidator;
mod query_cache;
mod stats;
mod transport;

pub use config::InvalidationConfig;
pub use error::InvalidationError;
pub use event::{Decoded, EventKind, EventPayload, InvalidationEvent};
pub use invalidator::{CrossContextInvalidator, InvalidatorState, ReceiveOutcome};
pub use query_cache::{stale_queries, QueryCache, QueryKey, StaleQueryTracker};
pub use stats::InvalidationStats;
pub use transport::{
    BroadcastTransport, LocalBus, LocalTransport, RedisTransport, Subscription,
    UnavailableTransport, DEFAULT_CHANNEL,
};

pub type Result<T> = std::result::Result<T, InvalidationError>;
