//! Cross-context invalidator.
//!
//! One instance per context. Friendship mutations are announced with
//! [`CrossContextInvalidator::publish`]; frames from other contexts are
//! dispatched to the local [`QueryCache`], which marks the affected queries
//! stale. Nothing but the event identity crosses the channel.

use crate::event::{Decoded, EventKind, EventPayload, InvalidationEvent};
use crate::query_cache::{stale_queries, QueryCache, QueryKey};
use crate::stats::{InvalidationStats, StatsCollector};
use crate::transport::BroadcastTransport;
use chrono::Utc;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidatorState {
    /// Channel open, listener attached
    Subscribed,
    /// Channel unavailable or torn down; publishes are dropped
    Closed,
}

/// What a received frame did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiveOutcome {
    Invalidated {
        kind: EventKind,
        queries: &'static [QueryKey],
    },
    UnknownKind(String),
    Malformed,
}

/// Receiving half, shared with the listener task
struct Dispatcher {
    query_cache: Arc<dyn QueryCache>,
    stats: StatsCollector,
}

impl Dispatcher {
    fn handle(&self, raw: &str) -> ReceiveOutcome {
        let decoded = match InvalidationEvent::decode(raw) {
            Ok(decoded) => decoded,
            Err(e) => {
                error!(error = %e, "Failed to decode invalidation frame");
                self.stats.record_ignored();
                return ReceiveOutcome::Malformed;
            }
        };

        match decoded {
            Decoded::Unknown { event_kind, .. } => {
                warn!(event_kind = %event_kind, "Ignoring unknown invalidation event");
                self.stats.record_ignored();
                ReceiveOutcome::UnknownKind(event_kind)
            }
            Decoded::Known(event) => {
                self.stats.record_receive();
                let lag = Utc::now() - event.timestamp;
                self.stats.record_lag(lag.num_milliseconds() as f64);

                let queries = stale_queries(event.kind);
                for query in queries {
                    self.query_cache.invalidate(*query);
                }

                debug!(
                    event_kind = %event.kind,
                    user_id = %event.payload.user_id,
                    queries = ?queries,
                    "Queries marked stale"
                );
                ReceiveOutcome::Invalidated {
                    kind: event.kind,
                    queries,
                }
            }
        }
    }
}

pub struct CrossContextInvalidator {
    transport: Option<Arc<dyn BroadcastTransport>>,
    dispatcher: Arc<Dispatcher>,
    state: Mutex<InvalidatorState>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl CrossContextInvalidator {
    /// Subscribe on `transport` and forward other contexts' events to
    /// `query_cache`.
    ///
    /// A transport that cannot subscribe leaves the invalidator closed for
    /// its whole lifetime.
    pub async fn connect(
        transport: Arc<dyn BroadcastTransport>,
        query_cache: Arc<dyn QueryCache>,
    ) -> Self {
        let dispatcher = Arc::new(Dispatcher {
            query_cache,
            stats: StatsCollector::new(),
        });

        let mut subscription = match transport.subscribe().await {
            Ok(subscription) => subscription,
            Err(e) => {
                warn!(
                    channel = %transport.channel(),
                    error = %e,
                    "Cross-context channel unavailable, invalidation disabled"
                );
                return Self::closed(dispatcher);
            }
        };

        let channel = transport.channel().to_string();
        let listener_dispatcher = Arc::clone(&dispatcher);
        let listener = tokio::spawn(async move {
            while let Some(raw) = subscription.recv().await {
                listener_dispatcher.handle(&raw);
            }
            debug!(channel = %channel, "Invalidation listener stopped");
        });

        info!(channel = %transport.channel(), "Cross-context invalidator subscribed");

        Self {
            transport: Some(transport),
            dispatcher,
            state: Mutex::new(InvalidatorState::Subscribed),
            listener: Mutex::new(Some(listener)),
        }
    }

    /// Invalidator without any channel
    pub fn disabled(query_cache: Arc<dyn QueryCache>) -> Self {
        Self::closed(Arc::new(Dispatcher {
            query_cache,
            stats: StatsCollector::new(),
        }))
    }

    fn closed(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            transport: None,
            dispatcher,
            state: Mutex::new(InvalidatorState::Closed),
            listener: Mutex::new(None),
        }
    }

    pub fn state(&self) -> InvalidatorState {
        self.state
            .lock()
            .map(|state| *state)
            .unwrap_or(InvalidatorState::Closed)
    }

    /// Announce `kind` to every other context. Never fails.
    pub async fn publish(&self, kind: EventKind, payload: EventPayload) {
        let transport = match (&self.transport, self.state()) {
            (Some(transport), InvalidatorState::Subscribed) => transport,
            _ => {
                debug!(event_kind = %kind, "Invalidator closed, event dropped");
                self.dispatcher.stats.record_dropped();
                return;
            }
        };

        let raw = match InvalidationEvent::new(kind, payload).encode() {
            Ok(raw) => raw,
            Err(e) => {
                error!(event_kind = %kind, error = %e, "Failed to encode invalidation event");
                self.dispatcher.stats.record_error();
                return;
            }
        };

        match transport.publish(&raw).await {
            Ok(()) => {
                self.dispatcher.stats.record_publish();
                debug!(event_kind = %kind, channel = %transport.channel(), "Invalidation event published");
            }
            Err(e) => {
                warn!(event_kind = %kind, error = %e, "Failed to publish invalidation event");
                self.dispatcher.stats.record_error();
            }
        }
    }

    /// Handle one raw frame from another context
    pub fn on_receive(&self, raw: &str) -> ReceiveOutcome {
        self.dispatcher.handle(raw)
    }

    /// Detach the listener. Idempotent.
    pub fn close(&self) {
        if let Ok(mut state) = self.state.lock() {
            if *state == InvalidatorState::Closed {
                return;
            }
            *state = InvalidatorState::Closed;
        }

        if let Ok(mut listener) = self.listener.lock() {
            if let Some(handle) = listener.take() {
                handle.abort();
            }
        }
        info!("Cross-context invalidator closed");
    }

    pub fn stats(&self) -> InvalidationStats {
        self.dispatcher.stats.snapshot()
    }
}

impl Drop for CrossContextInvalidator {
    fn drop(&mut self) {
        self.close();
    }
}
