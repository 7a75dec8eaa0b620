//! Broadcast transports.
//!
//! A transport fans a message out to every other context on the same channel.
//! Frames carry the id of the publishing context and each subscription drops
//! frames from its own context, so a publisher never hears itself.

mod local;
mod redis_pubsub;

pub use local::{LocalBus, LocalTransport};
pub use redis_pubsub::RedisTransport;

use crate::{InvalidationError, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Default channel name shared by every context of a user
pub const DEFAULT_CHANNEL: &str = "shelf:friends-sync";

/// Messages buffered per subscription before the forwarder waits
const SUBSCRIPTION_BUFFER: usize = 64;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Frame {
    pub origin: Uuid,
    pub body: String,
}

/// Publish/subscribe capability of a cross-context channel
#[async_trait::async_trait]
pub trait BroadcastTransport: Send + Sync {
    fn channel(&self) -> &str;

    /// Send a message to every other subscribed context
    async fn publish(&self, message: &str) -> Result<()>;

    /// Start receiving messages published by other contexts
    async fn subscribe(&self) -> Result<Subscription>;
}

/// Stream of messages from other contexts.
///
/// Dropping the subscription stops its background forwarder.
pub struct Subscription {
    rx: mpsc::Receiver<String>,
    forwarder: JoinHandle<()>,
}

impl Subscription {
    /// Channel sender plus the forwarding task that feeds it
    pub(crate) fn spawn<F, Fut>(forward: F) -> Self
    where
        F: FnOnce(mpsc::Sender<String>) -> Fut,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        let forwarder = tokio::spawn(forward(tx));
        Self { rx, forwarder }
    }

    /// Next message, or `None` once the channel is gone
    pub async fn recv(&mut self) -> Option<String> {
        self.rx.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.forwarder.abort();
    }
}

/// Transport for environments without a broadcast channel
#[derive(Debug, Clone)]
pub struct UnavailableTransport {
    reason: String,
}

impl UnavailableTransport {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait::async_trait]
impl BroadcastTransport for UnavailableTransport {
    fn channel(&self) -> &str {
        DEFAULT_CHANNEL
    }

    async fn publish(&self, _message: &str) -> Result<()> {
        Err(InvalidationError::TransportUnavailable(self.reason.clone()))
    }

    async fn subscribe(&self) -> Result<Subscription> {
        Err(InvalidationError::TransportUnavailable(self.reason.clone()))
    }
}
