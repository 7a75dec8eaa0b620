//! In-process broadcast bus.
//!
//! Every [`LocalTransport`] handed out by one [`LocalBus`] behaves like a
//! separate context (a browser tab) on the same channel.

use super::{BroadcastTransport, Frame, Subscription};
use crate::{InvalidationError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};
use uuid::Uuid;

const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub struct LocalBus {
    channel: String,
    tx: broadcast::Sender<Frame>,
}

impl LocalBus {
    pub fn new(channel: impl Into<String>) -> Self {
        Self::with_capacity(channel, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(channel: impl Into<String>, capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            channel: channel.into(),
            tx,
        }
    }

    /// A transport for a new context on this bus
    pub fn connect(&self) -> LocalTransport {
        LocalTransport {
            bus: self.clone(),
            context_id: Uuid::new_v4(),
            closed: AtomicBool::new(false),
        }
    }
}

#[derive(Debug)]
pub struct LocalTransport {
    bus: LocalBus,
    context_id: Uuid,
    closed: AtomicBool,
}

impl LocalTransport {
    pub fn context_id(&self) -> Uuid {
        self.context_id
    }

    /// Tear this end of the channel down; later publishes fail
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl BroadcastTransport for LocalTransport {
    fn channel(&self) -> &str {
        &self.bus.channel
    }

    async fn publish(&self, message: &str) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(InvalidationError::ChannelClosed(self.bus.channel.clone()));
        }

        let frame = Frame {
            origin: self.context_id,
            body: message.to_string(),
        };
        // an error only means nobody is listening right now
        match self.bus.tx.send(frame) {
            Ok(receivers) => debug!(channel = %self.bus.channel, receivers = receivers, "Local frame sent"),
            Err(_) => debug!(channel = %self.bus.channel, "Local frame sent with no listeners"),
        }
        Ok(())
    }

    async fn subscribe(&self) -> Result<Subscription> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(InvalidationError::ChannelClosed(self.bus.channel.clone()));
        }

        let mut rx = self.bus.tx.subscribe();
        let own_id = self.context_id;
        let channel = self.bus.channel.clone();

        Ok(Subscription::spawn(move |tx| async move {
            loop {
                match rx.recv().await {
                    Ok(frame) if frame.origin == own_id => continue,
                    Ok(frame) => {
                        if tx.send(frame.body).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(channel = %channel, skipped = skipped, "Local subscriber lagged, frames dropped");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }))
    }
}
