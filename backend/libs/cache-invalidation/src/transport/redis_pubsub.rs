//! Redis Pub/Sub transport for contexts in separate processes.

use super::{BroadcastTransport, Frame, Subscription};
use crate::Result;
use futures::StreamExt;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

pub struct RedisTransport {
    client: Client,
    connection: ConnectionManager,
    channel: String,
    context_id: Uuid,
}

impl RedisTransport {
    /// Connect a new context to `channel`
    pub async fn connect(redis_url: &str, channel: impl Into<String>) -> Result<Self> {
        let client = Client::open(redis_url)?;
        let connection = ConnectionManager::new(client.clone()).await?;
        let channel = channel.into();

        info!(channel = %channel, "Redis invalidation transport connected");

        Ok(Self {
            client,
            connection,
            channel,
            context_id: Uuid::new_v4(),
        })
    }

    pub fn context_id(&self) -> Uuid {
        self.context_id
    }
}

#[async_trait::async_trait]
impl BroadcastTransport for RedisTransport {
    fn channel(&self) -> &str {
        &self.channel
    }

    async fn publish(&self, message: &str) -> Result<()> {
        let frame = Frame {
            origin: self.context_id,
            body: message.to_string(),
        };
        let payload = serde_json::to_string(&frame)?;

        let mut conn = self.connection.clone();
        let subscribers: usize = conn.publish(&self.channel, payload).await?;

        debug!(channel = %self.channel, subscribers = subscribers, "Frame published");
        Ok(())
    }

    async fn subscribe(&self) -> Result<Subscription> {
        let mut pubsub = self.client.get_async_pubsub().await?;
        pubsub.subscribe(&self.channel).await?;

        info!(channel = %self.channel, "Subscribed to invalidation channel");

        let own_id = self.context_id;
        let channel = self.channel.clone();

        Ok(Subscription::spawn(move |tx| async move {
            let mut stream = pubsub.on_message();

            while let Some(msg) = stream.next().await {
                let payload = match msg.get_payload::<String>() {
                    Ok(p) => p,
                    Err(e) => {
                        error!(error = ?e, "Failed to get message payload");
                        continue;
                    }
                };

                let frame: Frame = match serde_json::from_str(&payload) {
                    Ok(f) => f,
                    Err(e) => {
                        warn!(error = ?e, channel = %channel, "Dropping frame without envelope");
                        continue;
                    }
                };

                if frame.origin == own_id {
                    continue;
                }
                if tx.send(frame.body).await.is_err() {
                    break;
                }
            }

            warn!(channel = %channel, "Invalidation subscription ended");
        }))
    }
}
