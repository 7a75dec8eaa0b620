//! Environment-driven transport selection.

use crate::transport::{BroadcastTransport, RedisTransport, UnavailableTransport, DEFAULT_CHANNEL};
use crate::Result;
use std::env;
use std::sync::Arc;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidationConfig {
    /// Redis endpoint for the pub/sub channel; `None` means no channel
    pub redis_url: Option<String>,
    pub channel: String,
}

impl Default for InvalidationConfig {
    fn default() -> Self {
        Self {
            redis_url: None,
            channel: DEFAULT_CHANNEL.to_string(),
        }
    }
}

impl InvalidationConfig {
    /// Load from the environment, reading `.env` first when present
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        let non_blank = |key: &str| {
            env::var(key)
                .ok()
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        Self {
            redis_url: non_blank("REDIS_URL"),
            channel: non_blank("INVALIDATION_CHANNEL").unwrap_or_else(|| DEFAULT_CHANNEL.to_string()),
        }
    }

    /// Transport for this configuration.
    ///
    /// Without a Redis URL, or when Redis cannot be reached, the result is an
    /// [`UnavailableTransport`] so the invalidator degrades instead of failing.
    pub async fn build_transport(&self) -> Arc<dyn BroadcastTransport> {
        let Some(url) = &self.redis_url else {
            return Arc::new(UnavailableTransport::new("REDIS_URL not set"));
        };

        match self.connect_redis(url).await {
            Ok(transport) => Arc::new(transport),
            Err(e) => {
                warn!(error = %e, channel = %self.channel, "Redis invalidation transport unavailable");
                Arc::new(UnavailableTransport::new(e.to_string()))
            }
        }
    }

    async fn connect_redis(&self, url: &str) -> Result<RedisTransport> {
        RedisTransport::connect(url, self.channel.clone()).await
    }
}
