//! Two contexts sharing one local bus.
//!
//! Run with: cargo run -p cache-invalidation --example two_tabs
//! Set REDIS_URL to use Redis Pub/Sub instead of the in-process bus.

use cache_invalidation::{
    BroadcastTransport, CrossContextInvalidator, EventKind, EventPayload, InvalidationConfig,
    LocalBus, StaleQueryTracker,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cache_invalidation=debug,two_tabs=info".into()),
        )
        .init();

    let config = InvalidationConfig::from_env();
    let (transport_a, transport_b): (Arc<dyn BroadcastTransport>, Arc<dyn BroadcastTransport>) =
        if config.redis_url.is_some() {
            (config.build_transport().await, config.build_transport().await)
        } else {
            let bus = LocalBus::new(config.channel.clone());
            (Arc::new(bus.connect()), Arc::new(bus.connect()))
        };

    let tracker_a = Arc::new(StaleQueryTracker::new());
    let tracker_b = Arc::new(StaleQueryTracker::new());
    let tab_a = CrossContextInvalidator::connect(transport_a, tracker_a.clone()).await;
    let tab_b = CrossContextInvalidator::connect(transport_b, tracker_b.clone()).await;

    tab_a
        .publish(
            EventKind::RequestAccepted,
            EventPayload::new("reader-1").with_other_user("reader-2"),
        )
        .await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    info!(stale = ?tracker_a.stale_queries(), "Tab A");
    info!(stale = ?tracker_b.stale_queries(), "Tab B");
    info!(stats = ?tab_b.stats(), "Tab B stats");

    tab_a.close();
    tab_b.close();
    Ok(())
}
