//! Statistics for cross-context invalidation

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Samples kept for lag percentiles
const MAX_LAG_SAMPLES: usize = 1000;

/// Snapshot of invalidator activity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvalidationStats {
    pub events_published: u64,
    pub events_received: u64,
    /// Frames with an unknown kind or an undecodable body
    pub events_ignored: u64,
    /// Publishes dropped because the invalidator is closed
    pub events_dropped: u64,
    pub errors: u64,
    pub delivery_lag_p50_ms: f64,
    pub delivery_lag_p99_ms: f64,
}

/// Thread-safe statistics collector
#[derive(Clone, Default)]
pub struct StatsCollector {
    published: Arc<AtomicU64>,
    received: Arc<AtomicU64>,
    ignored: Arc<AtomicU64>,
    dropped: Arc<AtomicU64>,
    errors: Arc<AtomicU64>,
    lags: Arc<std::sync::Mutex<Vec<f64>>>,
}

impl StatsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_publish(&self) {
        self.published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_receive(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ignored(&self) {
        self.ignored.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Record time between publish and receipt (in milliseconds).
    /// Negative values from clock skew between processes count as zero.
    pub fn record_lag(&self, lag_ms: f64) {
        if let Ok(mut lags) = self.lags.lock() {
            lags.push(lag_ms.max(0.0));
            if lags.len() > MAX_LAG_SAMPLES {
                lags.drain(0..MAX_LAG_SAMPLES / 2);
            }
        }
    }

    pub fn snapshot(&self) -> InvalidationStats {
        let (p50, p99) = match self.lags.lock() {
            Ok(lags) if !lags.is_empty() => {
                let mut sorted = lags.clone();
                sorted.sort_by(|a, b| a.total_cmp(b));
                (percentile(&sorted, 0.50), percentile(&sorted, 0.99))
            }
            _ => (0.0, 0.0),
        };

        InvalidationStats {
            events_published: self.published.load(Ordering::Relaxed),
            events_received: self.received.load(Ordering::Relaxed),
            events_ignored: self.ignored.load(Ordering::Relaxed),
            events_dropped: self.dropped.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            delivery_lag_p50_ms: p50,
            delivery_lag_p99_ms: p99,
        }
    }
}

fn percentile(sorted: &[f64], q: f64) -> f64 {
    let idx = (sorted.len() as f64 * q) as usize;
    sorted[idx.min(sorted.len() - 1)]
}
