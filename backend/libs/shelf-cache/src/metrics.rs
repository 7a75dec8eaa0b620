//! Cache metrics for observability

use prometheus::{CounterVec, Opts, Registry};
use std::sync::OnceLock;

static METRICS: OnceLock<CacheMetricsInner> = OnceLock::new();

struct CacheMetricsInner {
    hits: CounterVec,
    misses: CounterVec,
    writes: CounterVec,
    invalidations: CounterVec,
    errors: CounterVec,
    pair_dedup_joins: CounterVec,
}

fn counter(name: &str, help: &str, labels: &[&str]) -> CounterVec {
    CounterVec::new(Opts::new(name, help), labels).expect("valid metric definition")
}

impl CacheMetricsInner {
    fn new() -> Self {
        Self {
            hits: counter("shelf_cache_hits_total", "Total cache hits", &["namespace"]),
            misses: counter(
                "shelf_cache_misses_total",
                "Total cache misses",
                &["namespace"],
            ),
            writes: counter(
                "shelf_cache_writes_total",
                "Total cache writes",
                &["namespace"],
            ),
            invalidations: counter(
                "shelf_cache_invalidations_total",
                "Total cache entries removed",
                &["namespace"],
            ),
            errors: counter(
                "shelf_cache_errors_total",
                "Total cache layer errors swallowed by fail-open handling",
                &["namespace", "error_type"],
            ),
            pair_dedup_joins: counter(
                "shelf_cache_pair_dedup_joins_total",
                "Pair cache callers that joined an in-flight fetch",
                &["cache"],
            ),
        }
    }

    fn register(&self, registry: &Registry) -> Result<(), prometheus::Error> {
        registry.register(Box::new(self.hits.clone()))?;
        registry.register(Box::new(self.misses.clone()))?;
        registry.register(Box::new(self.writes.clone()))?;
        registry.register(Box::new(self.invalidations.clone()))?;
        registry.register(Box::new(self.errors.clone()))?;
        registry.register(Box::new(self.pair_dedup_joins.clone()))?;
        Ok(())
    }
}

fn get_metrics() -> &'static CacheMetricsInner {
    METRICS.get_or_init(CacheMetricsInner::new)
}

/// Namespace of a key is everything before the first `:`.
/// Patterns keep their namespace as long as the wildcard comes later.
pub(crate) fn namespace(key: &str) -> &str {
    match key.split_once(':') {
        Some((ns, _)) if !ns.is_empty() && !ns.contains('*') => ns,
        _ => "unknown",
    }
}

/// Cache metrics wrapper
#[derive(Clone, Copy, Debug, Default)]
pub struct CacheMetrics;

impl CacheMetrics {
    pub fn new() -> Self {
        Self
    }

    /// Register metrics with a Prometheus registry
    pub fn register(registry: &Registry) -> Result<(), prometheus::Error> {
        get_metrics().register(registry)
    }

    pub fn record_hit(&self, key: &str) {
        get_metrics()
            .hits
            .with_label_values(&[namespace(key)])
            .inc();
    }

    pub fn record_miss(&self, key: &str) {
        get_metrics()
            .misses
            .with_label_values(&[namespace(key)])
            .inc();
    }

    pub fn record_write(&self, key: &str) {
        get_metrics()
            .writes
            .with_label_values(&[namespace(key)])
            .inc();
    }

    pub fn record_invalidations(&self, key_or_pattern: &str, count: usize) {
        if count == 0 {
            return;
        }
        get_metrics()
            .invalidations
            .with_label_values(&[namespace(key_or_pattern)])
            .inc_by(count as f64);
    }

    pub fn record_error(&self, key: &str, error_type: &str) {
        get_metrics()
            .errors
            .with_label_values(&[namespace(key), error_type])
            .inc();
    }

    pub fn record_dedup_join(&self, cache: &str) {
        get_metrics()
            .pair_dedup_joins
            .with_label_values(&[cache])
            .inc();
    }
}

#[cfg(test)]
pub(crate) fn invalidation_count(namespace: &str) -> f64 {
    get_metrics()
        .invalidations
        .with_label_values(&[namespace])
        .get()
}

#[cfg(test)]
pub(crate) fn error_count(namespace: &str, error_type: &str) -> f64 {
    get_metrics()
        .errors
        .with_label_values(&[namespace, error_type])
        .get()
}
