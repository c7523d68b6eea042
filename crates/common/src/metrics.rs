//! Metrics collection for beacon.
//!
//! Counters for the outbound dispatch pipeline and directory access. They
//! are cheap relaxed atomics; [`Metrics::to_prometheus`] renders them for
//! the webhook server's `/metrics` route.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Global metrics instance.
static METRICS: std::sync::OnceLock<Arc<Metrics>> = std::sync::OnceLock::new();

/// Get the global metrics instance.
pub fn get_metrics() -> &'static Arc<Metrics> {
    METRICS.get_or_init(|| Arc::new(Metrics::new()))
}

/// Application metrics collector.
#[derive(Debug, Default)]
pub struct Metrics {
    // === Dispatch Metrics ===
    /// Tasks queued on the interactive lane
    pub interactive_enqueued: AtomicU64,
    /// Tasks queued on the bulk lane
    pub bulk_enqueued: AtomicU64,
    /// Tasks delivered successfully
    pub deliveries_succeeded: AtomicU64,
    /// Tasks whose delivery failed
    pub deliveries_failed: AtomicU64,
    /// Drain workers started
    pub workers_spawned: AtomicU64,

    // === Directory Metrics ===
    /// Failed directory attempts (each retry counts)
    pub directory_attempt_failures: AtomicU64,
    /// Directory operations that exhausted every attempt
    pub directory_exhausted: AtomicU64,

    // === Asset Metrics ===
    /// Sends that reused a cached asset reference
    pub asset_cache_hits: AtomicU64,
    /// Full asset uploads
    pub asset_uploads: AtomicU64,
}

/// Point-in-time copy of all counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct MetricsSnapshot {
    pub interactive_enqueued: u64,
    pub bulk_enqueued: u64,
    pub deliveries_succeeded: u64,
    pub deliveries_failed: u64,
    pub workers_spawned: u64,
    pub directory_attempt_failures: u64,
    pub directory_exhausted: u64,
    pub asset_cache_hits: u64,
    pub asset_uploads: u64,
}

impl Metrics {
    /// Create a new metrics instance with all counters at zero.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            interactive_enqueued: AtomicU64::new(0),
            bulk_enqueued: AtomicU64::new(0),
            deliveries_succeeded: AtomicU64::new(0),
            deliveries_failed: AtomicU64::new(0),
            workers_spawned: AtomicU64::new(0),
            directory_attempt_failures: AtomicU64::new(0),
            directory_exhausted: AtomicU64::new(0),
            asset_cache_hits: AtomicU64::new(0),
            asset_uploads: AtomicU64::new(0),
        }
    }

    /// Record a task entering a lane.
    pub fn record_enqueued(&self, interactive: bool) {
        if interactive {
            self.interactive_enqueued.fetch_add(1, Ordering::Relaxed);
        } else {
            self.bulk_enqueued.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record the outcome of one delivery.
    pub fn record_delivery(&self, success: bool) {
        if success {
            self.deliveries_succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.deliveries_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a worker start.
    pub fn record_worker_spawned(&self) {
        self.workers_spawned.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed directory attempt.
    pub fn record_directory_failure(&self, exhausted: bool) {
        self.directory_attempt_failures.fetch_add(1, Ordering::Relaxed);
        if exhausted {
            self.directory_exhausted.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record whether an animation send reused the cached reference.
    pub fn record_asset_access(&self, hit: bool) {
        if hit {
            self.asset_cache_hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.asset_uploads.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Get a snapshot of all metrics.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            interactive_enqueued: self.interactive_enqueued.load(Ordering::Relaxed),
            bulk_enqueued: self.bulk_enqueued.load(Ordering::Relaxed),
            deliveries_succeeded: self.deliveries_succeeded.load(Ordering::Relaxed),
            deliveries_failed: self.deliveries_failed.load(Ordering::Relaxed),
            workers_spawned: self.workers_spawned.load(Ordering::Relaxed),
            directory_attempt_failures: self.directory_attempt_failures.load(Ordering::Relaxed),
            directory_exhausted: self.directory_exhausted.load(Ordering::Relaxed),
            asset_cache_hits: self.asset_cache_hits.load(Ordering::Relaxed),
            asset_uploads: self.asset_uploads.load(Ordering::Relaxed),
        }
    }

    /// Export metrics in Prometheus format.
    #[must_use]
    pub fn to_prometheus(&self) -> String {
        let s = self.snapshot();
        let counters = [
            ("beacon_dispatch_enqueued_total{lane=\"interactive\"}", s.interactive_enqueued),
            ("beacon_dispatch_enqueued_total{lane=\"bulk\"}", s.bulk_enqueued),
            ("beacon_deliveries_total{result=\"success\"}", s.deliveries_succeeded),
            ("beacon_deliveries_total{result=\"failure\"}", s.deliveries_failed),
            ("beacon_workers_spawned_total", s.workers_spawned),
            ("beacon_directory_attempt_failures_total", s.directory_attempt_failures),
            ("beacon_directory_exhausted_total", s.directory_exhausted),
            ("beacon_asset_cache_hits_total", s.asset_cache_hits),
            ("beacon_asset_uploads_total", s.asset_uploads),
        ];

        let mut output = String::new();
        for (name, value) in counters {
            output.push_str(name);
            output.push(' ');
            output.push_str(&value.to_string());
            output.push('\n');
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delivery_counters() {
        let metrics = Metrics::new();
        metrics.record_enqueued(true);
        metrics.record_enqueued(false);
        metrics.record_enqueued(false);
        metrics.record_delivery(true);
        metrics.record_delivery(false);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.interactive_enqueued, 1);
        assert_eq!(snapshot.bulk_enqueued, 2);
        assert_eq!(snapshot.deliveries_succeeded, 1);
        assert_eq!(snapshot.deliveries_failed, 1);
    }

    #[test]
    fn test_directory_exhaustion_counts_attempt_too() {
        let metrics = Metrics::new();
        metrics.record_directory_failure(false);
        metrics.record_directory_failure(true);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.directory_attempt_failures, 2);
        assert_eq!(snapshot.directory_exhausted, 1);
    }

    #[test]
    fn test_prometheus_output() {
        let metrics = Metrics::new();
        metrics.record_asset_access(false);

        let output = metrics.to_prometheus();
        assert!(output.contains("beacon_asset_uploads_total 1\n"));
        assert!(output.contains("beacon_deliveries_total{result=\"failure\"} 0\n"));
    }
}
