//! Hit/miss counters and latency samples for the read path

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};

/// Lock-free counters shared across request handlers.
///
/// Latency is accumulated as a running sum of hit-read durations in
/// microseconds; the average is derived on demand. `last_cleanup_millis`
/// holds 0 until the first sweep completes.
pub struct MetricsCollector {
    hits: AtomicU64,
    misses: AtomicU64,
    hit_latency_micros: AtomicU64,
    last_cleanup_millis: AtomicI64,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            hit_latency_micros: AtomicU64::new(0),
            last_cleanup_millis: AtomicI64::new(0),
        }
    }

    pub fn record_hit(&self, latency: Duration) {
        self.hits.fetch_add(1, Ordering::Relaxed);
        self.hit_latency_micros
            .fetch_add(latency.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn mark_cleanup(&self, when: DateTime<Utc>) {
        self.last_cleanup_millis
            .store(when.timestamp_millis(), Ordering::Relaxed);
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Fraction of reads served from cache; 0 before any access
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits();
        let total = hits + self.misses();
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }

    /// Average observed latency of a cache hit, in milliseconds
    pub fn avg_hit_latency_ms(&self) -> f64 {
        let hits = self.hits();
        if hits == 0 {
            return 0.0;
        }
        self.hit_latency_micros.load(Ordering::Relaxed) as f64 / hits as f64 / 1000.0
    }

    /// Estimated total time saved by serving hits locally instead of calling
    /// upstream, given a fixed upstream latency assumption. Floored at zero
    /// in case local reads somehow exceed the assumption.
    pub fn estimated_time_saved_ms(&self, assumed_upstream_latency_ms: u64) -> f64 {
        let saved_per_hit = assumed_upstream_latency_ms as f64 - self.avg_hit_latency_ms();
        (self.hits() as f64 * saved_per_hit).max(0.0)
    }

    pub fn last_cleanup(&self) -> Option<DateTime<Utc>> {
        let millis = self.last_cleanup_millis.load(Ordering::Relaxed);
        if millis == 0 {
            return None;
        }
        DateTime::from_timestamp_millis(millis)
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}
