//! Prometheus metrics for cache traffic.

use metrics::{counter, describe_counter};

/// Metric names for the cache layer.
pub mod names {
    /// Reads answered from the cache.
    pub const CACHE_HITS_TOTAL: &str = "roster_cache_hits_total";
    /// Reads that fell through to the store.
    pub const CACHE_MISSES_TOTAL: &str = "roster_cache_misses_total";
    /// Cache operations that failed and were swallowed.
    pub const CACHE_ERRORS_TOTAL: &str = "roster_cache_errors_total";
    /// Successful seeds and invalidations.
    pub const CACHE_WRITES_TOTAL: &str = "roster_cache_writes_total";
}

/// Register all metric descriptions.
pub fn register_metrics() {
    describe_counter!(names::CACHE_HITS_TOTAL, "Total number of reads served from the cache");
    describe_counter!(
        names::CACHE_MISSES_TOTAL,
        "Total number of reads that fell through to the store"
    );
    describe_counter!(
        names::CACHE_ERRORS_TOTAL,
        "Total number of cache operations that failed and were ignored"
    );
    describe_counter!(
        names::CACHE_WRITES_TOTAL,
        "Total number of successful cache seeds and invalidations"
    );
}

/// Cache metrics recorder.
#[derive(Clone, Copy, Debug)]
pub struct CacheMetrics;

impl CacheMetrics {
    /// Record a read served from the cache.
    pub fn hit(family: &'static str) {
        counter!(names::CACHE_HITS_TOTAL, "family" => family).increment(1);
    }

    /// Record a read that missed.
    pub fn miss(family: &'static str) {
        counter!(names::CACHE_MISSES_TOTAL, "family" => family).increment(1);
    }

    /// Record a swallowed failure for `op` (`get`, `decode`, `set`, `delete`).
    pub fn error(op: &'static str) {
        counter!(names::CACHE_ERRORS_TOTAL, "op" => op).increment(1);
    }

    /// Record a successful write for `op` (`set`, `delete`).
    pub fn write(op: &'static str) {
        counter!(names::CACHE_WRITES_TOTAL, "op" => op).increment(1);
    }
}
