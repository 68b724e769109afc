//! Aggregate telemetry report.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Point-in-time aggregate of recorded telemetry.
#[derive(Debug, Clone, PartialEq, Serialize, derive_getters::Getters)]
pub struct TelemetryReport {
    /// When the report was generated
    generated_at: DateTime<Utc>,
    /// Finished requests
    total_requests: u64,
    /// Requests that ended in success
    successful_requests: u64,
    /// Requests that ended in error
    failed_requests: u64,
    /// Requests started but not finished
    in_flight: u64,
    /// Mean end-to-end latency over all finished requests
    average_latency_ms: f64,
    /// Median latency over the recent window
    p50_latency_ms: u64,
    /// 95th percentile latency over the recent window
    p95_latency_ms: u64,
    /// 99th percentile latency over the recent window
    p99_latency_ms: u64,
    /// Attempts beyond the first, summed over requests
    total_retries: u64,
    /// Error events by coarse category
    error_histogram: BTreeMap<String, u64>,
    /// Result cache hits
    cache_hits: u64,
    /// Result cache misses
    cache_misses: u64,
}

impl TelemetryReport {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        total_requests: u64,
        successful_requests: u64,
        failed_requests: u64,
        in_flight: u64,
        average_latency_ms: f64,
        [p50_latency_ms, p95_latency_ms, p99_latency_ms]: [u64; 3],
        total_retries: u64,
        error_histogram: BTreeMap<String, u64>,
        cache_hits: u64,
        cache_misses: u64,
    ) -> Self {
        Self {
            generated_at: Utc::now(),
            total_requests,
            successful_requests,
            failed_requests,
            in_flight,
            average_latency_ms,
            p50_latency_ms,
            p95_latency_ms,
            p99_latency_ms,
            total_retries,
            error_histogram,
            cache_hits,
            cache_misses,
        }
    }

    /// Fraction of finished requests that succeeded (0 when none finished).
    pub fn success_rate(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.successful_requests as f64 / self.total_requests as f64
        }
    }

    /// Fraction of cache lookups that hit (0 when no lookups).
    pub fn cache_hit_rate(&self) -> f64 {
        let lookups = self.cache_hits + self.cache_misses;
        if lookups == 0 {
            0.0
        } else {
            self.cache_hits as f64 / lookups as f64
        }
    }
}
