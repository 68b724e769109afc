//! OpenTelemetry instruments mirroring the recorder.
//!
//! Available with the `metrics` feature.

use crate::RequestMetrics;
use opentelemetry::{
    KeyValue, global,
    metrics::{Counter, Histogram, Meter},
};
use tracing::debug;

/// Counters and histograms fed by [`TelemetryRecorder`](crate::TelemetryRecorder).
#[derive(Clone)]
pub struct OtelInstruments {
    /// Meter handle kept alive for metric instruments
    _meter: Meter,
    /// Finished requests
    pub requests: Counter<u64>,
    /// Failed requests
    pub failures: Counter<u64>,
    /// End-to-end latency in seconds
    pub latency: Histogram<f64>,
    /// Attempts beyond the first
    pub retries: Counter<u64>,
    /// Error events by category
    pub errors: Counter<u64>,
    /// Cache hits
    pub cache_hits: Counter<u64>,
    /// Cache misses
    pub cache_misses: Counter<u64>,
}

impl std::fmt::Debug for OtelInstruments {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OtelInstruments").finish_non_exhaustive()
    }
}

impl OtelInstruments {
    /// Create instruments on the global meter provider.
    pub fn new() -> Self {
        debug!("Building vigil metrics instruments");
        let meter = global::meter("vigil");
        Self {
            _meter: meter.clone(),
            requests: meter
                .u64_counter("vigil.requests")
                .with_description("Finished generation requests")
                .build(),
            failures: meter
                .u64_counter("vigil.failures")
                .with_description("Generation requests that ended in error")
                .build(),
            latency: meter
                .f64_histogram("vigil.latency")
                .with_unit("seconds")
                .with_description("End-to-end request latency")
                .build(),
            retries: meter
                .u64_counter("vigil.retries")
                .with_description("Attempts beyond the first")
                .build(),
            errors: meter
                .u64_counter("vigil.errors")
                .with_description("Error events by category")
                .build(),
            cache_hits: meter
                .u64_counter("vigil.cache.hits")
                .with_description("Result cache hits")
                .build(),
            cache_misses: meter
                .u64_counter("vigil.cache.misses")
                .with_description("Result cache misses")
                .build(),
        }
    }

    pub(crate) fn record_request(&self, metrics: &RequestMetrics) {
        let labels = &[
            KeyValue::new("success", *metrics.success()),
            KeyValue::new("from_cache", *metrics.from_cache()),
        ];
        self.requests.add(1, labels);
        if !metrics.success() {
            self.failures.add(1, labels);
        }
        self.latency.record(metrics.latency().as_secs_f64(), labels);
        self.retries.add(u64::from(*metrics.retry_count()), &[]);
    }

    pub(crate) fn record_error(&self, category: &str) {
        self.errors
            .add(1, &[KeyValue::new("category", category.to_string())]);
    }

    pub(crate) fn record_cache(&self, hit: bool) {
        if hit {
            self.cache_hits.add(1, &[]);
        } else {
            self.cache_misses.add(1, &[]);
        }
    }
}

impl Default for OtelInstruments {
    fn default() -> Self {
        Self::new()
    }
}
