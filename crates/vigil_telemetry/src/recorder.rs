//! The telemetry recorder.

use crate::TelemetryReport;
use parking_lot::Mutex;
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, instrument};
use uuid::Uuid;

/// Number of recent requests kept for percentile computation.
const DEFAULT_WINDOW: usize = 1000;

/// Handle for a request that has entered the scheduled state.
///
/// Returned by [`TelemetryRecorder::start_request`] and consumed by one of the
/// `finish_*` methods.
#[derive(Debug)]
pub struct RequestTimer {
    id: Uuid,
    started: Instant,
}

impl RequestTimer {
    /// Identifier assigned to the request.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Time since the request started.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

/// Metrics for one finished request.
#[derive(Debug, Clone, PartialEq, derive_getters::Getters)]
pub struct RequestMetrics {
    /// Request identifier
    request_id: Uuid,
    /// End-to-end latency
    latency: Duration,
    /// Whether the request ended in success
    success: bool,
    /// Coarse error category for failed requests
    error_category: Option<String>,
    /// Attempts beyond the first
    retry_count: u32,
    /// Whether the result came from the cache
    from_cache: bool,
}

#[derive(Debug, Default)]
struct RecorderState {
    total: u64,
    successes: u64,
    failures: u64,
    retries: u64,
    latency_sum: Duration,
    cache_hits: u64,
    cache_misses: u64,
    errors: BTreeMap<String, u64>,
    recent: VecDeque<RequestMetrics>,
}

/// Thread-safe telemetry recorder.
///
/// One instance is shared by every component through the orchestrator's
/// context; tests construct fresh instances.
#[derive(Debug)]
pub struct TelemetryRecorder {
    state: Mutex<RecorderState>,
    in_flight: AtomicU64,
    window: usize,
    #[cfg(feature = "metrics")]
    otel: Option<crate::OtelInstruments>,
}

impl Default for TelemetryRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetryRecorder {
    /// Create a recorder with the default percentile window.
    pub fn new() -> Self {
        Self::with_window(DEFAULT_WINDOW)
    }

    /// Create a recorder that keeps the last `window` requests for percentiles.
    pub fn with_window(window: usize) -> Self {
        Self {
            state: Mutex::new(RecorderState::default()),
            in_flight: AtomicU64::new(0),
            window: window.max(1),
            #[cfg(feature = "metrics")]
            otel: None,
        }
    }

    /// Mirror events into OpenTelemetry instruments.
    #[cfg(feature = "metrics")]
    pub fn with_otel(mut self, instruments: crate::OtelInstruments) -> Self {
        self.otel = Some(instruments);
        self
    }

    /// Record that a request was scheduled.
    #[instrument(skip(self))]
    pub fn start_request(&self) -> RequestTimer {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let timer = RequestTimer {
            id: Uuid::new_v4(),
            started: Instant::now(),
        };
        debug!(request_id = %timer.id, "Request started");
        timer
    }

    /// Record a request that ended in success.
    pub fn finish_success(&self, timer: RequestTimer, retry_count: u32, from_cache: bool) {
        self.finish(timer, None, retry_count, from_cache);
    }

    /// Record a request that ended in failure.
    pub fn finish_failure(&self, timer: RequestTimer, category: &str, retry_count: u32) {
        self.finish(timer, Some(category.to_string()), retry_count, false);
    }

    fn finish(
        &self,
        timer: RequestTimer,
        error_category: Option<String>,
        retry_count: u32,
        from_cache: bool,
    ) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        let metrics = RequestMetrics {
            request_id: timer.id,
            latency: timer.started.elapsed(),
            success: error_category.is_none(),
            error_category,
            retry_count,
            from_cache,
        };
        debug!(
            request_id = %metrics.request_id,
            latency_ms = metrics.latency.as_millis() as u64,
            success = metrics.success,
            retry_count,
            from_cache,
            "Request finished"
        );

        #[cfg(feature = "metrics")]
        if let Some(otel) = &self.otel {
            otel.record_request(&metrics);
        }

        let mut state = self.state.lock();
        state.total += 1;
        if metrics.success {
            state.successes += 1;
        } else {
            state.failures += 1;
        }
        state.retries += u64::from(retry_count);
        state.latency_sum += metrics.latency;
        state.recent.push_back(metrics);
        while state.recent.len() > self.window {
            state.recent.pop_front();
        }
    }

    /// Record one error event, whether or not it was retried.
    pub fn record_error(&self, category: &str) {
        debug!(category, "Error recorded");
        #[cfg(feature = "metrics")]
        if let Some(otel) = &self.otel {
            otel.record_error(category);
        }
        let mut state = self.state.lock();
        *state.errors.entry(category.to_string()).or_insert(0) += 1;
    }

    /// Record a result cache hit.
    pub fn record_cache_hit(&self) {
        #[cfg(feature = "metrics")]
        if let Some(otel) = &self.otel {
            otel.record_cache(true);
        }
        self.state.lock().cache_hits += 1;
    }

    /// Record a result cache miss.
    pub fn record_cache_miss(&self) {
        #[cfg(feature = "metrics")]
        if let Some(otel) = &self.otel {
            otel.record_cache(false);
        }
        self.state.lock().cache_misses += 1;
    }

    /// Requests started but not yet finished.
    pub fn in_flight(&self) -> u64 {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Recent request metrics, oldest first.
    pub fn recent(&self) -> Vec<RequestMetrics> {
        self.state.lock().recent.iter().cloned().collect()
    }

    /// Aggregate everything recorded so far.
    pub fn report(&self) -> TelemetryReport {
        let state = self.state.lock();
        let mut latencies: Vec<u64> = state
            .recent
            .iter()
            .map(|m| m.latency.as_millis() as u64)
            .collect();
        latencies.sort_unstable();

        let average_latency_ms = if state.total == 0 {
            0.0
        } else {
            state.latency_sum.as_secs_f64() * 1000.0 / state.total as f64
        };

        TelemetryReport::new(
            state.total,
            state.successes,
            state.failures,
            self.in_flight(),
            average_latency_ms,
            [
                percentile(&latencies, 50.0),
                percentile(&latencies, 95.0),
                percentile(&latencies, 99.0),
            ],
            state.retries,
            state.errors.clone(),
            state.cache_hits,
            state.cache_misses,
        )
    }

    /// Forget everything recorded so far. In-flight requests are unaffected.
    pub fn reset(&self) {
        *self.state.lock() = RecorderState::default();
    }
}

/// Nearest-rank percentile over sorted values.
fn percentile(sorted: &[u64], pct: f64) -> u64 {
    if sorted.is_empty() {
        return 0;
    }
    let rank = ((pct / 100.0) * sorted.len() as f64).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentile_nearest_rank() {
        let values: Vec<u64> = (1..=100).collect();
        assert_eq!(percentile(&values, 50.0), 50);
        assert_eq!(percentile(&values, 95.0), 95);
        assert_eq!(percentile(&values, 99.0), 99);
        assert_eq!(percentile(&[], 50.0), 0);
        assert_eq!(percentile(&[7], 99.0), 7);
    }

    #[test]
    fn test_success_and_failure_counts() {
        let recorder = TelemetryRecorder::new();
        let a = recorder.start_request();
        let b = recorder.start_request();
        assert_eq!(recorder.in_flight(), 2);

        recorder.finish_success(a, 1, false);
        recorder.record_error("transport");
        recorder.finish_failure(b, "transport", 2);

        let report = recorder.report();
        assert_eq!(*report.total_requests(), 2);
        assert_eq!(*report.successful_requests(), 1);
        assert_eq!(*report.failed_requests(), 1);
        assert_eq!(*report.in_flight(), 0);
        assert_eq!(*report.total_retries(), 3);
        assert_eq!(report.error_histogram().get("transport"), Some(&1));
        assert!((report.success_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_cache_hit_rate() {
        let recorder = TelemetryRecorder::new();
        recorder.record_cache_hit();
        recorder.record_cache_miss();
        recorder.record_cache_miss();
        recorder.record_cache_miss();
        let report = recorder.report();
        assert!((report.cache_hit_rate() - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn test_window_is_bounded() {
        let recorder = TelemetryRecorder::with_window(3);
        for _ in 0..5 {
            let timer = recorder.start_request();
            recorder.finish_success(timer, 0, false);
        }
        assert_eq!(recorder.recent().len(), 3);
        assert_eq!(*recorder.report().total_requests(), 5);
    }

    #[test]
    fn test_reset_clears_counters() {
        let recorder = TelemetryRecorder::new();
        recorder.record_error("auth");
        recorder.reset();
        assert!(recorder.report().error_histogram().is_empty());
    }
}
