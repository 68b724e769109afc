//! Telemetry recorder for the vigil generation layer.
//!
//! Records per-request timing, outcome and error taxonomy, and aggregates
//! them into a [`TelemetryReport`]. With the `metrics` feature every event is
//! mirrored into OpenTelemetry instruments.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

#[cfg(feature = "metrics")]
mod otel;
mod recorder;
mod report;

#[cfg(feature = "metrics")]
pub use otel::OtelInstruments;
pub use recorder::{RequestMetrics, RequestTimer, TelemetryRecorder};
pub use report::TelemetryReport;
