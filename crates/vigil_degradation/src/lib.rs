//! Resource monitoring and graceful degradation.
//!
//! [`ResourceMonitor`] turns device samples into [`DeviceCapabilities`].
//! [`DegradationController`] folds API outcomes and memory signals into a
//! [`DegradationMode`], each mode mapping to a fixed [`FeatureConfig`].

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod controller;
mod mode;
mod monitor;
mod sampler;

pub use controller::{DegradationController, DegradationSignals};
pub use mode::{DegradationMode, FeatureConfig};
pub use monitor::{DEFAULT_PRESSURE_RATIO, DeviceCapabilities, PerformanceTier, ResourceMonitor};
pub use sampler::{ResourceSampler, ResourceSnapshot, StaticSampler, SystemSampler};
