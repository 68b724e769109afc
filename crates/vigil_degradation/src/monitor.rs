//! Capability profile derived from resource samples.

use crate::{ResourceSampler, ResourceSnapshot};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

const GIB: u64 = 1024 * 1024 * 1024;
const MIB: usize = 1024 * 1024;

/// Default ratio of available to total memory below which the device is
/// under memory pressure.
pub const DEFAULT_PRESSURE_RATIO: f64 = 0.15;

/// Coarse device class.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, strum::Display,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum PerformanceTier {
    /// Under 4 GiB of memory or fewer than 4 cores.
    LowEnd,
    /// Everything between the other two tiers.
    MidRange,
    /// At least 8 GiB of memory and 8 cores.
    HighEnd,
}

impl PerformanceTier {
    /// Classify a snapshot.
    pub fn classify(snapshot: &ResourceSnapshot) -> Self {
        let total = *snapshot.total_memory_bytes();
        let cores = *snapshot.cpu_cores();
        if total < 4 * GIB || cores < 4 {
            PerformanceTier::LowEnd
        } else if total >= 8 * GIB && cores >= 8 {
            PerformanceTier::HighEnd
        } else {
            PerformanceTier::MidRange
        }
    }

    /// JPEG-equivalent encode quality suited to the tier.
    pub fn recommended_quality(self) -> u8 {
        match self {
            PerformanceTier::LowEnd => 70,
            PerformanceTier::MidRange => 85,
            PerformanceTier::HighEnd => 95,
        }
    }

    /// Result cache bound suited to the tier.
    pub fn recommended_cache_bytes(self) -> usize {
        match self {
            PerformanceTier::LowEnd => 32 * MIB,
            PerformanceTier::MidRange => 64 * MIB,
            PerformanceTier::HighEnd => 128 * MIB,
        }
    }

    /// Concurrent generation requests suited to the tier.
    pub fn recommended_concurrency(self) -> usize {
        match self {
            PerformanceTier::LowEnd => 1,
            PerformanceTier::MidRange => 2,
            PerformanceTier::HighEnd => 4,
        }
    }

    /// Longest input-image side suited to the tier.
    pub fn recommended_max_resolution(self) -> u32 {
        match self {
            PerformanceTier::LowEnd => 1024,
            PerformanceTier::MidRange => 1536,
            PerformanceTier::HighEnd => 2048,
        }
    }
}

/// Capability profile of the device at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, derive_getters::Getters)]
pub struct DeviceCapabilities {
    /// Device class
    tier: PerformanceTier,
    /// Installed memory
    total_memory_bytes: u64,
    /// Memory available at sampling time
    available_memory_bytes: u64,
    /// Logical CPU cores
    cpu_cores: usize,
    /// Whether the network was believed reachable
    network_available: bool,
    /// Whether available memory was below the pressure ratio
    memory_pressure: bool,
    /// Suggested encode quality
    recommended_quality: u8,
    /// Suggested result cache bound
    recommended_cache_bytes: usize,
    /// Suggested concurrency cap
    recommended_concurrency: usize,
    /// Suggested longest image side
    recommended_max_resolution: u32,
}

impl DeviceCapabilities {
    /// Derive capabilities from a snapshot.
    pub fn from_snapshot(snapshot: &ResourceSnapshot, pressure_ratio: f64) -> Self {
        let tier = PerformanceTier::classify(snapshot);
        let memory_pressure = snapshot.under_memory_pressure(pressure_ratio);
        // Under pressure, recommend the next tier down.
        let effective = if memory_pressure {
            match tier {
                PerformanceTier::HighEnd => PerformanceTier::MidRange,
                _ => PerformanceTier::LowEnd,
            }
        } else {
            tier
        };
        Self {
            tier,
            total_memory_bytes: *snapshot.total_memory_bytes(),
            available_memory_bytes: *snapshot.available_memory_bytes(),
            cpu_cores: *snapshot.cpu_cores(),
            network_available: *snapshot.network_available(),
            memory_pressure,
            recommended_quality: effective.recommended_quality(),
            recommended_cache_bytes: effective.recommended_cache_bytes(),
            recommended_concurrency: effective.recommended_concurrency(),
            recommended_max_resolution: effective.recommended_max_resolution(),
        }
    }

    /// Whether the device is in the low-end tier.
    pub fn is_low_end(&self) -> bool {
        self.tier == PerformanceTier::LowEnd
    }
}

/// Samples resources and derives capabilities.
///
/// Capabilities are recomputed on every call; nothing is cached between calls.
#[derive(Clone)]
pub struct ResourceMonitor {
    sampler: Arc<dyn ResourceSampler>,
    pressure_ratio: f64,
}

impl std::fmt::Debug for ResourceMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceMonitor")
            .field("pressure_ratio", &self.pressure_ratio)
            .finish_non_exhaustive()
    }
}

impl ResourceMonitor {
    /// Create a monitor over `sampler` with the default pressure ratio.
    pub fn new(sampler: Arc<dyn ResourceSampler>) -> Self {
        Self {
            sampler,
            pressure_ratio: DEFAULT_PRESSURE_RATIO,
        }
    }

    /// Override the memory pressure ratio.
    pub fn with_pressure_ratio(mut self, ratio: f64) -> Self {
        self.pressure_ratio = ratio.clamp(0.0, 1.0);
        self
    }

    /// Memory pressure ratio in use.
    pub fn pressure_ratio(&self) -> f64 {
        self.pressure_ratio
    }

    /// Take a raw sample on the current thread.
    pub fn sample(&self) -> ResourceSnapshot {
        self.sampler.sample()
    }

    /// Sample and derive capabilities on the current thread.
    pub fn capabilities(&self) -> DeviceCapabilities {
        DeviceCapabilities::from_snapshot(&self.sample(), self.pressure_ratio)
    }

    /// Sample on a blocking thread so OS calls never stall the runtime.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> (ResourceSnapshot, DeviceCapabilities) {
        let sampler = Arc::clone(&self.sampler);
        let snapshot = match tokio::task::spawn_blocking(move || sampler.sample()).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "Resource sampling task failed, sampling inline");
                self.sampler.sample()
            }
        };
        let capabilities = DeviceCapabilities::from_snapshot(&snapshot, self.pressure_ratio);
        debug!(
            tier = %capabilities.tier,
            memory_pressure = capabilities.memory_pressure,
            "Device capabilities refreshed"
        );
        (snapshot, capabilities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(total_gib: u64, available_gib: u64, cores: usize) -> ResourceSnapshot {
        ResourceSnapshot::new(total_gib * GIB, available_gib * GIB, cores, true)
    }

    #[test]
    fn test_tier_classification() {
        assert_eq!(PerformanceTier::classify(&snapshot(2, 1, 8)), PerformanceTier::LowEnd);
        assert_eq!(PerformanceTier::classify(&snapshot(16, 8, 2)), PerformanceTier::LowEnd);
        assert_eq!(PerformanceTier::classify(&snapshot(6, 3, 6)), PerformanceTier::MidRange);
        assert_eq!(PerformanceTier::classify(&snapshot(8, 4, 4)), PerformanceTier::MidRange);
        assert_eq!(PerformanceTier::classify(&snapshot(8, 4, 8)), PerformanceTier::HighEnd);
    }

    #[test]
    fn test_recommendations_follow_tier() {
        let caps = DeviceCapabilities::from_snapshot(&snapshot(16, 8, 8), DEFAULT_PRESSURE_RATIO);
        assert_eq!(*caps.recommended_quality(), 95);
        assert_eq!(*caps.recommended_concurrency(), 4);
        assert_eq!(*caps.recommended_cache_bytes(), 128 * MIB);
        assert!(!caps.memory_pressure());
    }

    #[test]
    fn test_memory_pressure_lowers_recommendations() {
        let caps = DeviceCapabilities::from_snapshot(&snapshot(16, 1, 8), DEFAULT_PRESSURE_RATIO);
        assert_eq!(*caps.tier(), PerformanceTier::HighEnd);
        assert!(*caps.memory_pressure());
        assert_eq!(*caps.recommended_concurrency(), 2);
    }
}
