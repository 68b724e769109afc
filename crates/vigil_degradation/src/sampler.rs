//! Device resource sampling.

use parking_lot::Mutex;
use serde::Serialize;
use sysinfo::{CpuRefreshKind, MemoryRefreshKind, RefreshKind, System};
use tracing::trace;

/// One reading of device resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, derive_getters::Getters)]
pub struct ResourceSnapshot {
    /// Installed memory
    total_memory_bytes: u64,
    /// Memory available to new allocations
    available_memory_bytes: u64,
    /// Logical CPU cores
    cpu_cores: usize,
    /// Whether the network is believed reachable
    network_available: bool,
}

impl ResourceSnapshot {
    /// Create a snapshot from raw readings.
    pub fn new(
        total_memory_bytes: u64,
        available_memory_bytes: u64,
        cpu_cores: usize,
        network_available: bool,
    ) -> Self {
        Self {
            total_memory_bytes,
            available_memory_bytes: available_memory_bytes.min(total_memory_bytes),
            cpu_cores,
            network_available,
        }
    }

    /// Fraction of memory still available, in `[0, 1]`.
    pub fn available_ratio(&self) -> f64 {
        if self.total_memory_bytes == 0 {
            0.0
        } else {
            self.available_memory_bytes as f64 / self.total_memory_bytes as f64
        }
    }

    /// Whether available memory is below `threshold` of the total.
    pub fn under_memory_pressure(&self, threshold: f64) -> bool {
        self.available_ratio() < threshold
    }
}

/// Source of resource snapshots.
///
/// Sampling may block on OS calls; async callers should run it on a
/// blocking thread.
pub trait ResourceSampler: Send + Sync {
    /// Take a fresh reading.
    fn sample(&self) -> ResourceSnapshot;
}

/// Samples the host through `sysinfo`.
pub struct SystemSampler {
    system: Mutex<System>,
}

impl std::fmt::Debug for SystemSampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemSampler").finish_non_exhaustive()
    }
}

impl Default for SystemSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemSampler {
    /// Create a sampler tracking memory and CPU count.
    pub fn new() -> Self {
        let system = System::new_with_specifics(
            RefreshKind::new()
                .with_memory(MemoryRefreshKind::everything())
                .with_cpu(CpuRefreshKind::new()),
        );
        Self {
            system: Mutex::new(system),
        }
    }
}

impl ResourceSampler for SystemSampler {
    fn sample(&self) -> ResourceSnapshot {
        let mut system = self.system.lock();
        system.refresh_memory();
        let cores = match system.cpus().len() {
            0 => std::thread::available_parallelism().map_or(1, |n| n.get()),
            n => n,
        };
        let snapshot = ResourceSnapshot::new(
            system.total_memory(),
            system.available_memory(),
            cores,
            true,
        );
        trace!(
            total = snapshot.total_memory_bytes,
            available = snapshot.available_memory_bytes,
            cores,
            "Sampled system resources"
        );
        snapshot
    }
}

/// Returns a fixed, replaceable snapshot. Useful for embedding applications
/// that measure resources themselves, and for tests.
#[derive(Debug)]
pub struct StaticSampler {
    snapshot: Mutex<ResourceSnapshot>,
}

impl StaticSampler {
    /// Create a sampler returning `snapshot`.
    pub fn new(snapshot: ResourceSnapshot) -> Self {
        Self {
            snapshot: Mutex::new(snapshot),
        }
    }

    /// Replace the snapshot returned by later samples.
    pub fn set(&self, snapshot: ResourceSnapshot) {
        *self.snapshot.lock() = snapshot;
    }
}

impl ResourceSampler for StaticSampler {
    fn sample(&self) -> ResourceSnapshot {
        *self.snapshot.lock()
    }
}
