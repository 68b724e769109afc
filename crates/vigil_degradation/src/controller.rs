//! Degradation state machine.

use crate::monitor::DEFAULT_PRESSURE_RATIO;
use crate::{DegradationMode, DeviceCapabilities, FeatureConfig, PerformanceTier, ResourceSnapshot};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, instrument};
use vigil_error::RetryableError;

/// Counters and flags the mode is computed from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DegradationSignals {
    /// Remote failures not yet offset by successes
    pub consecutive_failures: u32,
    /// Memory warnings since the last recovery
    pub consecutive_memory_warnings: u32,
    /// Whether the device is currently under memory pressure
    pub memory_pressure: bool,
    /// Whether the device is in the low-end tier
    pub low_end_device: bool,
    /// Whether the last remote failure was a rate limit
    pub rate_limited: bool,
}

impl DegradationSignals {
    /// Mode implied by the signals. First matching rule wins.
    pub fn evaluate(&self) -> DegradationMode {
        let computed = if (self.memory_pressure && self.consecutive_memory_warnings >= 3)
            || self.consecutive_failures >= 5
        {
            DegradationMode::Emergency
        } else if (self.memory_pressure && self.consecutive_memory_warnings >= 2)
            || self.consecutive_failures >= 3
        {
            DegradationMode::Minimal
        } else if self.memory_pressure || self.low_end_device || self.consecutive_failures >= 1 {
            DegradationMode::Reduced
        } else {
            DegradationMode::Normal
        };

        if self.rate_limited {
            computed.max(DegradationMode::Reduced)
        } else {
            computed
        }
    }
}

#[derive(Debug, Default)]
struct ControllerState {
    signals: DegradationSignals,
    override_mode: Option<DegradationMode>,
}

impl ControllerState {
    fn mode(&self) -> DegradationMode {
        self.override_mode.unwrap_or_else(|| self.signals.evaluate())
    }
}

/// Level-triggered degradation controller.
///
/// Every signal updates the counters and recomputes the mode from scratch.
/// Mode changes are published on a watch channel.
#[derive(Debug)]
pub struct DegradationController {
    state: Mutex<ControllerState>,
    mode_tx: watch::Sender<DegradationMode>,
    pressure_ratio: f64,
}

impl Default for DegradationController {
    fn default() -> Self {
        Self::new()
    }
}

impl DegradationController {
    /// Create a controller in `Normal` mode.
    pub fn new() -> Self {
        let (mode_tx, _) = watch::channel(DegradationMode::Normal);
        Self {
            state: Mutex::new(ControllerState::default()),
            mode_tx,
            pressure_ratio: DEFAULT_PRESSURE_RATIO,
        }
    }

    /// Use `ratio` when [`observe`](Self::observe) decides memory pressure.
    pub fn with_pressure_ratio(mut self, ratio: f64) -> Self {
        self.pressure_ratio = ratio.clamp(0.0, 1.0);
        self
    }

    /// Current mode.
    pub fn mode(&self) -> DegradationMode {
        *self.mode_tx.borrow()
    }

    /// Feature configuration of the current mode.
    pub fn feature_config(&self) -> FeatureConfig {
        self.mode().feature_config()
    }

    /// Current counters.
    pub fn signals(&self) -> DegradationSignals {
        self.state.lock().signals
    }

    /// Subscribe to mode changes.
    pub fn subscribe(&self) -> watch::Receiver<DegradationMode> {
        self.mode_tx.subscribe()
    }

    /// A remote call succeeded.
    pub fn record_api_success(&self) {
        self.update("api_success", |s| {
            s.consecutive_failures = s.consecutive_failures.saturating_sub(1);
            s.rate_limited = false;
        });
    }

    /// A remote call failed.
    pub fn record_api_failure<E: RetryableError + ?Sized>(&self, error: &E) {
        let rate_limited = error.is_rate_limit();
        self.update("api_failure", |s| {
            s.consecutive_failures = s.consecutive_failures.saturating_add(1);
            if rate_limited {
                s.rate_limited = true;
            }
        });
    }

    /// The device reported low memory.
    pub fn record_memory_warning(&self) {
        self.update("memory_warning", |s| {
            s.memory_pressure = true;
            s.consecutive_memory_warnings = s.consecutive_memory_warnings.saturating_add(1);
        });
    }

    /// The device recovered from low memory.
    pub fn record_memory_recovery(&self) {
        self.update("memory_recovery", |s| {
            s.memory_pressure = false;
            s.consecutive_memory_warnings = 0;
        });
    }

    /// Mark the device as low-end or not.
    pub fn set_low_end_device(&self, low_end: bool) {
        self.update("device_tier", |s| s.low_end_device = low_end);
    }

    /// Translate a resource sample into memory and tier signals.
    ///
    /// A sample under pressure counts as a memory warning; a sample without
    /// pressure after a warning counts as a recovery.
    pub fn observe(&self, snapshot: &ResourceSnapshot) {
        let pressure = snapshot.under_memory_pressure(self.pressure_ratio);
        let low_end = PerformanceTier::classify(snapshot) == PerformanceTier::LowEnd;
        self.update("observe", |s| {
            s.low_end_device = low_end;
            if pressure {
                s.memory_pressure = true;
                s.consecutive_memory_warnings = s.consecutive_memory_warnings.saturating_add(1);
            } else if s.memory_pressure || s.consecutive_memory_warnings > 0 {
                s.memory_pressure = false;
                s.consecutive_memory_warnings = 0;
            }
        });
    }

    /// Apply tier and pressure from already derived capabilities.
    pub fn observe_capabilities(&self, capabilities: &DeviceCapabilities) {
        let pressure = *capabilities.memory_pressure();
        let low_end = capabilities.is_low_end();
        self.update("observe", |s| {
            s.low_end_device = low_end;
            if pressure {
                s.memory_pressure = true;
                s.consecutive_memory_warnings = s.consecutive_memory_warnings.saturating_add(1);
            } else {
                s.memory_pressure = false;
                s.consecutive_memory_warnings = 0;
            }
        });
    }

    /// Pin the mode until [`clear_override`](Self::clear_override).
    #[instrument(skip(self))]
    pub fn set_mode(&self, mode: DegradationMode) {
        info!(%mode, "Degradation mode overridden");
        let mut state = self.state.lock();
        state.override_mode = Some(mode);
        self.publish(state.mode(), "override");
    }

    /// Return to the computed mode.
    pub fn clear_override(&self) {
        let mut state = self.state.lock();
        state.override_mode = None;
        self.publish(state.mode(), "clear_override");
    }

    /// Whether a manual override is active.
    pub fn is_overridden(&self) -> bool {
        self.state.lock().override_mode.is_some()
    }

    /// Forget all counters and any override.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        *state = ControllerState::default();
        self.publish(state.mode(), "reset");
    }

    fn update(&self, signal: &'static str, apply: impl FnOnce(&mut DegradationSignals)) {
        let mut state = self.state.lock();
        apply(&mut state.signals);
        debug!(signal, signals = ?state.signals, "Degradation signal");
        self.publish(state.mode(), signal);
    }

    /// Called with the state lock held so publications are ordered.
    fn publish(&self, mode: DegradationMode, signal: &'static str) {
        self.mode_tx.send_if_modified(|current| {
            if *current == mode {
                false
            } else {
                info!(from = %current, to = %mode, signal, "Degradation mode changed");
                *current = mode;
                true
            }
        });
    }
}
