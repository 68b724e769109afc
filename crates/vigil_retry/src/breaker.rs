//! Circuit breaker shared by every caller of a retry engine.

use parking_lot::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Circuit breaker states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    /// Calls flow normally.
    Closed,
    /// Calls are rejected until the cooldown elapses.
    Open,
    /// Cooldown elapsed; the next outcome decides whether to close or reopen.
    HalfOpen,
}

#[derive(Debug)]
struct BreakerState {
    circuit: CircuitState,
    consecutive_failures: u32,
    open_until: Option<Instant>,
}

/// Thread-safe circuit breaker.
///
/// Opens after `failure_threshold` consecutive remote failures and rejects
/// calls for `cooldown`. After the cooldown the circuit is half-open: a
/// success closes it, a failure reopens it immediately.
#[derive(Debug)]
pub struct CircuitBreaker {
    state: Mutex<BreakerState>,
    failure_threshold: u32,
    cooldown: Duration,
}

impl CircuitBreaker {
    /// Creates a closed circuit breaker.
    pub fn new(failure_threshold: u32, cooldown: Duration) -> Self {
        Self {
            state: Mutex::new(BreakerState {
                circuit: CircuitState::Closed,
                consecutive_failures: 0,
                open_until: None,
            }),
            failure_threshold: failure_threshold.max(1),
            cooldown,
        }
    }

    /// Admission check before a call.
    ///
    /// Returns the remaining cooldown if the circuit is open. An open circuit
    /// whose cooldown has elapsed moves to half-open and admits the call.
    pub fn check(&self) -> Result<(), Duration> {
        let mut state = self.state.lock();
        match state.circuit {
            CircuitState::Closed | CircuitState::HalfOpen => Ok(()),
            CircuitState::Open => {
                let now = Instant::now();
                match state.open_until {
                    Some(until) if until > now => Err(until - now),
                    _ => {
                        debug!("Circuit breaker entering half-open state");
                        state.circuit = CircuitState::HalfOpen;
                        state.open_until = None;
                        Ok(())
                    }
                }
            }
        }
    }

    /// Records a successful call.
    pub fn record_success(&self) {
        let mut state = self.state.lock();
        if state.circuit != CircuitState::Closed {
            debug!(from = %state.circuit, "Circuit breaker closing after success");
        }
        state.circuit = CircuitState::Closed;
        state.consecutive_failures = 0;
        state.open_until = None;
    }

    /// Records a failed remote call.
    pub fn record_failure(&self) {
        let mut state = self.state.lock();
        state.consecutive_failures = state.consecutive_failures.saturating_add(1);
        let reopen = state.circuit == CircuitState::HalfOpen;
        if reopen || state.consecutive_failures >= self.failure_threshold {
            if state.circuit != CircuitState::Open {
                warn!(
                    failures = state.consecutive_failures,
                    cooldown_ms = self.cooldown.as_millis() as u64,
                    "Circuit breaker opening"
                );
            }
            state.circuit = CircuitState::Open;
            state.open_until = Some(Instant::now() + self.cooldown);
        }
    }

    /// Force the circuit closed and forget failures.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.circuit = CircuitState::Closed;
        state.consecutive_failures = 0;
        state.open_until = None;
    }

    /// Current state. An open circuit reports `Open` until a call checks in
    /// after the cooldown.
    pub fn state(&self) -> CircuitState {
        self.state.lock().circuit
    }

    /// Consecutive failures since the last success or reset.
    pub fn consecutive_failures(&self) -> u32 {
        self.state.lock().consecutive_failures
    }

    /// Failures needed to open the circuit.
    pub fn failure_threshold(&self) -> u32 {
        self.failure_threshold
    }

    /// Time the circuit stays open.
    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(30))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opens_at_threshold() {
        let breaker = CircuitBreaker::new(3, Duration::from_secs(60));
        breaker.record_failure();
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert!(breaker.check().is_ok());

        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);
        let remaining = breaker.check().unwrap_err();
        assert!(remaining <= Duration::from_secs(60));
    }

    #[test]
    fn test_success_resets_failures() {
        let breaker = CircuitBreaker::new(3, Duration::from_secs(60));
        breaker.record_failure();
        breaker.record_failure();
        breaker.record_success();
        assert_eq!(breaker.consecutive_failures(), 0);
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[test]
    fn test_half_open_after_cooldown() {
        let breaker = CircuitBreaker::new(1, Duration::from_millis(20));
        breaker.record_failure();
        assert!(breaker.check().is_err());

        std::thread::sleep(Duration::from_millis(30));
        assert!(breaker.check().is_ok());
        assert_eq!(breaker.state(), CircuitState::HalfOpen);

        breaker.record_success();
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[test]
    fn test_half_open_failure_reopens() {
        let breaker = CircuitBreaker::new(5, Duration::from_millis(20));
        for _ in 0..5 {
            breaker.record_failure();
        }
        std::thread::sleep(Duration::from_millis(30));
        assert!(breaker.check().is_ok());

        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);
        assert!(breaker.check().is_err());
    }

    #[test]
    fn test_reset_closes() {
        let breaker = CircuitBreaker::new(1, Duration::from_secs(60));
        breaker.record_failure();
        breaker.reset();
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert!(breaker.check().is_ok());
    }
}
