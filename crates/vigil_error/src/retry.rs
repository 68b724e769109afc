//! Retry and telemetry classification.

use crate::{VigilError, VigilErrorKind};

/// Trait for errors that support retry logic.
///
/// Transient errors like 503 (service unavailable), 429 (rate limit) or
/// network timeouts are retryable. Permanent errors like 401 (unauthorized)
/// or a malformed response are not.
pub trait RetryableError {
    /// Returns true if this error should trigger another attempt.
    fn is_retryable(&self) -> bool;

    /// Returns true if this error signals that the endpoint is throttling.
    fn is_rate_limit(&self) -> bool;

    /// Returns true if this error reflects the health of the remote endpoint.
    ///
    /// Only remote failures count against the circuit breaker and the
    /// degradation controller's failure counter.
    fn is_remote_failure(&self) -> bool;

    /// Coarse category string recorded by telemetry.
    fn category(&self) -> &'static str;
}

impl RetryableError for VigilErrorKind {
    fn is_retryable(&self) -> bool {
        match self {
            VigilErrorKind::Transport(_)
            | VigilErrorKind::Timeout(_)
            | VigilErrorKind::RateLimit(_)
            | VigilErrorKind::Server { .. }
            | VigilErrorKind::ValidationFailed(_) => true,
            VigilErrorKind::Http { status, .. } => *status == 408,
            _ => false,
        }
    }

    fn is_rate_limit(&self) -> bool {
        match self {
            VigilErrorKind::RateLimit(_) => true,
            // Fallback for transports that cannot supply a structured status.
            VigilErrorKind::Transport(message)
            | VigilErrorKind::Server { message, .. }
            | VigilErrorKind::Http { message, .. } => {
                message.to_lowercase().contains("rate limit")
            }
            _ => false,
        }
    }

    fn is_remote_failure(&self) -> bool {
        match self {
            VigilErrorKind::Transport(_)
            | VigilErrorKind::Timeout(_)
            | VigilErrorKind::RateLimit(_)
            | VigilErrorKind::Server { .. } => true,
            VigilErrorKind::Http { status, .. } => *status == 408,
            _ => false,
        }
    }

    fn category(&self) -> &'static str {
        match self {
            VigilErrorKind::Transport(_) => "transport",
            VigilErrorKind::Timeout(_) => "timeout",
            VigilErrorKind::Auth(_) => "auth",
            VigilErrorKind::RateLimit(_) => "rate_limit",
            VigilErrorKind::Server { .. } => "server",
            VigilErrorKind::Http { .. } => "http",
            VigilErrorKind::Parse(_) => "parse",
            VigilErrorKind::CircuitOpen { .. } => "circuit_open",
            VigilErrorKind::ValidationFailed(_) => "validation",
            VigilErrorKind::InvalidRequest(_) => "invalid_request",
            VigilErrorKind::Config(_) => "config",
            VigilErrorKind::Cancelled => "cancelled",
        }
    }
}

impl RetryableError for VigilError {
    fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }

    fn is_rate_limit(&self) -> bool {
        self.kind().is_rate_limit()
    }

    fn is_remote_failure(&self) -> bool {
        self.kind().is_remote_failure()
    }

    fn category(&self) -> &'static str {
        self.kind().category()
    }
}
