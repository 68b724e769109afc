//! Error kinds.

use std::time::Duration;

/// Specific failure conditions of the generation layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum VigilErrorKind {
    /// Network or connection failure before a response was received.
    #[display("Transport error: {_0}")]
    Transport(String),

    /// A single remote attempt exceeded its time bound.
    #[display("Request timed out after {_0:?}")]
    Timeout(Duration),

    /// Missing or rejected API key.
    #[display("Authentication failed: {_0}")]
    Auth(String),

    /// The endpoint is throttling this client.
    #[display("Rate limit exceeded: {_0}")]
    RateLimit(String),

    /// The endpoint returned a 5xx status.
    #[display("Server error (HTTP {status}): {message}")]
    Server {
        /// HTTP status code
        status: u16,
        /// Error message from the response body
        message: String,
    },

    /// Any other non-2xx status.
    #[display("HTTP {status} error: {message}")]
    Http {
        /// HTTP status code
        status: u16,
        /// Error message from the response body
        message: String,
    },

    /// The response could not be decoded.
    #[display("Malformed response: {_0}")]
    Parse(String),

    /// The circuit breaker is open; no call was made.
    #[display("Circuit breaker open, retry after {retry_after:?}")]
    CircuitOpen {
        /// Remaining cooldown
        retry_after: Duration,
    },

    /// The quality gate rejected the generated output.
    #[display("Output rejected by validation: {_0}")]
    ValidationFailed(String),

    /// The request is not well formed (e.g. empty prompt).
    #[display("Invalid request: {_0}")]
    InvalidRequest(String),

    /// Configuration could not be loaded or is inconsistent.
    #[display("Configuration error: {_0}")]
    Config(String),

    /// The caller cancelled the request.
    #[display("Request cancelled")]
    Cancelled,
}

impl VigilErrorKind {
    /// Map a non-success HTTP status and body message to an error kind.
    ///
    /// 401/403 are authentication failures, 429 is a rate limit, 5xx is a
    /// server error, everything else is a plain HTTP error.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 | 403 => VigilErrorKind::Auth(message),
            429 => VigilErrorKind::RateLimit(message),
            500..=599 => VigilErrorKind::Server { status, message },
            _ => VigilErrorKind::Http { status, message },
        }
    }

    /// HTTP status carried by this kind, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            VigilErrorKind::Server { status, .. } | VigilErrorKind::Http { status, .. } => {
                Some(*status)
            }
            VigilErrorKind::RateLimit(_) => Some(429),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_mapping() {
        assert!(matches!(
            VigilErrorKind::from_status(401, "bad key"),
            VigilErrorKind::Auth(_)
        ));
        assert!(matches!(
            VigilErrorKind::from_status(403, "forbidden"),
            VigilErrorKind::Auth(_)
        ));
        assert!(matches!(
            VigilErrorKind::from_status(429, "slow down"),
            VigilErrorKind::RateLimit(_)
        ));
        assert!(matches!(
            VigilErrorKind::from_status(502, "bad gateway"),
            VigilErrorKind::Server { status: 502, .. }
        ));
        assert!(matches!(
            VigilErrorKind::from_status(400, "bad request"),
            VigilErrorKind::Http { status: 400, .. }
        ));
    }

    #[test]
    fn test_display_includes_status() {
        let kind = VigilErrorKind::from_status(503, "unavailable");
        assert_eq!(kind.to_string(), "Server error (HTTP 503): unavailable");
    }
}
