//! Error types for the vigil generation resilience layer.
//!
//! Every failure surfaced by the layer is a [`VigilError`]: a [`VigilErrorKind`]
//! plus the source location where it was raised. The [`RetryableError`] trait
//! carries the retry and telemetry classification used by the retry engine,
//! the degradation controller and the telemetry recorder.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod kind;
mod retry;

pub use kind::VigilErrorKind;
pub use retry::RetryableError;

/// Vigil error with location tracking.
///
/// # Examples
///
/// ```
/// use vigil_error::{RetryableError, VigilError, VigilErrorKind};
///
/// let err = VigilError::new(VigilErrorKind::Server {
///     status: 503,
///     message: "overloaded".to_string(),
/// });
/// assert!(err.is_retryable());
/// assert_eq!(err.category(), "server");
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Vigil Error: {} at line {} in {}", kind, line, file)]
pub struct VigilError {
    kind: VigilErrorKind,
    line: u32,
    file: &'static str,
}

impl VigilError {
    /// Create a new error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: VigilErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Get the error kind.
    pub fn kind(&self) -> &VigilErrorKind {
        &self.kind
    }

    /// Line where the error was created.
    pub fn line(&self) -> u32 {
        self.line
    }

    /// File where the error was created.
    pub fn file(&self) -> &'static str {
        self.file
    }

    /// Message suitable for showing to an end user (no source location).
    pub fn user_message(&self) -> String {
        self.kind.to_string()
    }
}

impl<T> From<T> for VigilError
where
    T: Into<VigilErrorKind>,
{
    #[track_caller]
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for vigil operations.
pub type VigilResult<T> = Result<T, VigilError>;
