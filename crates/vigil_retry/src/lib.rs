//! Retry engine for remote generation calls.
//!
//! [`RetryEngine`] wraps a single logical call with bounded attempts,
//! exponential backoff with jitter and a shared [`CircuitBreaker`]. The delay
//! math lives in [`BackoffPolicy`] and is independent of any sleeping.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod breaker;
mod engine;
mod policy;

pub use breaker::{CircuitBreaker, CircuitState};
pub use engine::{RetryAttempt, RetryEngine, RetryFailure, RetrySuccess};
pub use policy::BackoffPolicy;
