//! Resilience and quality-assurance layer for generative image/text endpoints.
//!
//! Vigil sits between an application and a remote generator. For every
//! [`GenerationRequest`](vigil_core::GenerationRequest) the [`Orchestrator`]
//! consults the degradation controller, checks the result cache, queues the
//! work on the priority scheduler, calls the endpoint through the retry
//! engine and its circuit breaker, scores the output with the validator and
//! reports everything to telemetry. Callers receive a stream of
//! [`GenerationOutcome`](vigil_core::GenerationOutcome)s ending in exactly one
//! success or error.
//!
//! # Features
//!
//! - `metrics`: mirror telemetry into OpenTelemetry instruments.
//! - `api`: enable tests that call the real endpoint.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod context;
pub mod encode;
mod orchestrator;
mod stream;

pub use config::{
    ApiConfig, BreakerConfig, CacheConfig, DegradationConfig, ENV_PREFIX, RetryConfig,
    StyleConfig, VigilConfig,
};
pub use context::VigilContext;
pub use orchestrator::Orchestrator;
pub use stream::GenerationStream;

pub use vigil_core::{EnvSettings, MemorySettings, SettingsStore};
