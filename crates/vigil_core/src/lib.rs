//! Core data types for the vigil generation resilience layer.
//!
//! This crate provides the request, output and outcome types shared by every
//! vigil component, plus tracing/metrics initialisation.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod fingerprint;
mod input_image;
pub mod observability;
mod outcome;
mod output;
mod request;
pub mod settings;
mod validation;

pub use fingerprint::RequestFingerprint;
pub use input_image::InputImage;
pub use outcome::GenerationOutcome;
pub use output::{GeneratedImage, GeneratedOutput};
pub use request::{
    GenerationRequest, GenerationRequestBuilder, GenerationStyle, OutputKind, Priority,
};
pub use settings::{EnvSettings, MemorySettings, SettingsStore};
pub use validation::{IssueCategory, Severity, ValidationIssue, ValidationResult};
