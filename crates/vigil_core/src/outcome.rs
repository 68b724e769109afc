//! Outcomes streamed back to the caller.

use crate::{GeneratedImage, GeneratedOutput, ValidationResult};
use std::sync::Arc;

/// A tagged outcome of a generation request.
///
/// A request yields zero or more `Loading` outcomes followed by exactly one
/// terminal `Success` or `Error`.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationOutcome {
    /// Work in progress.
    Loading {
        /// Progress fraction in [0, 1]
        progress: f32,
        /// Human-readable stage description
        message: String,
    },
    /// Generation completed.
    Success {
        /// Generated payload
        output: Arc<GeneratedOutput>,
        /// Validation detail (absent when validation was not run)
        validation: Option<ValidationResult>,
        /// True if served from the result cache
        from_cache: bool,
    },
    /// Generation failed.
    Error {
        /// Human-readable message
        message: String,
        /// Coarse error category
        category: &'static str,
    },
}

impl GenerationOutcome {
    /// Create a loading outcome.
    pub fn loading(progress: f32, message: impl Into<String>) -> Self {
        GenerationOutcome::Loading {
            progress: progress.clamp(0.0, 1.0),
            message: message.into(),
        }
    }

    /// True for `Success` and `Error`.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, GenerationOutcome::Loading { .. })
    }

    /// Generated image, if this is a success carrying one.
    pub fn image(&self) -> Option<&GeneratedImage> {
        match self {
            GenerationOutcome::Success { output, .. } => output.image(),
            _ => None,
        }
    }

    /// Generated text, if this is a success carrying some.
    pub fn text(&self) -> Option<&str> {
        match self {
            GenerationOutcome::Success { output, .. } => output.text(),
            _ => None,
        }
    }
}
