//! Generation request types.

use crate::{InputImage, RequestFingerprint};
use serde::{Deserialize, Serialize};
use vigil_error::{VigilError, VigilErrorKind, VigilResult};

/// What the caller expects back from the generator.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
pub enum OutputKind {
    /// An image is required.
    #[strum(serialize = "image")]
    ImageOnly,
    /// Text is required.
    #[strum(serialize = "text")]
    TextOnly,
    /// At least one of image or text is required.
    #[default]
    #[strum(serialize = "combined")]
    Combined,
}

impl OutputKind {
    /// Stable tag used in request fingerprints.
    pub(crate) fn tag(self) -> u8 {
        match self {
            OutputKind::ImageOnly => 1,
            OutputKind::TextOnly => 2,
            OutputKind::Combined => 3,
        }
    }
}

/// Scheduling priority class. Lower values run first.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
#[repr(u8)]
pub enum Priority {
    /// User is actively waiting and nothing else matters.
    Critical = 0,
    /// Interactive request.
    High = 1,
    /// Default class.
    #[default]
    Normal = 2,
    /// Speculative work.
    Low = 3,
    /// Prefetch and warm-up work.
    Background = 4,
}

impl Priority {
    /// Numeric value of the class (0 is most urgent).
    pub fn value(self) -> u8 {
        self as u8
    }
}

/// Sampling parameters forwarded to the remote generator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, derive_getters::Getters)]
pub struct GenerationStyle {
    /// Sampling temperature in [0, 1]
    temperature: f32,
    /// Top-k sampling cutoff
    top_k: u32,
    /// Nucleus sampling cutoff
    top_p: f32,
}

impl GenerationStyle {
    /// Create a style, clamping temperature and top-p into [0, 1].
    pub fn new(temperature: f32, top_k: u32, top_p: f32) -> Self {
        Self {
            temperature: temperature.clamp(0.0, 1.0),
            top_k: top_k.max(1),
            top_p: top_p.clamp(0.0, 1.0),
        }
    }
}

impl Default for GenerationStyle {
    fn default() -> Self {
        Self::new(0.7, 40, 0.95)
    }
}

/// A caller's generation request. Immutable once submitted.
///
/// # Examples
///
/// ```
/// use vigil_core::{GenerationRequest, OutputKind, Priority};
///
/// let request = GenerationRequest::builder()
///     .prompt("A lighthouse at dusk, watercolor")
///     .output_kind(OutputKind::ImageOnly)
///     .priority(Priority::High)
///     .build()
///     .expect("Valid request");
///
/// assert!(request.validate().is_ok());
/// assert!(request.images().is_empty());
/// ```
#[derive(
    Debug, Clone, PartialEq, derive_getters::Getters, derive_builder::Builder,
)]
#[builder(setter(into))]
pub struct GenerationRequest {
    /// Prompt text
    prompt: String,
    /// Ordered input images
    #[builder(default)]
    images: Vec<InputImage>,
    /// Desired output kind
    #[builder(default)]
    output_kind: OutputKind,
    /// Scheduling priority
    #[builder(default)]
    priority: Priority,
    /// Sampling parameters; `None` defers to the settings store
    #[builder(default)]
    style: Option<GenerationStyle>,
}

impl GenerationRequest {
    /// Creates a new builder for GenerationRequest.
    pub fn builder() -> GenerationRequestBuilder {
        GenerationRequestBuilder::default()
    }

    /// Check that the request is well formed.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` if the prompt is blank.
    pub fn validate(&self) -> VigilResult<()> {
        if self.prompt.trim().is_empty() {
            return Err(VigilError::new(VigilErrorKind::InvalidRequest(
                "Prompt must not be empty".to_string(),
            )));
        }
        Ok(())
    }

    /// Content-addressed cache key for this request.
    pub fn fingerprint(&self) -> RequestFingerprint {
        RequestFingerprint::compute(&self.prompt, self.output_kind, &self.images)
    }

    /// Return a copy of this request with its input images replaced.
    pub fn with_images(&self, images: Vec<InputImage>) -> Self {
        Self {
            images,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_priority_order() {
        assert!(Priority::Critical < Priority::High);
        assert!(Priority::Low < Priority::Background);
        assert_eq!(Priority::from_str("critical").unwrap(), Priority::Critical);
    }

    #[test]
    fn test_blank_prompt_rejected() {
        let request = GenerationRequest::builder()
            .prompt("   ")
            .build()
            .expect("Valid builder");
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_output_kind_parsing() {
        assert_eq!(OutputKind::from_str("image").unwrap(), OutputKind::ImageOnly);
        assert_eq!(OutputKind::from_str("text").unwrap(), OutputKind::TextOnly);
        assert_eq!(OutputKind::ImageOnly.to_string(), "image");
    }

    #[test]
    fn test_style_clamps_ranges() {
        let style = GenerationStyle::new(1.5, 0, -0.2);
        assert_eq!(*style.temperature(), 1.0);
        assert_eq!(*style.top_k(), 1);
        assert_eq!(*style.top_p(), 0.0);
    }
}
