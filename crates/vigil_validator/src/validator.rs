//! Validator entry points.

use crate::ValidatorConfig;
use crate::cross_modal::check_cross_modal;
use crate::image_checks::check_image;
use crate::text_checks::check_text;
use image::RgbaImage;
use tracing::{debug, instrument};
use vigil_core::{GeneratedOutput, IssueCategory, OutputKind, ValidationIssue, ValidationResult};

/// Scores generated output against heuristic quality checks.
#[derive(Debug, Clone, Default)]
pub struct OutputValidator {
    config: ValidatorConfig,
}

impl OutputValidator {
    /// Create a validator with custom thresholds.
    pub fn new(config: ValidatorConfig) -> Self {
        Self { config }
    }

    /// Thresholds in use.
    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Validate a candidate image and/or text for `mode`.
    ///
    /// A missing required modality yields a single critical issue and no
    /// further checks run.
    #[instrument(skip(self, image, text), fields(has_image = image.is_some(), has_text = text.is_some()))]
    pub fn validate(
        &self,
        image: Option<&RgbaImage>,
        text: Option<&str>,
        mode: OutputKind,
    ) -> ValidationResult {
        if let Some(missing) = missing_content(image.is_some(), text.is_some(), mode) {
            debug!(message = missing.message(), "Required content missing");
            return ValidationResult::from_issues(vec![missing]);
        }

        let mut issues = Vec::new();
        if let Some(image) = image {
            issues.extend(check_image(image, &self.config));
        }
        if let Some(text) = text {
            issues.extend(check_text(text, &self.config));
        }
        if let (OutputKind::Combined, Some(_), Some(text)) = (mode, image, text) {
            issues.extend(check_cross_modal(text, &self.config));
        }

        let result = ValidationResult::from_issues(issues);
        debug!(
            passed = result.passed(),
            confidence = result.confidence(),
            issues = result.issues().len(),
            "Validation complete"
        );
        result
    }

    /// Validate a generated output.
    pub fn validate_output(&self, output: &GeneratedOutput, mode: OutputKind) -> ValidationResult {
        self.validate(output.image().map(|i| i.pixels()), output.text(), mode)
    }
}

fn missing_content(has_image: bool, has_text: bool, mode: OutputKind) -> Option<ValidationIssue> {
    let message = match mode {
        OutputKind::ImageOnly if !has_image => "expected an image but none was generated",
        OutputKind::TextOnly if !has_text => "expected text but none was generated",
        OutputKind::Combined if !has_image && !has_text => "no image or text was generated",
        _ => return None,
    };
    Some(ValidationIssue::critical(IssueCategory::MissingContent, message))
}
