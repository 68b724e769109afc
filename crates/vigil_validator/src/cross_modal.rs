//! Consistency between generated text and image.

use crate::ValidatorConfig;
use crate::text_checks::words;
use vigil_core::{IssueCategory, ValidationIssue};

const VISUAL_VOCABULARY: &[&str] = &[
    "image",
    "picture",
    "photo",
    "photograph",
    "illustration",
    "drawing",
    "painting",
    "scene",
    "shows",
    "shown",
    "depicts",
    "depicted",
    "visible",
    "color",
    "colors",
    "colour",
    "colours",
    "background",
    "foreground",
    "appears",
    "looks",
    "see",
];

/// Flag long text that never mentions anything visual.
pub(crate) fn check_cross_modal(text: &str, config: &ValidatorConfig) -> Option<ValidationIssue> {
    if text.trim().chars().count() <= *config.cross_modal_min_chars() {
        return None;
    }
    let mentions_visual = words(text)
        .iter()
        .any(|w| VISUAL_VOCABULARY.contains(&w.as_str()));
    (!mentions_visual).then(|| {
        ValidationIssue::minor(
            IssueCategory::CrossModalConsistency,
            "text may not reference the image",
        )
    })
}
