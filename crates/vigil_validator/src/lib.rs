//! Output validator.
//!
//! Scores a candidate result against heuristic image and text checks and
//! returns a [`ValidationResult`](vigil_core::ValidationResult). The checks are
//! quality signals only; they say nothing about semantic correctness.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod cross_modal;
mod image_checks;
mod text_checks;
mod validator;

pub use config::ValidatorConfig;
pub use validator::OutputValidator;
