//! Command-line interface module.
//!
//! This module provides the CLI structure and command handlers for the vigil binary.

mod commands;
mod generate;
mod status;

pub use commands::{Cli, Commands};
pub use generate::{GenerateOptions, handle_generate_command};
pub use status::handle_status_command;
