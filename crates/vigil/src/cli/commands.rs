//! CLI command definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use vigil_core::{OutputKind, Priority};

/// Resilient generation against a generative image/text endpoint.
#[derive(Parser, Debug)]
#[command(name = "vigil")]
#[command(about = "Vigil - resilient generation with retries, caching and quality checks")]
#[command(version)]
pub struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Command to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate an image and/or text from a prompt
    Generate {
        /// Prompt text
        prompt: String,

        /// Input image files, in order
        #[arg(short, long = "image")]
        images: Vec<PathBuf>,

        /// Expected output: image, text or combined
        #[arg(short, long, default_value = "combined")]
        kind: OutputKind,

        /// Scheduling priority: critical, high, normal, low or background
        #[arg(short, long, default_value = "normal")]
        priority: Priority,

        /// Write the generated image to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print a JSON report (validation and telemetry) after the result
        #[arg(long)]
        json: bool,
    },

    /// Show device capabilities, degradation mode and feature configuration
    Status,
}
