//! Generate command handler.

use anyhow::{Context, bail};
use futures::StreamExt;
use serde_json::json;
use std::path::PathBuf;
use vigil::Orchestrator;
use vigil_core::{GenerationOutcome, GenerationRequest, InputImage, OutputKind, Priority};

/// Arguments of the `generate` command.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Prompt text
    pub prompt: String,
    /// Input image files
    pub images: Vec<PathBuf>,
    /// Expected output kind
    pub kind: OutputKind,
    /// Scheduling priority
    pub priority: Priority,
    /// Destination for the generated image
    pub output: Option<PathBuf>,
    /// Print a JSON report
    pub json: bool,
}

/// Handles the generate command.
#[tracing::instrument(skip_all, fields(kind = %options.kind, priority = %options.priority))]
pub async fn handle_generate_command(
    orchestrator: &Orchestrator,
    options: GenerateOptions,
) -> anyhow::Result<()> {
    let images = options
        .images
        .iter()
        .map(|path| {
            let bytes = std::fs::read(path)
                .with_context(|| format!("Failed to read image {}", path.display()))?;
            InputImage::from_encoded(bytes)
                .with_context(|| format!("Unsupported image {}", path.display()))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let request = GenerationRequest::builder()
        .prompt(options.prompt)
        .images(images)
        .output_kind(options.kind)
        .priority(options.priority)
        .build()?;

    let mut stream = orchestrator.submit(request);
    let mut terminal = None;
    while let Some(outcome) = stream.next().await {
        match outcome {
            GenerationOutcome::Loading { progress, message } => {
                tracing::info!(progress = %format!("{:.0}%", progress * 100.0), "{}", message);
            }
            outcome => {
                terminal = Some(outcome);
                break;
            }
        }
    }

    let (output, validation, from_cache) = match terminal {
        Some(GenerationOutcome::Success {
            output,
            validation,
            from_cache,
        }) => (output, validation, from_cache),
        Some(GenerationOutcome::Error { message, category }) => {
            bail!("Generation failed ({}): {}", category, message)
        }
        _ => bail!("Generation ended without a result"),
    };

    if let Some(image) = output.image() {
        match &options.output {
            Some(path) => {
                std::fs::write(path, image.encoded())
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                tracing::info!(
                    path = %path.display(),
                    width = image.width(),
                    height = image.height(),
                    "Image written"
                );
            }
            None => tracing::warn!("Image generated but no --output file given, discarding"),
        }
    }

    if let Some(text) = output.text() {
        println!("{}", text);
    }

    if options.json {
        let report = json!({
            "from_cache": from_cache,
            "image": output.image().map(|image| json!({
                "width": image.width(),
                "height": image.height(),
                "mime": image.mime(),
            })),
            "validation": validation,
            "telemetry": orchestrator.metrics_snapshot(),
            "cache": orchestrator.cache_stats(),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    Ok(())
}
