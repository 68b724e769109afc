//! Vigil command-line entry point.

mod cli;

use clap::Parser;
use cli::{Cli, Commands, GenerateOptions, handle_generate_command, handle_status_command};
use std::sync::Arc;
use vigil::{EnvSettings, Orchestrator, VigilConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before anything reads the environment.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    vigil_core::observability::init_tracing(cli.json_logs);

    #[cfg(feature = "metrics")]
    if let Err(e) = vigil_core::observability::init_observability("vigil", 60) {
        tracing::warn!(error = %e, "Metrics export disabled");
    }

    let config = VigilConfig::load(cli.config.as_deref())?;
    let orchestrator = Orchestrator::from_config(&config, Arc::new(EnvSettings))?;

    let result = match cli.command {
        Commands::Generate {
            prompt,
            images,
            kind,
            priority,
            output,
            json,
        } => {
            handle_generate_command(
                &orchestrator,
                GenerateOptions {
                    prompt,
                    images,
                    kind,
                    priority,
                    output,
                    json,
                },
            )
            .await
        }
        Commands::Status => handle_status_command(&orchestrator).await,
    };

    vigil_core::observability::shutdown_observability();
    result
}
