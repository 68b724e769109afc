//! Status command handler.

use serde_json::json;
use vigil::Orchestrator;

/// Handles the status command.
#[tracing::instrument(skip_all)]
pub async fn handle_status_command(orchestrator: &Orchestrator) -> anyhow::Result<()> {
    let capabilities = orchestrator.resource_status().await;
    let status = json!({
        "capabilities": capabilities,
        "degradation_mode": orchestrator.degradation_mode().to_string(),
        "feature_config": orchestrator.feature_config(),
        "cache": orchestrator.cache_stats(),
    });
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}
