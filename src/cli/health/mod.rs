//! Health command - prints the readiness report

use crate::infrastructure::services::HealthStatus;

/// Run the health command
///
/// Fails when the report is unhealthy so scripts can rely on the exit code.
pub async fn run() -> anyhow::Result<()> {
    let (_, components) = super::bootstrap().await?;

    let report = components.health_service.readiness().await;
    super::print_json(&report)?;

    if report.status == HealthStatus::Unhealthy {
        anyhow::bail!("semgraph is not ready");
    }

    Ok(())
}
