//! Purge command - removes expired cache entries

use serde_json::json;

/// Run the purge command
pub async fn run() -> anyhow::Result<()> {
    let (_, components) = super::bootstrap().await?;

    let removed = components.cache_service.purge_expired().await?;
    let stats = components.cache_service.stats().await?;

    super::print_json(&json!({
        "removed": removed,
        "remaining": stats.entries,
        "backend": components.cache_store.backend_name(),
    }))
}
