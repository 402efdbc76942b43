//! Prometheus metrics infrastructure

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use super::config::MetricsConfig;
use crate::domain::DomainError;

/// Outcome label of a semantic cache lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupResult {
    Hit,
    Miss,
    Bypass,
}

impl LookupResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            LookupResult::Hit => "hit",
            LookupResult::Miss => "miss",
            LookupResult::Bypass => "bypass",
        }
    }
}

/// Kind label of a knowledge graph write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphWriteKind {
    NodeCreated,
    NodeExisting,
    EdgeCreated,
    EdgeExisting,
}

impl GraphWriteKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GraphWriteKind::NodeCreated => "node_created",
            GraphWriteKind::NodeExisting => "node_existing",
            GraphWriteKind::EdgeCreated => "edge_created",
            GraphWriteKind::EdgeExisting => "edge_existing",
        }
    }
}

/// Install the Prometheus recorder with its scrape listener
///
/// Returns `Ok(false)` when metrics are disabled.
pub fn init_metrics(config: &MetricsConfig) -> Result<bool, DomainError> {
    if !config.enabled {
        tracing::info!("Prometheus metrics disabled");
        return Ok(false);
    }

    let addr: SocketAddr = config.listen_addr.parse().map_err(|e| {
        DomainError::configuration(format!(
            "Invalid metrics listen address '{}': {}",
            config.listen_addr, e
        ))
    })?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| {
            DomainError::configuration(format!("Failed to install Prometheus exporter: {}", e))
        })?;

    register_default_metrics();
    tracing::info!(%addr, "Prometheus metrics exporter listening");

    Ok(true)
}

fn register_default_metrics() {
    gauge!("semgraph_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);
}

pub fn record_cache_lookup(result: LookupResult) {
    counter!("semantic_cache_lookups_total", "result" => result.as_str()).increment(1);
}

pub fn record_cache_evictions(count: u64) {
    if count > 0 {
        counter!("semantic_cache_evictions_total").increment(count);
    }
}

/// Record an extraction pass of one tier
pub fn record_extraction(tier: &'static str, duration: Duration, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!("entity_extractions_total", "tier" => tier, "status" => status).increment(1);
    histogram!("entity_extraction_duration_seconds", "tier" => tier)
        .record(duration.as_secs_f64());
}

pub fn record_graph_write(kind: GraphWriteKind) {
    counter!("knowledge_graph_writes_total", "kind" => kind.as_str()).increment(1);
}
