//! Observability infrastructure - Tracing and Metrics

mod config;
mod metrics;
mod tracing_setup;

pub use config::{MetricsConfig, ObservabilityConfig, TracingConfig};
pub use metrics::{
    init_metrics, record_cache_evictions, record_cache_lookup, record_extraction,
    record_graph_write, GraphWriteKind, LookupResult,
};
pub use tracing_setup::{init_tracing, shutdown_tracing};
