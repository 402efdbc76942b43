//! CLI module for semgraph
//!
//! Each subcommand loads the configuration, initializes logging and
//! metrics, and builds the components it needs explicitly:
//! - `ask`: answer questions through the semantic cache
//! - `ingest`: merge a document's entities into the knowledge graph
//! - `extract`: print the entities found in a document
//! - `health`: print the readiness report
//! - `purge`: drop expired cache entries

pub mod ask;
pub mod extract;
pub mod health;
pub mod ingest;
pub mod purge;

use std::path::Path;

use clap::{Parser, Subcommand};

use crate::config::AppConfig;
use crate::infrastructure::observability::{init_metrics, init_tracing};
use crate::AppComponents;

/// semgraph - Semantic caching and knowledge graph extraction
#[derive(Parser)]
#[command(name = "semgraph")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Answer questions, reusing cached answers of similar questions
    Ask(ask::AskArgs),

    /// Extract a document's entities into the knowledge graph
    Ingest(ingest::IngestArgs),

    /// Print the entities and relations found in a document
    Extract(extract::ExtractArgs),

    /// Check the cache, graph and embedding backends
    Health,

    /// Remove expired entries from the semantic cache
    Purge,
}

/// Load configuration, set up observability and build the components
pub(crate) async fn bootstrap() -> anyhow::Result<(AppConfig, AppComponents)> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    init_tracing(&config.logging, &config.observability.tracing);
    init_metrics(&config.observability.metrics)?;

    let components = AppComponents::build(&config).await?;

    Ok((config, components))
}

pub(crate) async fn read_document(path: &Path) -> anyhow::Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))
}

pub(crate) fn print_json(value: &impl serde::Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
