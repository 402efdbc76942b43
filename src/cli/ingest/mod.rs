//! Ingest command - merges a document into the knowledge graph

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

/// Arguments for the ingest command
#[derive(Args, Clone)]
pub struct IngestArgs {
    /// Text file to ingest
    #[arg(long)]
    pub file: PathBuf,

    /// Identifier recorded as provenance of every node and edge
    #[arg(long)]
    pub document_id: String,

    /// Owner of the graph namespace
    #[arg(long)]
    pub user_id: String,
}

#[derive(Debug, Serialize)]
struct IngestSummary<'a> {
    document_id: &'a str,
    user_id: &'a str,
    nodes_created: usize,
    edges_created: usize,
}

/// Run the ingest command
pub async fn run(args: IngestArgs) -> anyhow::Result<()> {
    let (_, components) = super::bootstrap().await?;
    let text = super::read_document(&args.file).await?;

    let summary = components
        .extraction_service
        .build_knowledge_graph(&text, &args.document_id, &args.user_id)
        .await?;

    super::print_json(&IngestSummary {
        document_id: &args.document_id,
        user_id: &args.user_id,
        nodes_created: summary.nodes_created,
        edges_created: summary.edges_created,
    })
}
