//! Extract command - prints the entities of a document

use std::path::PathBuf;

use clap::Args;

/// Arguments for the extract command
#[derive(Args, Clone)]
pub struct ExtractArgs {
    /// Text file to extract from
    #[arg(long)]
    pub file: PathBuf,
}

/// Run the extract command
pub async fn run(args: ExtractArgs) -> anyhow::Result<()> {
    let (_, components) = super::bootstrap().await?;
    let text = super::read_document(&args.file).await?;

    let report = components.extraction_service.extract_detailed(&text).await?;

    super::print_json(&report)
}
