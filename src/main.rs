use clap::Parser;
use semgraph::cli::{self, Cli, Command};
use semgraph::infrastructure::observability::shutdown_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Ask(args) => cli::ask::run(args).await,
        Command::Ingest(args) => cli::ingest::run(args).await,
        Command::Extract(args) => cli::extract::run(args).await,
        Command::Health => cli::health::run().await,
        Command::Purge => cli::purge::run().await,
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Command failed");
    }

    shutdown_tracing();
    result
}
