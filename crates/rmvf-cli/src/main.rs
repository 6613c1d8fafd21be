use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "rmvf-cli")]
#[command(about = "Refurb Mac value finder command-line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Scrape both sources, rank the listings, and write all JSON reports.
    Run,
    /// Re-run the detail pass over the existing ranked report.
    Enrich,
}

fn init_tracing() -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_env("RMVF_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing()?;
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            let summary = rmvf_rank::run_once_from_env().await?;
            println!(
                "run complete: run_id={} benchmarks={} listings={} ranked={} data={}",
                summary.run_id,
                summary.benchmark_records,
                summary.listing_records,
                summary.ranked_entries,
                summary.data_dir
            );
        }
        Commands::Enrich => {
            let entries = rmvf_rank::enrich_from_env().await?;
            println!("enrich complete: entries={entries}");
        }
    }

    Ok(())
}
