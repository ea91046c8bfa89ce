//! gait-batch: phase-normalize a batch of walking trials

mod commands;

use clap::Parser;
use commands::Command;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Gait-cycle segmentation and phase normalization
#[derive(Parser, Debug)]
#[command(name = "gait-batch")]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run(args) => commands::run(args).await?,
        Command::Config(args) => commands::config(args)?,
    }

    Ok(())
}
