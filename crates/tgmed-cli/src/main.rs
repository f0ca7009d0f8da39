mod db;
mod detect;
mod harvest;
mod load;
mod pipeline;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "tgmed-cli")]
#[command(about = "Telegram health-market ingestion pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Harvest configured channels into the raw archive
    Harvest,
    /// Scan archived images through the object detector
    Detect,
    /// Load archive artifacts into the warehouse
    Load {
        #[command(subcommand)]
        command: load::LoadCommands,
    },
    /// Run or schedule the full stage pipeline
    Pipeline {
        #[command(subcommand)]
        command: pipeline::PipelineCommands,
    },
    /// Warehouse connectivity and schema management
    Db {
        #[command(subcommand)]
        command: db::DbCommands,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = tgmed_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Harvest => harvest::run(&config).await,
        Commands::Detect => detect::run(&config).await,
        Commands::Load { command } => load::run(&config, command).await,
        Commands::Pipeline { command } => pipeline::run(&config, command).await,
        Commands::Db { command } => db::run(&config, command).await,
    }
}
