mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use tarot::config::TarotConfig;
use tarot::corpus::Orientation;

#[derive(Parser)]
#[command(name = "tarot", version, about = "Daily tarot fortune service")]
struct Cli {
    /// Config file (defaults to ~/.tarot/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP API
    Serve,
    /// Embed the reference corpus and write the similarity index
    BuildIndex {
        /// JSON array of {text, card, orientation}; defaults to the built-in corpus
        #[arg(long)]
        corpus: Option<PathBuf>,
        /// Replace an existing index
        #[arg(long)]
        force: bool,
    },
    /// Show the corpus texts nearest to a card, without generating a reading
    Retrieve {
        card: String,
        /// upright or reversed
        orientation: Orientation,
        #[arg(long)]
        top_k: Option<usize>,
    },
    /// Send sample readings to a running server and print the full output
    Smoke {
        /// Server base URL (defaults to the configured host and port)
        #[arg(long)]
        url: Option<String>,
    },
    /// Check the index and configuration
    Doctor,
    /// Manage the local embedding model
    Model {
        #[command(subcommand)]
        action: ModelAction,
    },
}

#[derive(Subcommand)]
enum ModelAction {
    /// Download all-MiniLM-L6-v2 to the configured cache directory
    Download,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => TarotConfig::load_from(path)?,
        None => TarotConfig::load()?,
    };

    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve => tarot::server::serve(config).await?,
        Command::BuildIndex { corpus, force } => {
            cli::build_index::build_index(&config, corpus.as_deref(), force).await?
        }
        Command::Retrieve {
            card,
            orientation,
            top_k,
        } => cli::retrieve::retrieve(&config, &card, orientation, top_k).await?,
        Command::Smoke { url } => {
            let url = url.unwrap_or_else(|| config.server_url());
            cli::smoke::smoke(&url).await?
        }
        Command::Doctor => cli::doctor::doctor(&config)?,
        Command::Model { action } => match action {
            ModelAction::Download => cli::model_download(&config.embedding).await?,
        },
    }

    Ok(())
}
