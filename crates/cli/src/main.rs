//! docuroute CLI — the main entry point.
//!
//! Commands:
//! - `ask`     — Ask questions over a docset (single question or interactive)
//! - `search`  — Show what the fused retriever returns for a query
//! - `config`  — Print the effective or default configuration

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "docuroute",
    about = "docuroute — questions over document sets, routed to the right tool",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask the agent a question about a docset
    Ask {
        /// Docset JSON file
        #[arg(short, long)]
        docset: PathBuf,

        /// Ask a single question instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Run fused retrieval over a docset and print the documents
    Search {
        /// Docset JSON file
        #[arg(short, long)]
        docset: PathBuf,

        /// The query
        query: String,

        /// Number of documents (defaults to retrieval.k)
        #[arg(short)]
        k: Option<usize>,
    },

    /// Show configuration
    Config {
        /// Print the built-in defaults instead of the loaded configuration
        #[arg(long)]
        default: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Ask { docset, message } => commands::ask::run(&docset, message).await?,
        Commands::Search { docset, query, k } => commands::search::run(&docset, &query, k).await?,
        Commands::Config { default } => commands::config_cmd::run(default).await?,
    }

    Ok(())
}
