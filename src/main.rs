//! # pdfqa CLI
//!
//! Single binary for the PDF question-answering server.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `pdfqa init` | Build (or load) the vector index from the PDF folder |
//! | `pdfqa ask "<question>"` | Answer one question from the command line |
//! | `pdfqa serve` | Start the HTTP + websocket server |
//!
//! All commands accept a `--config` flag pointing to a TOML configuration
//! file. See `config/pdfqa.example.toml` for a full example. API credentials
//! (`GEMINI_API_KEY`, `OPENAI_API_KEY`) are read from the environment; a
//! `.env` file next to the working directory is loaded if present.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use pdfqa::config;
use pdfqa::embedding::{create_embedder, Embedder};
use pdfqa::generate::{create_generator, AnswerGenerator};
use pdfqa::ingest;
use pdfqa::qa::QaEngine;
use pdfqa::server;

/// pdfqa — a PDF-grounded retrieval-augmented question answering server.
#[derive(Parser)]
#[command(
    name = "pdfqa",
    about = "PDF-grounded retrieval-augmented question answering server",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/pdfqa.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the vector index from the configured PDF folder.
    ///
    /// Loads the persisted index if one already exists; otherwise extracts,
    /// chunks, and embeds every PDF in the folder and persists the result.
    /// Idempotent — running it again just reports the existing index.
    Init,

    /// Ask a single question and print the answer.
    ///
    /// Runs the same retrieval and generation pipeline the websocket channel
    /// uses, without starting the server.
    Ask {
        /// The question to answer.
        question: String,
    },

    /// Start the HTTP + websocket server.
    ///
    /// Binds to `[server].bind`. Fails fast on missing configuration,
    /// missing credentials, or a corrupt persisted index.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let embedder = create_embedder(&cfg.embedding)?;
            let index = ingest::build_or_load_index(&cfg, embedder.as_ref()).await?;
            println!("Index ready ({} records).", index.count().await?);
        }
        Commands::Ask { question } => {
            let embedder: Arc<dyn Embedder> = Arc::from(create_embedder(&cfg.embedding)?);
            let generator: Arc<dyn AnswerGenerator> = Arc::from(create_generator(&cfg.generation)?);
            let index = ingest::build_or_load_index(&cfg, &*embedder).await?;
            let engine = QaEngine::new(index, embedder, generator, cfg.retrieval.top_k);
            println!("{}", engine.ask(&question).await);
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
