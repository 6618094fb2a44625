//! passage CLI - command-line interface for the retrieval engine.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use passage_chunk::TokenWindowChunker;
use passage_core::{ChunkConfig, Chunker, EngineConfig, PassageError, Result};
use passage_embed::OpenAiEmbedder;
use passage_index::SimpleNormalizer;
use passage_llm::{OpenAiGenerator, OpenAiQueryExpander};
use passage_query::RetrievalEngine;
use passage_store::SqliteStore;

type Engine = RetrievalEngine<SqliteStore, OpenAiEmbedder, OpenAiGenerator>;

/// passage - Hybrid document retrieval with grounded answers
#[derive(Parser)]
#[command(name = "passage")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file path (default: ~/.config/passage/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Database path (overrides config)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    /// Session the command operates in
    #[arg(short, long, global = true, default_value = "default")]
    session: String,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database and index paths
    Init,

    /// Ingest a document into the session's corpus
    Ingest {
        /// Path to the document (.txt or .md)
        path: PathBuf,
    },

    /// Ask a question against the session's corpus
    Query {
        /// The question
        text: String,

        /// Number of passages to retrieve (0 = configured default)
        #[arg(short = 'k', long, default_value = "0")]
        top_k: usize,
    },

    /// Show the session's conversation history
    History,

    /// Clear the session's conversation history
    Forget,

    /// Show corpus statistics
    Stats,
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

fn load_config(cli: &Cli) -> Result<EngineConfig> {
    let mut config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::load_default()?,
    };
    if let Some(database) = &cli.database {
        config.database.path = database.clone();
    }
    Ok(config)
}

async fn open_engine(config: &EngineConfig) -> Result<Engine> {
    let store = Arc::new(SqliteStore::open(&config.database.path)?);
    let embedder = Arc::new(OpenAiEmbedder::from_config(&config.embedding)?);
    let generator = Arc::new(OpenAiGenerator::from_config(&config.generation)?);

    let mut engine = RetrievalEngine::open(
        store,
        embedder,
        generator,
        Arc::new(SimpleNormalizer::new()),
        config.index.path.clone(),
        config.search.clone(),
        config.memory.clone(),
    )
    .await?;

    if config.search.expand_queries {
        let expander = OpenAiQueryExpander::from_config(&config.generation)?;
        engine = engine.with_expander(Arc::new(expander));
    }

    Ok(engine)
}

/// Extract plain text from a file. Formats without a text extractor
/// configured are rejected rather than silently mangled.
fn read_text(path: &Path) -> Result<String> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match extension.as_str() {
        "txt" | "md" | "markdown" => Ok(fs::read_to_string(path)?),
        _ => Err(PassageError::UnsupportedFormat { extension }),
    }
}

fn source_filename(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_string()
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    let session = Some(cli.session.as_str());

    match cli.command {
        Commands::Init => {
            let _engine = open_engine(&config).await?;
            println!("Initialized database at: {}", config.database.path.display());
            println!("Vector index at: {}", config.index.path.display());
        }
        Commands::Ingest { path } => {
            let text = read_text(&path)?;
            let chunker = TokenWindowChunker::new();
            let chunk_config = ChunkConfig {
                chunk_tokens: config.chunking.chunk_tokens,
                overlap_tokens: config.chunking.overlap_tokens,
            };
            let passages = chunker.chunk(&text, &chunk_config);
            if passages.is_empty() {
                println!("No text found in {}", path.display());
                return Ok(());
            }

            let engine = open_engine(&config).await?;
            let filename = source_filename(&path);
            let ids = engine.ingest(session, &filename, &filename, &passages).await?;
            println!(
                "Ingested {} passages from {} into session '{}'",
                ids.len(),
                filename,
                cli.session
            );
        }
        Commands::Query { text, top_k } => {
            let engine = open_engine(&config).await?;
            let response = engine.query(session, &text, top_k).await?;

            println!("{}\n", response.answer);
            for (rank, result) in response.results.iter().enumerate() {
                println!(
                    "{}. [{:.0}%] {} (chunk {})",
                    rank + 1,
                    result.score * 100.0,
                    result.source_filename,
                    result.id
                );
                println!("   {}", result.content.replace('\n', " "));
            }
        }
        Commands::History => {
            let engine = open_engine(&config).await?;
            let history = engine.history(session);
            if history.is_empty() {
                println!("No history for session '{}'", cli.session);
            }
            for exchange in history {
                println!("Q: {}", exchange.query);
                println!("A: {}\n", exchange.response);
            }
        }
        Commands::Forget => {
            let engine = open_engine(&config).await?;
            engine.clear_memory(session);
            println!("Cleared history for session '{}'", cli.session);
        }
        Commands::Stats => {
            let engine = open_engine(&config).await?;
            let stats = engine.stats().await?;
            println!("Documents: {}", stats.documents);
            println!("Passages:  {}", stats.passages);
            println!("Storage:   {} bytes", stats.storage_bytes);
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
