//! FinRAG Ingestion CLI
//!
//! Loads the filing corpus, chunks every document and reports the result:
//! 1. Reads `{ENTITY}/{PERIOD}.txt` files from the corpus directory
//! 2. Chunks each document into overlapping passages
//! 3. Logs a per-document chunk report, optionally writing passages as JSON

use clap::Parser;
use finrag_common::{config::AppConfig, Passage, VERSION};
use finrag_ingestion::{load_corpus, Chunker};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "ingest", version, about = "Chunk a filing corpus into passages")]
struct Cli {
    /// Configuration file (defaults to config/{APP_ENV} layering)
    #[arg(long)]
    config: Option<String>,

    /// Corpus directory, overriding `corpus.data_dir`
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Write all passages to this JSON file
    #[arg(long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Load configuration
    let config = match &cli.config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::load()?,
    };

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level));
    if config.observability.json_logging {
        tracing_subscriber::fmt().with_env_filter(filter).with_target(true).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).with_target(true).init();
    }

    info!("Starting FinRAG ingestion v{}", VERSION);

    let data_dir = cli.data_dir.unwrap_or_else(|| config.corpus.data_dir.clone());
    let documents = load_corpus(&data_dir).await?;
    let chunker = Chunker::new(config.chunking.clone())?;

    let mut passages: Vec<Passage> = Vec::new();
    for doc in &documents {
        let chunks = doc.chunk(&chunker);
        info!(
            entity = %doc.entity,
            period = %doc.period,
            chunks = chunks.len(),
            "Created chunks"
        );
        println!("{} {}: {} chunks", doc.entity, doc.period, chunks.len());
        passages.extend(chunks);
    }

    info!(
        documents = documents.len(),
        passages = passages.len(),
        "Ingestion complete"
    );

    if let Some(path) = cli.output {
        let json = serde_json::to_string_pretty(&passages)?;
        tokio::fs::write(&path, json).await?;
        info!(path = %path.display(), "Passages written");
    }

    Ok(())
}
