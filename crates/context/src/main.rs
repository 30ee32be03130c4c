//! FinRAG CLI
//!
//! Answers financial questions over a filing corpus:
//! - Builds the vector index from `{data_dir}/{ENTITY}/{PERIOD}.txt`
//! - Runs `--query` questions, the sample questions, or an interactive loop
//! - Optionally persists results as JSON

use anyhow::Context;
use clap::Parser;
use finrag_common::metrics::{register_metrics, LATENCY_BUCKETS, REMOTE_CALL_BUCKETS};
use finrag_common::{config::AppConfig, QueryResult, VERSION};
use finrag_context::{persist_results, ContextEngine, SAMPLE_QUERIES};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use std::io::Write;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "finrag",
    version,
    about = "Answer financial questions from annual filings with cited sources"
)]
struct Cli {
    /// Configuration file (defaults to config/{APP_ENV} layering)
    #[arg(long)]
    config: Option<String>,

    /// Corpus directory, overriding `corpus.data_dir`
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Question to answer; may be repeated
    #[arg(long = "query", short = 'q')]
    queries: Vec<String>,

    /// Run the built-in sample questions
    #[arg(long, default_value_t = false)]
    samples: bool,

    /// Read questions from stdin until quit/exit/q
    #[arg(long, short = 'i', default_value_t = false)]
    interactive: bool,

    /// Save all answered results to this JSON file
    #[arg(long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Load configuration
    let mut config = match &cli.config {
        Some(path) => AppConfig::from_file(path),
        None => AppConfig::load(),
    }
    .context("Failed to load configuration")?;
    if let Some(dir) = cli.data_dir.clone() {
        config.corpus.data_dir = dir;
    }

    init_tracing(&config);
    info!("Starting FinRAG v{}", VERSION);

    if config.observability.metrics_port > 0 {
        let addr = SocketAddr::from(([0, 0, 0, 0], config.observability.metrics_port));
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .set_buckets_for_metric(Matcher::Suffix("query_duration_seconds".to_string()), REMOTE_CALL_BUCKETS)?
            .set_buckets_for_metric(Matcher::Suffix("model_duration_seconds".to_string()), REMOTE_CALL_BUCKETS)?
            .set_buckets_for_metric(Matcher::Suffix("embedding_duration_seconds".to_string()), REMOTE_CALL_BUCKETS)?
            .set_buckets(LATENCY_BUCKETS)?
            .install()
            .context("Failed to install Prometheus exporter")?;
        info!(%addr, "Metrics exporter listening");
    }
    register_metrics();

    let engine = ContextEngine::from_config(&config)?;

    info!(corpus = %config.corpus.data_dir.display(), "Building vector index");
    let passages = engine.setup_from_corpus(&config.corpus.data_dir).await?;
    info!(passages = passages, "System setup complete");

    let mut questions: Vec<String> = cli.queries.clone();
    if cli.samples || (questions.is_empty() && !cli.interactive) {
        questions.extend(SAMPLE_QUERIES.iter().map(|q| q.to_string()));
    }

    let mut results = Vec::with_capacity(questions.len());
    for question in &questions {
        let result = engine.query(question).await;
        print_result(&result);
        results.push(result);
    }

    if cli.interactive {
        results.extend(interactive_loop(&engine).await?);
    }

    if let Some(path) = &cli.output {
        persist_results(path, &results).await?;
        println!("\nResults saved to {}", path.display());
    }

    info!("FinRAG shutting down");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level));

    if config.observability.json_logging {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
}

async fn interactive_loop(engine: &ContextEngine) -> anyhow::Result<Vec<QueryResult>> {
    println!("\nEnter your questions. Type 'quit' to exit.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut results = Vec::new();

    loop {
        print!("\nYour question: ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let question = line.trim();
        if matches!(question.to_lowercase().as_str(), "quit" | "exit" | "q") {
            break;
        }
        if question.is_empty() {
            continue;
        }

        let result = engine.query(question).await;
        print_result(&result);
        results.push(result);
    }

    Ok(results)
}

fn print_result(result: &QueryResult) {
    println!("\n{}", "=".repeat(50));
    println!("Query: {}", result.query);
    println!("Answer: {}", result.answer);
    println!("Reasoning: {}", result.reasoning);
    if result.sub_queries.len() > 1 {
        println!("Sub-queries: {}", result.sub_queries.join(", "));
    }
    println!("Sources: {} documents", result.sources.len());
}
