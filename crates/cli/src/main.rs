//! TCR Indexer - contract event ingestion and aggregation
//!
//! This binary provides:
//! - One-shot and polling ingestion of decoded contract event batches
//! - Aggregate projection into SQLite through the dispatch engine
//! - Watermark tracking so replayed batches are idempotent

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use tcr_processor::config::Config;
use tcr_processor::engine::{BatchSummary, Engine};
use tcr_processor::persistence::{optional, CursorStore};
use tcr_processor::processors::{
    ContentProcessor, EventHandler, MultiSigProcessor, ParameterizerProcessor, RegistryProcessor,
    TokenProcessor, VotingProcessor,
};
use tcr_processor::publisher::{NoopPublisher, PubMessage, Publisher, PublishError};
use tcr_processor::scraper::Keccak256Hasher;
use tcr_processor::watermark::{EventSource, Watermark};
use tcr_processor::Event;
use tcr_store_sqlite::Store;

mod source;
use source::JsonFileSource;

#[derive(Parser)]
#[command(name = "tcr-indexer")]
#[command(version, about = "Token-curated registry event indexer", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "indexer.toml")]
    config: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the event file on an interval and process new batches
    Run {
        /// JSON file holding the ordered event batch
        #[arg(long)]
        events: PathBuf,
    },

    /// Process the event file once and exit (cron mode)
    Process {
        /// JSON file holding the ordered event batch
        #[arg(long)]
        events: PathBuf,
    },

    /// Show aggregate counts and watermark progress
    Status,

    /// Initialize the database
    InitDb {
        /// Database URL
        #[arg(long, default_value = "sqlite://tcr.db")]
        database_url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.debug);

    info!("TCR Indexer starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Run { events } => run_indexer(&cli.config, events).await?,
        Commands::Process { events } => process_once(&cli.config, events).await?,
        Commands::Status => show_status(&cli.config).await?,
        Commands::InitDb { database_url } => init_database(&database_url).await?,
    }

    Ok(())
}

/// Initialize tracing subscriber for logging
fn init_logging(debug: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let env_filter = if debug {
        EnvFilter::new("debug,sqlx=info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"))
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_line_number(true))
        .init();
}

/// Publisher that logs governance notifications under a configured topic.
///
/// Stands in for an external message bus: deployments that consume the
/// notifications scrape them from the structured log stream.
struct TopicLogPublisher {
    topic: String,
}

#[async_trait::async_trait]
impl Publisher for TopicLogPublisher {
    async fn publish(&self, message: &PubMessage) -> Result<(), PublishError> {
        info!(
            topic = %self.topic,
            body = %message.to_json(),
            "governance notification"
        );
        Ok(())
    }
}

fn make_publisher(config: &Config) -> Arc<dyn Publisher> {
    match &config.publisher.topic {
        Some(topic) => Arc::new(TopicLogPublisher {
            topic: topic.clone(),
        }),
        None => Arc::new(NoopPublisher),
    }
}

/// Wire all six sub-processors over the SQLite store.
fn build_engine(store: &Store, publisher: Arc<dyn Publisher>) -> Result<Engine> {
    let store = Arc::new(store.clone());
    let handlers: Vec<Arc<dyn EventHandler>> = vec![
        Arc::new(RegistryProcessor::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
        )),
        Arc::new(VotingProcessor::new(store.clone())),
        Arc::new(ParameterizerProcessor::new(store.clone(), store.clone())),
        Arc::new(ContentProcessor::new(
            store.clone(),
            Arc::new(Keccak256Hasher),
            None,
        )),
        Arc::new(TokenProcessor::new(store.clone())),
        Arc::new(MultiSigProcessor::new(store.clone(), publisher.clone())),
    ];
    let engine = Engine::new(handlers, publisher, Arc::new(Mutex::new(())))?;
    Ok(engine)
}

async fn connect_store(config: &Config) -> Result<Store> {
    let store = Store::connect(
        &config.database.url,
        config.database.max_connections,
        config.database.min_connections,
    )
    .await
    .context("Failed to connect to database")?;

    store
        .run_migrations()
        .await
        .context("Failed to run migrations")?;

    Ok(store)
}

/// Fetch, filter, process and advance the watermark for one poll.
async fn process_batch(
    store: &Store,
    engine: &Engine,
    source: &dyn EventSource,
) -> Result<BatchSummary> {
    let watermark = optional(store.watermark().await)?.unwrap_or_else(Watermark::genesis);

    let events = source.fetch_since(&watermark).await?;
    let fresh: Vec<Event> = watermark
        .filter_new(&events)
        .into_iter()
        .cloned()
        .collect();
    if fresh.is_empty() {
        info!("no new events past the watermark");
        return Ok(BatchSummary::default());
    }

    let result = engine.process(&fresh).await;

    // Failed events were logged and skipped by the engine; the cursor
    // still advances so one poisoned event cannot wedge the stream.
    let advanced = watermark.advanced(&fresh);
    store
        .save_watermark(&advanced)
        .await
        .context("Failed to save watermark")?;

    let summary = result?;
    info!(
        processed = summary.processed,
        unclaimed = summary.unclaimed,
        watermark = advanced.timestamp,
        "batch persisted"
    );
    Ok(summary)
}

/// Process the event file once and exit.
async fn process_once(config_path: &str, events: PathBuf) -> Result<()> {
    let config = Config::from_file(config_path).context("Failed to load configuration")?;

    let store = connect_store(&config).await?;
    let engine = build_engine(&store, make_publisher(&config))?;
    let source = JsonFileSource::new(events);

    let outcome = process_batch(&store, &engine, &source).await;
    store.close().await;
    outcome.map(|_| ())
}

/// Poll-loop service mode.
async fn run_indexer(config_path: &str, events: PathBuf) -> Result<()> {
    let config = Config::from_file(config_path).context("Failed to load configuration")?;

    info!("Configuration loaded successfully");
    info!("  Database: {}", config.database.url);
    info!("  Poll interval: {}s", config.poll.interval_secs);

    let store = connect_store(&config).await?;
    let engine = build_engine(&store, make_publisher(&config))?;
    let source = JsonFileSource::new(events);

    let interval = std::time::Duration::from_secs(config.poll.interval_secs);
    info!("Indexer is running. Press Ctrl+C to stop.");

    loop {
        if let Err(err) = process_batch(&store, &engine, &source).await {
            tracing::error!(%err, "poll failed");
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            result = tokio::signal::ctrl_c() => {
                result.context("Failed to listen for Ctrl+C")?;
                info!("Received shutdown signal, gracefully shutting down...");
                break;
            }
        }
    }

    store.close().await;
    Ok(())
}

/// Show aggregate counts and watermark progress.
async fn show_status(config_path: &str) -> Result<()> {
    let config = Config::from_file(config_path).context("Failed to load configuration")?;
    let store = connect_store(&config).await?;

    let stats = store.stats().await?;
    let watermark = optional(store.watermark().await)?;

    println!("\n=== TCR Indexer Status ===\n");
    println!("Database Statistics:");
    println!("  Listings: {}", stats.listing_count);
    println!("  Challenges: {}", stats.challenge_count);
    println!("  Governance Events: {}", stats.governance_event_count);

    match watermark {
        Some(watermark) => {
            println!("\nWatermark:");
            println!("  Timestamp: {}", watermark.timestamp);
            println!(
                "  Time: {}",
                chrono::DateTime::from_timestamp(watermark.timestamp, 0)
                    .map(|dt| dt.to_rfc3339())
                    .unwrap_or_else(|| "unknown".to_string())
            );
            println!("  Events at watermark: {}", watermark.seen.len());
        }
        None => println!("\nNo batches processed yet."),
    }

    println!();

    store.close().await;
    Ok(())
}

/// Initialize the database
async fn init_database(database_url: &str) -> Result<()> {
    info!("Initializing database: {}", database_url);

    let store = Store::new(database_url)
        .await
        .context("Failed to connect to database")?;

    store
        .run_migrations()
        .await
        .context("Failed to run migrations")?;

    store
        .health_check()
        .await
        .context("Database health check failed")?;

    let stats = store.stats().await?;
    info!("Database initialized successfully!");
    info!("  Listings: {}", stats.listing_count);
    info!("  Challenges: {}", stats.challenge_count);
    info!("  Governance events: {}", stats.governance_event_count);

    store.close().await;

    Ok(())
}
