//! shelverd: the shelving daemon.
//!
//! Wires the core together: discovery scanner, task queue, consumer loops,
//! batch coordinator and event logging. Batches are submitted either by the
//! auto-confirm policy below or by whatever front end is put in front of the
//! [`BatchJobService`].

mod pipeline;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shelver_core::{
    load_config, metrics, spawn_event_logger, validate_config, BatchJobService, BatchProcessor,
    Config, EventHandle, ExtensionClassifier, FsMover, MemoryJobStore, QueueConsumer, Scanner,
    SqliteFileStore, TaskQueue,
};
use shelver_core::jobs::JobResultStore;
use shelver_core::tracked_file::FileStore;

use pipeline::PipelineLoop;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("shelverd {VERSION} starting");

    // Determine config path
    let config_path = std::env::var("SHELVER_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration; a missing file means defaults plus env overrides.
    let config = if config_path.exists() {
        info!("Loading configuration from {:?}", config_path);
        load_config(&config_path)
            .with_context(|| format!("Failed to load config from {:?}", config_path))?
    } else {
        warn!(
            "Config file {:?} not found, using defaults",
            config_path
        );
        Config::default()
    };
    validate_config(&config).context("Configuration validation failed")?;

    info!("Database path: {:?}", config.database.path);
    info!("Library root: {:?}", config.processor.library_root);
    info!("Scan roots: {:?}", config.scanner.roots);

    // Metrics registry (process-local; exposition is a front-end concern)
    let registry = prometheus::Registry::new();
    metrics::register_metrics(&registry).context("Failed to register metrics")?;

    // File store
    let store: Arc<dyn FileStore> = Arc::new(
        SqliteFileStore::new(&config.database.path).context("Failed to open file store")?,
    );
    info!("File store initialized");

    // Event channel with its single consumer
    let (events, events_rx) = EventHandle::channel(config.events.buffer);
    let event_logger = spawn_event_logger(events_rx);

    // Shutdown signal shared by every loop
    let shutdown = CancellationToken::new();

    // Task queue and consumers
    let queue = Arc::new(TaskQueue::new(&config.queue));
    let consumers = QueueConsumer::spawn_pool(
        Arc::clone(&queue),
        shutdown.clone(),
        config.queue.consumers,
    );
    info!(
        capacity = queue.capacity(),
        consumers = config.queue.consumers,
        "Task queue started"
    );

    // Batch coordinator over the real collaborators
    let processor = Arc::new(
        BatchProcessor::new(
            config.processor.clone(),
            Arc::clone(&store),
            ExtensionClassifier::new(),
            FsMover::new(config.mover.clone()),
        )
        .with_events(events.clone()),
    );

    // Batch submission service (also the seam a front end would call)
    let results: Arc<dyn JobResultStore> = Arc::new(MemoryJobStore::new());
    let service = Arc::new(
        BatchJobService::new(
            Arc::clone(&queue),
            Arc::clone(&store),
            Arc::clone(&processor),
            Arc::clone(&results),
            shutdown.clone(),
        )
        .with_events(events.clone()),
    );

    // Discovery scanner
    let scanner = Scanner::new(config.scanner.clone(), Arc::clone(&store))
        .with_events(events.clone());

    // The pipeline loop: scan, classify, auto-confirm
    let pipeline = PipelineLoop::new(
        scanner,
        Arc::clone(&store),
        Arc::clone(&queue),
        Arc::clone(&processor),
        Arc::clone(&service),
        config.processor.auto_confirm_threshold,
        shutdown.clone(),
    );
    let pipeline_handle = pipeline.spawn();

    info!("shelverd running, press ctrl-c to stop");
    signal::ctrl_c().await.context("Failed to listen for ctrl-c")?;
    info!("Shutdown signal received, draining");

    shutdown.cancel();
    pipeline_handle.await.ok();
    for consumer in consumers {
        consumer.await.ok();
    }

    // Dropping the last event handles lets the logger drain and exit.
    drop(events);
    drop(processor);
    drop(service);
    drop(queue);
    event_logger.await.ok();

    info!("shelverd stopped");
    Ok(())
}
