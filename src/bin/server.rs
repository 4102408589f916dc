//! sensorhub Server Binary
//!
//! Process supervisor: opens the store, runs the UDP ingestion listener on a
//! background thread and the read-facing query service on the main thread.

use std::process;
use std::sync::Arc;
use std::thread;

use clap::Parser;
use sensorhub::config::SyncStrategy;
use sensorhub::network::Server;
use sensorhub::{Config, DatagramListener, QueryService, Store};
use tracing_subscriber::{fmt, EnvFilter};

/// sensorhub Server
#[derive(Parser, Debug)]
#[command(name = "sensorhub-server")]
#[command(about = "Sensor telemetry hub: UDP ingestion with snapshot and history storage")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./sensorhub_data")]
    data_dir: String,

    /// UDP ingestion address (host:port)
    #[arg(short, long, default_value = "[::]:8888")]
    ingest: String,

    /// Query service listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:5000")]
    listen: String,

    /// Query worker threads
    #[arg(short, long, default_value = "4")]
    workers: usize,

    /// Upserts between snapshot checkpoints (0 = only on shutdown)
    #[arg(short = 'c', long, default_value = "64")]
    checkpoint_interval: u64,

    /// fsync the history log every N entries instead of every entry
    #[arg(long)]
    sync_every: Option<usize>,

    /// Largest accepted datagram in bytes
    #[arg(long, default_value = "1024")]
    max_datagram: usize,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sensorhub=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("sensorhub server v{}", sensorhub::VERSION);
    tracing::info!("Data directory: {}", args.data_dir);

    let sync_strategy = match args.sync_every {
        Some(count) => SyncStrategy::EveryNEntries { count },
        None => SyncStrategy::EveryWrite,
    };

    // Build config from args
    let config = Config::builder()
        .data_dir(&args.data_dir)
        .ingest_addr(&args.ingest)
        .query_addr(&args.listen)
        .workers(args.workers)
        .checkpoint_interval(args.checkpoint_interval)
        .sync_strategy(sync_strategy)
        .max_datagram_size(args.max_datagram)
        .build();

    // Open store
    let store = match Store::open(config.clone()) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            tracing::error!("Failed to open store: {}", e);
            process::exit(1);
        }
    };

    tracing::info!(
        "Store ready: {} nodes, {} history records",
        store.node_count(),
        store.history_len()
    );

    // Without the ingestion socket there is nothing to serve
    let listener = match DatagramListener::bind(&config, Arc::clone(&store)) {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("{}", e);
            process::exit(1);
        }
    };
    let ingest = listener.handle();

    let ingest_thread = match thread::Builder::new()
        .name("ingest".to_string())
        .spawn(move || listener.run())
    {
        Ok(handle) => handle,
        Err(e) => {
            tracing::error!("Failed to start ingestion thread: {}", e);
            process::exit(1);
        }
    };

    // Serve queries on the main thread
    let mut server = Server::new(config, QueryService::new(Arc::clone(&store)));
    let exit_code = match server.run() {
        Ok(()) => 0,
        Err(e) => {
            tracing::error!("Query service error: {}", e);
            1
        }
    };

    // Wind down ingestion before closing the store
    ingest.stop();
    if ingest_thread.join().is_err() {
        tracing::error!("Ingestion thread panicked");
    }

    let counts = ingest.counts();
    tracing::info!(
        "Ingested {} datagrams: {} stored, {} malformed, {} store failures",
        counts.received,
        counts.stored,
        counts.malformed,
        counts.store_failures
    );

    match Arc::try_unwrap(store) {
        Ok(store) => {
            if let Err(e) = store.close() {
                tracing::error!("Failed to close store cleanly: {}", e);
            }
        }
        Err(store) => {
            if let Err(e) = store.checkpoint() {
                tracing::error!("Final checkpoint failed: {}", e);
            }
        }
    }

    tracing::info!("Server stopped");
    process::exit(exit_code);
}
