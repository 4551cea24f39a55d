#![doc = include_str!("../README.md")]

mod app;

use anyhow::Context;
use app::config::{CliArgs, RunConfig};
use app::feeder::feed_jobs;
use app::job::SleepJob;
use app::shutdown::listen_for_signals;
use app::telemetry::{TelemetrySink, init_telemetry};
use clap::Parser;
use drainpool::{CancellationToken, WorkerPool};
use std::sync::Arc;
use tokio::runtime::Handle;

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = RunConfig::try_from(args)?;

    let providers = init_telemetry()?;
    log_startup_info(&config);

    let cancel = CancellationToken::new();
    let signals = tokio::spawn(listen_for_signals(cancel.clone()));

    let pool: Arc<WorkerPool<SleepJob>> = Arc::new(WorkerPool::with_config(
        config.pool.clone(),
        Arc::new(TelemetrySink),
    )?);
    pool.start(&cancel)?;

    let feeder = {
        let pool = Arc::clone(&pool);
        let cancel = cancel.clone();
        let handle = Handle::current();
        tokio::task::spawn_blocking(move || feed_jobs(&pool, &cancel, &config, &handle))
    };
    let accepted = feeder.await.context("job feeder panicked")?;

    // The pool is stopped by now; this only releases the signal listener.
    cancel.cancel();
    let _ = signals.await;

    tracing::info!(accepted, "Shutdown complete");
    providers.shutdown();
    Ok(())
}

fn log_startup_info(config: &RunConfig) {
    if cfg!(debug_assertions) {
        tracing::info!("Starting worker pool with full config: {:#?}", config);
    } else {
        tracing::info!(
            "Starting worker pool with {} workers and a queue of {}",
            config.pool.num_workers,
            config.pool.queue_capacity
        );
    }
}
