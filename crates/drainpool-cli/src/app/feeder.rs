//! Paced submission of demo jobs.
//!
//! The feeder runs on a blocking thread because [`WorkerPool::submit`] blocks
//! while the queue is full. Pauses between submissions go through the async
//! runtime so cancellation cuts them short.

use super::{config::RunConfig, job::SleepJob};
use drainpool::{CancellationToken, WorkerPool};
use tokio::runtime::Handle;

/// Submits `config.num_jobs` jobs, one per `config.submit_interval`, then
/// shuts the pool down and waits for it to drain.
///
/// Stops submitting early if `cancel` fires or the pool rejects a job. Returns
/// how many jobs were accepted.
pub fn feed_jobs(
    pool: &WorkerPool<SleepJob>,
    cancel: &CancellationToken,
    config: &RunConfig,
    handle: &Handle,
) -> u64 {
    let mut accepted = 0;

    for id in 1..=config.num_jobs {
        if cancel.is_cancelled() {
            tracing::info!("Cancellation requested, no further jobs will be submitted");
            break;
        }

        let job = SleepJob::new(id, config.job_duration);
        tracing::info!(job = id, payload = %job.payload, queued = pool.queued(), "Submitting job");

        if let Err(rejected) = pool.submit(job) {
            tracing::warn!(job = id, "{rejected}");
            break;
        }
        accepted += 1;

        let interrupted = handle.block_on(async {
            tokio::select! {
                () = cancel.cancelled() => true,
                () = tokio::time::sleep(config.submit_interval) => false,
            }
        });
        if interrupted {
            tracing::info!("Cancellation requested, no further jobs will be submitted");
            break;
        }
    }

    tracing::info!(accepted, "All jobs submitted, shutting down worker pool");
    pool.shutdown();
    accepted
}
