//! Structured lifecycle events emitted by the pool and its workers.
//!
//! Every status change the pool goes through is reported as a [`PoolEvent`]
//! to an injectable [`EventSink`]. This keeps reporting out of the hot path's
//! control flow and lets tests assert on what happened instead of scraping
//! console output.
//!
//! ## Sinks
//!
//! - [`NoopSink`] - Discards everything. Default when the `tracing` feature is
//!   disabled.
//! - [`TracingSink`] - Forwards events to `tracing`. Default when the
//!   `tracing` feature is enabled.
//! - [`MemorySink`] - Records events in memory for later inspection.

use crate::job::JobId;
use core::time::Duration;
use parking_lot::Mutex;

/// Why a worker left its loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StopReason {
    /// The queue was closed and fully drained.
    QueueClosed,
    /// The cancellation signal fired.
    Cancelled,
}

/// A single observable step in the pool's lifecycle.
///
/// Worker ordinals start at 1.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PoolEvent {
    PoolStarted { workers: usize },
    WorkerStarted { worker: usize },
    JobStarted {
        worker: usize,
        job: JobId,
    },
    JobCompleted {
        worker: usize,
        job: JobId,
        elapsed: Duration,
    },
    /// The job returned an error or panicked. The worker keeps running.
    JobFailed {
        worker: usize,
        job: JobId,
        error: String,
        elapsed: Duration,
    },
    /// The job was dequeued after cancellation fired and was never started.
    JobAbandoned { worker: usize, job: JobId },
    WorkerStopped { worker: usize, reason: StopReason },
    /// The queue stopped accepting submissions.
    QueueClosed,
    /// Every worker has exited.
    ShutdownComplete,
}

/// Receiver of [`PoolEvent`]s.
///
/// Called synchronously from worker threads and from whichever thread drives
/// the pool, so implementations must be cheap and must not block on the pool.
pub trait EventSink: Send + Sync {
    fn record(&self, event: PoolEvent);
}

/// Discards every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn record(&self, _event: PoolEvent) {}
}

/// Keeps every event in arrival order.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<PoolEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all events recorded so far.
    pub fn events(&self) -> Vec<PoolEvent> {
        self.events.lock().clone()
    }

    /// Number of recorded events matching `pred`.
    pub fn count(&self, pred: impl Fn(&PoolEvent) -> bool) -> usize {
        self.events.lock().iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for MemorySink {
    fn record(&self, event: PoolEvent) {
        self.events.lock().push(event);
    }
}

/// Forwards events to the `tracing` ecosystem.
///
/// Job failures are logged at `warn`, pool lifecycle at `info`, worker
/// lifecycle at `debug` and per-job progress at `debug`/`trace`.
#[cfg(feature = "tracing")]
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

#[cfg(feature = "tracing")]
impl EventSink for TracingSink {
    fn record(&self, event: PoolEvent) {
        match event {
            PoolEvent::PoolStarted { workers } => {
                tracing::info!(workers, "Worker pool started");
            }
            PoolEvent::WorkerStarted { worker } => {
                tracing::debug!(worker, "Worker started");
            }
            PoolEvent::JobStarted { worker, job } => {
                tracing::debug!(worker, %job, "Processing job");
            }
            PoolEvent::JobCompleted {
                worker,
                job,
                elapsed,
            } => {
                tracing::debug!(worker, %job, ?elapsed, "Completed job");
            }
            PoolEvent::JobFailed {
                worker,
                job,
                error,
                elapsed,
            } => {
                tracing::warn!(worker, %job, ?elapsed, "Job failed: {error}");
            }
            PoolEvent::JobAbandoned { worker, job } => {
                tracing::trace!(worker, %job, "Abandoned job after cancellation");
            }
            PoolEvent::WorkerStopped { worker, reason } => match reason {
                StopReason::QueueClosed => {
                    tracing::debug!(worker, "Worker stopped: queue drained");
                }
                StopReason::Cancelled => {
                    tracing::debug!(worker, "Worker stopped: cancelled");
                }
            },
            PoolEvent::QueueClosed => {
                tracing::info!("Job queue closed, waiting for workers to finish");
            }
            PoolEvent::ShutdownComplete => {
                tracing::info!("Worker pool shutdown complete");
            }
        }
    }
}

/// The sink used when none is supplied.
#[cfg(feature = "tracing")]
pub(crate) fn default_sink() -> std::sync::Arc<dyn EventSink> {
    std::sync::Arc::new(TracingSink)
}

#[cfg(not(feature = "tracing"))]
pub(crate) fn default_sink() -> std::sync::Arc<dyn EventSink> {
    std::sync::Arc::new(NoopSink)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_sink_keeps_order() {
        let sink = MemorySink::new();
        sink.record(PoolEvent::PoolStarted { workers: 2 });
        sink.record(PoolEvent::QueueClosed);
        sink.record(PoolEvent::ShutdownComplete);

        assert_eq!(
            sink.events(),
            vec![
                PoolEvent::PoolStarted { workers: 2 },
                PoolEvent::QueueClosed,
                PoolEvent::ShutdownComplete,
            ]
        );
        assert_eq!(sink.count(|e| matches!(e, PoolEvent::QueueClosed)), 1);
    }
}
