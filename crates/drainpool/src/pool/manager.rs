//! Bounded worker pool over a shared job queue.
//!
//! This module defines the [`WorkerPool`] struct, which owns a bounded MPMC
//! queue and a fixed set of worker threads that drain it. Submitters block
//! while the queue is full, which is the pool's only form of backpressure.
//!
//! The pool stops in one of two ways:
//!
//! - [`WorkerPool::shutdown`] closes the queue and waits until every buffered
//!   job has been processed and every worker has exited.
//! - Cancelling the [`CancellationToken`] passed to [`WorkerPool::start`]
//!   makes workers exit as soon as they are idle, abandoning buffered jobs.
//!
//! The two compose: `shutdown` always returns once the workers are gone,
//! whichever path made them leave.

use super::{cancel::CancelWatcher, config::PoolConfig, worker::worker_loop};
use crate::{
    error::{Error, Rejected, Result},
    events::{EventSink, PoolEvent, default_sink},
    job::Job,
};
use crossbeam_channel::{Receiver, SendError, Sender, TrySendError};
use crossbeam_utils::sync::WaitGroup;
use parking_lot::Mutex;
use std::{
    io, mem,
    sync::Arc,
    thread::{self, JoinHandle},
};
use tokio_util::sync::CancellationToken;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Lifecycle {
    Configured,
    Running,
    Draining,
    Stopped,
}

struct PoolState<J> {
    lifecycle: Lifecycle,
    /// Producer side of the queue. `None` once the queue is closed.
    sender: Option<Sender<J>>,
    /// Consumer side, held only until the workers take their clones.
    receiver: Option<Receiver<J>>,
    /// Completion tracker: one outstanding share per live worker.
    tracker: Option<WaitGroup>,
    workers: Vec<JoinHandle<()>>,
    watcher: Option<CancelWatcher>,
}

/// A fixed-size pool of worker threads draining a bounded job queue.
///
/// The pool is `Sync`: share it behind an [`Arc`] to submit from several
/// threads. Its internal lock is never held while a submitter blocks on a full
/// queue or while [`shutdown`](Self::shutdown) waits for workers.
///
/// Dropping a pool performs a graceful [`shutdown`](Self::shutdown).
pub struct WorkerPool<J> {
    config: PoolConfig,
    sink: Arc<dyn EventSink>,
    state: Mutex<PoolState<J>>,
}

impl<J: Job> WorkerPool<J> {
    /// Creates a pool of `num_workers` workers over a queue holding up to
    /// `queue_capacity` jobs, reporting to the default event sink.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `num_workers` is zero.
    pub fn new(num_workers: usize, queue_capacity: usize) -> Result<Self> {
        Self::with_config(PoolConfig::new(num_workers, queue_capacity), default_sink())
    }

    /// Creates a pool from an explicit configuration and event sink.
    ///
    /// Nothing is spawned until [`start`](Self::start).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the configuration does not
    /// validate.
    pub fn with_config(config: PoolConfig, sink: Arc<dyn EventSink>) -> Result<Self> {
        config.validate()?;
        let (sender, receiver) = crossbeam_channel::bounded(config.queue_capacity);

        Ok(Self {
            config,
            sink,
            state: Mutex::new(PoolState {
                lifecycle: Lifecycle::Configured,
                sender: Some(sender),
                receiver: Some(receiver),
                tracker: None,
                workers: Vec::new(),
                watcher: None,
            }),
        })
    }

    /// Spawns the workers, all bound to the shared queue and to `cancel`.
    ///
    /// Each worker's completion share is taken before its thread exists, so
    /// [`shutdown`](Self::shutdown) can never observe a drained pool before
    /// the workers have even begun.
    ///
    /// # Errors
    ///
    /// - [`Error::AlreadyStarted`] if the pool is already running.
    /// - [`Error::ShuttingDown`] if the pool was shut down before starting.
    /// - [`Error::Spawn`] if a thread could not be spawned. The pool has then
    ///   been shut down, after letting the workers that did start drain the
    ///   queue.
    pub fn start(&self, cancel: &CancellationToken) -> Result<()> {
        let mut state = self.state.lock();
        match state.lifecycle {
            Lifecycle::Configured => {}
            Lifecycle::Running => return Err(Error::AlreadyStarted),
            Lifecycle::Draining | Lifecycle::Stopped => return Err(Error::ShuttingDown),
        }
        let Some(receiver) = state.receiver.take() else {
            return Err(Error::AlreadyStarted);
        };

        let requested = self.config.num_workers;
        let prefix = &self.config.thread_name;

        let (watcher, stop) = match CancelWatcher::spawn(cancel, format!("{prefix}-cancel")) {
            Ok(spawned) => spawned,
            Err(source) => {
                drop(receiver);
                drop(state);
                self.shutdown();
                return Err(Error::Spawn {
                    requested,
                    spawned: 0,
                    source,
                });
            }
        };

        self.sink.record(PoolEvent::PoolStarted { workers: requested });

        let tracker = WaitGroup::new();
        let mut workers = Vec::with_capacity(requested);
        let mut failure = None;

        for worker_id in 1..=requested {
            let jobs = receiver.clone();
            let stop = stop.clone();
            let cancel = cancel.clone();
            let sink = Arc::clone(&self.sink);
            let done = tracker.clone();

            let spawned = spawn_worker(format!("{prefix}-{worker_id}"), move || {
                worker_loop(worker_id, jobs, stop, cancel, sink, done);
            });

            match spawned {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    #[cfg(feature = "tracing")]
                    tracing::error!("Failed to spawn worker {worker_id}: {e}");
                    failure = Some(e);
                    break;
                }
            }
        }

        let spawned = workers.len();
        state.tracker = Some(tracker);
        state.workers = workers;
        state.watcher = Some(watcher);
        state.lifecycle = Lifecycle::Running;
        drop(state);

        if let Some(source) = failure {
            self.shutdown();
            return Err(Error::Spawn {
                requested,
                spawned,
                source,
            });
        }

        Ok(())
    }

    /// Enqueues a job, blocking while the queue is full.
    ///
    /// Jobs submitted before [`start`](Self::start) are buffered up to the
    /// queue capacity.
    ///
    /// # Errors
    ///
    /// Hands the job back with [`Error::ShuttingDown`] if shutdown has begun,
    /// or if every worker has already exited after cancellation. A submitter
    /// blocked on a full queue when that happens is released with the same
    /// error.
    pub fn submit(&self, job: J) -> core::result::Result<(), Rejected<J>> {
        let Some(sender) = self.open_sender() else {
            return Err(Rejected::new(job, Error::ShuttingDown));
        };

        sender
            .send(job)
            .map_err(|SendError(job)| Rejected::new(job, Error::ShuttingDown))
    }

    /// Enqueues a job only if that does not require waiting.
    ///
    /// With a zero-capacity queue this succeeds only when a worker is idle and
    /// waiting at that moment.
    ///
    /// # Errors
    ///
    /// Hands the job back with [`Error::QueueFull`] if the queue is at
    /// capacity, or [`Error::ShuttingDown`] as for [`submit`](Self::submit).
    pub fn try_submit(&self, job: J) -> core::result::Result<(), Rejected<J>> {
        let Some(sender) = self.open_sender() else {
            return Err(Rejected::new(job, Error::ShuttingDown));
        };

        sender.try_send(job).map_err(|e| match e {
            TrySendError::Full(job) => Rejected::new(job, Error::QueueFull),
            TrySendError::Disconnected(job) => Rejected::new(job, Error::ShuttingDown),
        })
    }

    // Clones the sender so the lock is released before a potentially blocking
    // send. A clone taken just before shutdown keeps the queue open until that
    // one send completes; workers keep draining meanwhile.
    fn open_sender(&self) -> Option<Sender<J>> {
        let state = self.state.lock();
        match state.lifecycle {
            Lifecycle::Configured | Lifecycle::Running => state.sender.clone(),
            Lifecycle::Draining | Lifecycle::Stopped => None,
        }
    }
}

impl<J> WorkerPool<J> {
    /// Closes the queue and blocks until every worker has exited.
    ///
    /// Without cancellation, every job accepted before this call is processed
    /// first. If the cancellation token fired, workers leave as soon as they
    /// finish their current job and the remaining buffered jobs are dropped.
    ///
    /// Idempotent: calls after the first return immediately, even while the
    /// first is still waiting. Shutting down a pool that was never started
    /// drops whatever was buffered.
    ///
    /// A worker cannot wait for itself. When called from inside one of this
    /// pool's jobs (including by dropping the last handle to the pool there),
    /// the queue is closed and the call returns at once; a separate reaper
    /// thread waits for the workers and records
    /// [`PoolEvent::ShutdownComplete`]. The pool then stays out of the running
    /// state but never reports itself stopped.
    pub fn shutdown(&self) {
        let (tracker, workers, watcher) = {
            let mut state = self.state.lock();
            match state.lifecycle {
                Lifecycle::Configured | Lifecycle::Running => {}
                Lifecycle::Draining | Lifecycle::Stopped => return,
            }
            state.lifecycle = Lifecycle::Draining;
            state.sender = None;
            state.receiver = None;
            (
                state.tracker.take(),
                mem::take(&mut state.workers),
                state.watcher.take(),
            )
        };

        self.sink.record(PoolEvent::QueueClosed);

        let current = thread::current().id();
        if workers.iter().any(|h| h.thread().id() == current) {
            let sink = Arc::clone(&self.sink);
            let reaper = thread::Builder::new()
                .name(format!("{}-reaper", self.config.thread_name))
                .spawn(move || {
                    reap(tracker, workers, watcher);
                    sink.record(PoolEvent::ShutdownComplete);
                });
            if let Err(_e) = reaper {
                #[cfg(feature = "tracing")]
                tracing::error!("Failed to spawn shutdown reaper, workers are detached: {_e}");
            }
            return;
        }

        reap(tracker, workers, watcher);

        self.state.lock().lifecycle = Lifecycle::Stopped;
        self.sink.record(PoolEvent::ShutdownComplete);
    }

    /// Number of workers this pool runs once started.
    pub const fn num_workers(&self) -> usize {
        self.config.num_workers
    }

    /// Maximum number of jobs buffered without a consumer.
    pub const fn queue_capacity(&self) -> usize {
        self.config.queue_capacity
    }

    /// Jobs currently waiting in the queue. Zero once the queue is closed.
    pub fn queued(&self) -> usize {
        self.state.lock().sender.as_ref().map_or(0, Sender::len)
    }

    /// Whether the pool has been started and not yet shut down.
    pub fn is_running(&self) -> bool {
        self.state.lock().lifecycle == Lifecycle::Running
    }
}

/// Dropping blocks like [`WorkerPool::shutdown`], except when the last handle
/// is dropped inside one of the pool's own jobs, where teardown is handed to
/// a reaper thread.
impl<J> Drop for WorkerPool<J> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Waits for every worker to release its tracker share, joins the threads
/// and retires the cancellation watcher.
fn reap(
    tracker: Option<WaitGroup>,
    workers: Vec<JoinHandle<()>>,
    watcher: Option<CancelWatcher>,
) {
    if let Some(tracker) = tracker {
        tracker.wait();
    }

    for handle in workers {
        // Job panics are caught inside the worker; this only reaps the
        // thread.
        if let Err(_e) = handle.join() {
            #[cfg(feature = "tracing")]
            tracing::error!("Worker thread panicked outside of a job: {_e:?}");
        }
    }

    if let Some(watcher) = watcher {
        watcher.release();
    }
}

#[cfg(test)]
thread_local! {
    /// Worker spawns still allowed on this thread before `spawn_worker`
    /// starts failing. `None` means unlimited.
    pub(super) static SPAWN_BUDGET: core::cell::Cell<Option<usize>> =
        const { core::cell::Cell::new(None) };
}

fn spawn_worker<F>(name: String, body: F) -> io::Result<JoinHandle<()>>
where
    F: FnOnce() + Send + 'static,
{
    #[cfg(test)]
    if let Some(left) = SPAWN_BUDGET.get() {
        if left == 0 {
            return Err(io::Error::other("worker spawn budget exhausted"));
        }
        SPAWN_BUDGET.set(Some(left - 1));
    }

    thread::Builder::new().name(name).spawn(body)
}
