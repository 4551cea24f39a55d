use crate::{
    events::{EventSink, PoolEvent, StopReason},
    job::Job,
};
use core::any::Any;
use crossbeam_channel::{Receiver, select};
use crossbeam_utils::sync::WaitGroup;
use std::{
    panic::{self, AssertUnwindSafe},
    sync::Arc,
    time::Instant,
};
use tokio_util::sync::CancellationToken;

/// Worker thread body: consumes jobs from the shared queue until it is closed
/// and drained, or until cancellation fires.
///
/// Each iteration waits on both the queue and the `stop` channel. `stop`
/// never carries a value; it disconnects when the cancellation watcher sees
/// the token fire, which wakes every worker at once.
///
/// # Arguments
///
/// - `worker_id`: Ordinal of this worker, starting at 1.
/// - `jobs`: Receiving half of the shared job queue.
/// - `stop`: Disconnects when cancellation has been requested.
/// - `cancel`: The caller's cancellation token, re-checked before every job so
///   nothing new starts once cancellation fired.
/// - `sink`: Destination for lifecycle events.
/// - `done`: This worker's share of the pool's completion tracker.
///
/// # Exit paths
///
/// - Queue closed and empty: [`StopReason::QueueClosed`].
/// - Cancellation observed before the next job starts:
///   [`StopReason::Cancelled`]. A job already dequeued at that point is
///   reported as abandoned and dropped unprocessed.
///
/// `done` is released exactly once on every path, unwinding included.
pub fn worker_loop<J: Job>(
    worker_id: usize,
    jobs: Receiver<J>,
    stop: Receiver<()>,
    cancel: CancellationToken,
    sink: Arc<dyn EventSink>,
    done: WaitGroup,
) {
    // Declared first so it drops last, after the stop event is recorded.
    let _done = done;

    sink.record(PoolEvent::WorkerStarted { worker: worker_id });

    let reason = loop {
        // The watcher may not have disconnected `stop` yet when the token
        // fired before this worker started, or while it was busy.
        if cancel.is_cancelled() {
            break StopReason::Cancelled;
        }

        select! {
            recv(stop) -> _ => break StopReason::Cancelled,
            recv(jobs) -> msg => match msg {
                Ok(job) => {
                    if cancel.is_cancelled() {
                        sink.record(PoolEvent::JobAbandoned {
                            worker: worker_id,
                            job: job.id(),
                        });
                        break StopReason::Cancelled;
                    }
                    run_job(worker_id, job, sink.as_ref());
                }
                Err(_) if cancel.is_cancelled() => break StopReason::Cancelled,
                Err(_) => break StopReason::QueueClosed,
            },
        }
    };

    // Release our end of the queue before reporting, so a submitter blocked on
    // a queue nobody drains anymore is woken as early as possible.
    drop(jobs);
    drop(stop);

    sink.record(PoolEvent::WorkerStopped {
        worker: worker_id,
        reason,
    });
}

/// Runs one job to completion and reports the outcome.
///
/// Both returned errors and panics count as failures; neither escapes.
fn run_job<J: Job>(worker_id: usize, job: J, sink: &dyn EventSink) {
    let id = job.id();
    sink.record(PoolEvent::JobStarted {
        worker: worker_id,
        job: id.clone(),
    });

    let start = Instant::now();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| job.process()));
    let elapsed = start.elapsed();

    let event = match outcome {
        Ok(Ok(())) => PoolEvent::JobCompleted {
            worker: worker_id,
            job: id,
            elapsed,
        },
        Ok(Err(e)) => PoolEvent::JobFailed {
            worker: worker_id,
            job: id,
            error: e.to_string(),
            elapsed,
        },
        Err(payload) => PoolEvent::JobFailed {
            worker: worker_id,
            job: id,
            error: format!("panicked: {}", panic_message(payload.as_ref())),
            elapsed,
        },
    };
    sink.record(event);
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
