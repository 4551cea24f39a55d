//! Error types for the worker pool.
//!
//! This module defines the central [`Error`] enum, which captures every
//! reportable failure of the pool's own lifecycle, and [`Rejected`], which
//! hands a refused job back to its submitter together with the reason.
//!
//! ## Error Cases
//! - `InvalidConfig`: The pool was configured with impossible values.
//! - `AlreadyStarted`: `start` was called on a pool that already ran.
//! - `ShuttingDown`: A job arrived after shutdown began, or after every worker
//!   exited.
//! - `QueueFull`: A non-blocking submission found the queue at capacity.
//! - `Spawn`: The OS refused to start a worker thread.
//!
//! Failures raised by a job's own `process` are not part of this enum. They
//! never cross the worker boundary and are reported to the event sink instead.

use core::fmt;
use std::io;

pub type Result<T> = core::result::Result<T, Error>;

/// Boxed error returned by [`Job::process`](crate::Job::process).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Unified error type for the worker pool.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The configuration cannot produce a working pool.
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// The pool was already started once.
    #[error("Pool has already been started")]
    AlreadyStarted,

    /// The queue is closed to new submissions.
    #[error("Pool is shutting down")]
    ShuttingDown,

    /// The queue is at capacity and the caller asked not to block.
    #[error("Job queue is full")]
    QueueFull,

    /// A worker thread could not be spawned.
    #[error("Spawned {spawned} of {requested} workers: {source}")]
    Spawn {
        requested: usize,
        spawned: usize,
        #[source]
        source: io::Error,
    },
}

/// A job the pool refused to accept.
///
/// The job is returned untouched so the submitter decides what to do with it.
#[derive(thiserror::Error)]
#[error("Job rejected: {reason}")]
pub struct Rejected<J> {
    job: J,
    #[source]
    reason: Error,
}

impl<J> Rejected<J> {
    pub(crate) const fn new(job: J, reason: Error) -> Self {
        Self { job, reason }
    }

    /// The reason the job was refused.
    pub const fn reason(&self) -> &Error {
        &self.reason
    }

    /// Takes back ownership of the refused job.
    pub fn into_job(self) -> J {
        self.job
    }

    /// Splits into the job and the reason.
    pub fn into_parts(self) -> (J, Error) {
        (self.job, self.reason)
    }
}

// Manual impl so `J` does not need to be `Debug`.
impl<J> fmt::Debug for Rejected<J> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rejected")
            .field("reason", &self.reason)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_returns_the_job() {
        let rejected = Rejected::new(String::from("Task-7"), Error::ShuttingDown);
        assert!(matches!(rejected.reason(), Error::ShuttingDown));
        assert_eq!(rejected.to_string(), "Job rejected: Pool is shutting down");
        assert_eq!(rejected.into_job(), "Task-7");
    }

    #[test]
    fn spawn_error_reports_counts() {
        let err = Error::Spawn {
            requested: 4,
            spawned: 1,
            source: io::Error::other("out of threads"),
        };
        assert_eq!(err.to_string(), "Spawned 1 of 4 workers: out of threads");
        assert!(std::error::Error::source(&err).is_some());
    }
}
