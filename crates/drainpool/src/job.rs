//! The unit of work executed by the pool.
//!
//! A [`Job`] couples an identity with whatever payload its `process` needs.
//! Ownership moves from the submitter into the queue and from the queue into
//! exactly one worker, which consumes the job when it runs it.

use crate::error::BoxError;
use core::fmt;

/// Caller-assigned identity of a job.
///
/// The pool never checks uniqueness. Duplicate ids are the submitter's
/// concern; they only make events harder to read.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum JobId {
    Num(u64),
    Name(String),
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Num(n) => write!(f, "{n}"),
            Self::Name(name) => f.write_str(name),
        }
    }
}

impl From<u64> for JobId {
    fn from(n: u64) -> Self {
        Self::Num(n)
    }
}

impl From<&str> for JobId {
    fn from(name: &str) -> Self {
        Self::Name(name.to_owned())
    }
}

impl From<String> for JobId {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

/// A unit of work that a worker runs to completion.
///
/// `process` executes synchronously on the worker's own thread. It is never
/// interrupted: cancellation only prevents jobs that have not started yet.
///
/// Returning an error, or panicking, is reported to the pool's
/// [`EventSink`](crate::EventSink) as a failed job; the worker then moves on
/// to the next one.
pub trait Job: Send + 'static {
    /// Identity used in events and logs.
    fn id(&self) -> JobId;

    /// Performs the work. Returns only once the work is complete.
    ///
    /// # Errors
    ///
    /// Any error describing why the work failed. It is reported, not retried.
    fn process(self) -> Result<(), BoxError>;
}

impl<F> Job for (JobId, F)
where
    F: FnOnce() -> Result<(), BoxError> + Send + 'static,
{
    fn id(&self) -> JobId {
        self.0.clone()
    }

    fn process(self) -> Result<(), BoxError> {
        (self.1)()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_id_display() {
        assert_eq!(JobId::from(42_u64).to_string(), "42");
        assert_eq!(JobId::from("Task-1").to_string(), "Task-1");
        assert_eq!(JobId::from(String::from("x")), JobId::Name("x".into()));
    }

    #[test]
    fn closure_pair_is_a_job() {
        let job = (JobId::from(3_u64), || -> Result<(), BoxError> { Err("boom".into()) });
        assert_eq!(job.id(), JobId::Num(3));
        let err = job.process().unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }
}
