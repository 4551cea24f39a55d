use crate::error::{Error, Result};

/// Sizing of a [`WorkerPool`](super::WorkerPool).
///
/// - `num_workers`: Number of worker threads. Must be at least 1.
/// - `queue_capacity`: Jobs that may wait in the queue without a consumer.
///   `0` makes every submission a direct hand-off to an idle worker.
/// - `thread_name`: Prefix for worker thread names; the worker ordinal is
///   appended (`drainpool-worker-1`, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    pub num_workers: usize,
    pub queue_capacity: usize,
    pub thread_name: String,
}

impl PoolConfig {
    pub fn new(num_workers: usize, queue_capacity: usize) -> Self {
        Self {
            num_workers,
            queue_capacity,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_thread_name(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name = prefix.into();
        self
    }

    /// Checks that the configuration describes a pool that can run.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] when `num_workers` is zero, or the
    /// thread name prefix is empty or contains a NUL byte (the OS cannot
    /// name a thread after it).
    pub fn validate(&self) -> Result<()> {
        if self.num_workers == 0 {
            return Err(Error::InvalidConfig {
                reason: "num_workers must be greater than 0".to_string(),
            });
        }
        if self.thread_name.trim().is_empty() {
            return Err(Error::InvalidConfig {
                reason: "thread_name must not be empty".to_string(),
            });
        }
        if self.thread_name.contains('\0') {
            return Err(Error::InvalidConfig {
                reason: "thread_name must not contain NUL bytes".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            num_workers: 1,
            queue_capacity: 0,
            thread_name: String::from("drainpool-worker"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_workers() {
        let err = PoolConfig::new(0, 10).validate().unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { .. }));
    }

    #[test]
    fn rejects_blank_thread_name() {
        let err = PoolConfig::new(2, 0)
            .with_thread_name("  ")
            .validate()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { .. }));
    }

    #[test]
    fn rejects_thread_name_with_nul_byte() {
        let err = PoolConfig::new(2, 1)
            .with_thread_name("work\0er")
            .validate()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { .. }));
    }

    #[test]
    fn zero_capacity_is_valid() {
        assert!(PoolConfig::new(1, 0).validate().is_ok());
    }
}
