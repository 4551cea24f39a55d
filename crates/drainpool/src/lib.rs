#![doc = include_str!("../README.md")]

mod error;
pub mod events;
mod job;
pub mod pool;

pub use error::{BoxError, Error, Rejected, Result};
pub use events::{EventSink, MemorySink, NoopSink, PoolEvent, StopReason};
#[cfg(feature = "tracing")]
pub use events::TracingSink;
pub use job::{Job, JobId};
pub use pool::{PoolConfig, WorkerPool};
// Public re-export so callers construct the cancellation signal without
// depending on `tokio-util` directly.
pub use tokio_util::sync::CancellationToken;
