//! Worker pool orchestration.
//!
//! ## Structure
//!
//! - [`manager`] - [`WorkerPool`]: queue ownership, start, submit, shutdown.
//! - `worker` - The loop each worker thread runs.
//! - [`config`] - [`PoolConfig`] sizing and validation.
//! - `cancel` - Bridges the cancellation token into the workers' select loop.

mod cancel;
pub mod config;
pub mod manager;
mod worker;

pub use config::PoolConfig;
pub use manager::WorkerPool;
