//! Everything the `drainpool` binary runs on top of the pool.
//!
//! ## Structure
//!
//! - [`config`] - CLI/env arguments and the validated [`config::RunConfig`].
//! - [`job`] - [`job::SleepJob`], the demo workload.
//! - [`feeder`] - Paced submission of jobs followed by graceful shutdown.
//! - [`shutdown`] - Turns `SIGINT`/`SIGTERM` into cancellation.
//! - [`telemetry`] - Log subscriber, optional metrics and the pool's event sink.

pub mod config;
pub mod feeder;
pub mod job;
pub mod shutdown;
pub mod telemetry;
