//! # Telemetry Features
//!
//! Log output is always on: pool and job events go through `tracing` and are
//! printed by `tracing_subscriber::fmt`, filtered by `RUST_LOG` (default
//! `info`).
//!
//! ## Feature matrix
//!
//! - `metrics`: Enables OpenTelemetry metrics (counters, histogram) fed from
//!   pool events.
//! - `stdout`: Enables the stdout metrics exporter.
//!
//! ## Feature constraints
//!
//! - `stdout` requires `metrics`.
//!
//! ## Metrics behavior
//!
//! - `jobs_processed`, `jobs_failed`, `jobs_abandoned`: job outcomes.
//! - `workers_active`: workers currently inside their loop.
//! - `job_duration`: wall time of each job that ran, in milliseconds.
//!
//! ## Example usage
//!
//! ```bash
//! cargo run -p drainpool-cli --features metrics,stdout
//! ```

// Disallow using `stdout` without `metrics`
#[cfg(all(feature = "stdout", not(feature = "metrics")))]
compile_error!("The 'stdout' feature requires 'metrics' to be enabled.");

use anyhow::Context;
use drainpool::{EventSink, PoolEvent, TracingSink};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[cfg(feature = "metrics")]
use opentelemetry::metrics::{Counter, Histogram, Meter, UpDownCounter};
#[cfg(feature = "metrics")]
use opentelemetry::{InstrumentationScope, KeyValue};
#[cfg(feature = "metrics")]
use opentelemetry_sdk::Resource;
#[cfg(feature = "metrics")]
use opentelemetry_sdk::metrics as sdkmetrics;
#[cfg(feature = "metrics")]
use opentelemetry_semantic_conventions as semvcns;
#[cfg(feature = "metrics")]
use std::sync::OnceLock;

pub struct TelemetryProviders {
    #[cfg(feature = "metrics")]
    pub meter_provider: sdkmetrics::SdkMeterProvider,
}

impl TelemetryProviders {
    /// Flushes pending metrics and stops the exporters.
    pub fn shutdown(self) {
        #[cfg(feature = "metrics")]
        {
            if let Err(err) = self.meter_provider.force_flush() {
                eprintln!("Error flushing metrics: {err:#?}");
            }
            if let Err(err) = self.meter_provider.shutdown() {
                eprintln!("Error shutting down meter: {err:#?}");
            }
        }
    }
}

pub fn init_telemetry() -> anyhow::Result<TelemetryProviders> {
    #[cfg(feature = "metrics")]
    let meter_provider = init_metrics();

    let registry = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_thread_ids(true)
                .with_thread_names(true)
                .with_target(false),
        );

    #[cfg(feature = "metrics")]
    let registry = {
        let scope = InstrumentationScope::builder("drainpool")
            .with_version(env!("CARGO_PKG_VERSION"))
            .with_schema_url(semvcns::SCHEMA_URL)
            .build();

        opentelemetry::global::set_meter_provider(meter_provider.clone());
        let meter = opentelemetry::global::meter_with_scope(scope);
        init_metric_handles(meter);

        registry.with(tracing_opentelemetry::MetricsLayer::new(
            meter_provider.clone(),
        ))
    };

    registry
        .try_init()
        .context("failed to install the tracing subscriber")?;

    Ok(TelemetryProviders {
        #[cfg(feature = "metrics")]
        meter_provider,
    })
}

#[cfg(feature = "metrics")]
fn resource() -> Resource {
    Resource::builder()
        .with_service_name("drainpool")
        .with_schema_url(
            [KeyValue::new(
                semvcns::resource::SERVICE_VERSION,
                env!("CARGO_PKG_VERSION"),
            )],
            semvcns::SCHEMA_URL,
        )
        .build()
}

#[cfg(feature = "metrics")]
fn init_metrics() -> sdkmetrics::SdkMeterProvider {
    let builder = sdkmetrics::SdkMeterProvider::builder().with_resource(resource());

    #[cfg(feature = "stdout")]
    let builder = {
        use opentelemetry_stdout::MetricExporter;
        let exporter = MetricExporter::default();
        let reader = sdkmetrics::PeriodicReader::builder(exporter)
            .with_interval(std::time::Duration::from_secs(5))
            .build();

        builder.with_reader(reader)
    };

    builder.build()
}

// Metric handles - only compiled when metrics feature is enabled
#[cfg(feature = "metrics")]
static JOBS_PROCESSED: OnceLock<Counter<u64>> = OnceLock::new();
#[cfg(feature = "metrics")]
static JOBS_FAILED: OnceLock<Counter<u64>> = OnceLock::new();
#[cfg(feature = "metrics")]
static JOBS_ABANDONED: OnceLock<Counter<u64>> = OnceLock::new();
#[cfg(feature = "metrics")]
static WORKERS_ACTIVE: OnceLock<UpDownCounter<i64>> = OnceLock::new();
#[cfg(feature = "metrics")]
static JOB_DURATION_MS: OnceLock<Histogram<f64>> = OnceLock::new();

#[cfg(feature = "metrics")]
fn init_metric_handles(meter: Meter) {
    let _ = JOBS_PROCESSED.set(
        meter
            .u64_counter("jobs_processed")
            .with_description("Jobs that ran to completion")
            .build(),
    );

    let _ = JOBS_FAILED.set(
        meter
            .u64_counter("jobs_failed")
            .with_description("Jobs that returned an error or panicked")
            .build(),
    );

    let _ = JOBS_ABANDONED.set(
        meter
            .u64_counter("jobs_abandoned")
            .with_description("Queued jobs dropped after cancellation")
            .build(),
    );

    let _ = WORKERS_ACTIVE.set(
        meter
            .i64_up_down_counter("workers_active")
            .with_description("Workers inside their processing loop")
            .build(),
    );

    let _ = JOB_DURATION_MS.set(
        meter
            .f64_histogram("job_duration")
            .with_unit("ms")
            .with_description("Wall time spent in a job")
            .build(),
    );
}

// Convenience functions that compile to no-ops when metrics are disabled
#[cfg(feature = "metrics")]
pub fn increment_jobs_processed() {
    if let Some(counter) = JOBS_PROCESSED.get() {
        counter.add(1, &[]);
    }
}

#[cfg(not(feature = "metrics"))]
pub fn increment_jobs_processed() {}

#[cfg(feature = "metrics")]
pub fn increment_jobs_failed() {
    if let Some(counter) = JOBS_FAILED.get() {
        counter.add(1, &[]);
    }
}

#[cfg(not(feature = "metrics"))]
pub fn increment_jobs_failed() {}

#[cfg(feature = "metrics")]
pub fn increment_jobs_abandoned() {
    if let Some(counter) = JOBS_ABANDONED.get() {
        counter.add(1, &[]);
    }
}

#[cfg(not(feature = "metrics"))]
pub fn increment_jobs_abandoned() {}

#[cfg(feature = "metrics")]
pub fn increment_workers_active() {
    if let Some(counter) = WORKERS_ACTIVE.get() {
        counter.add(1, &[]);
    }
}

#[cfg(not(feature = "metrics"))]
pub fn increment_workers_active() {}

#[cfg(feature = "metrics")]
pub fn decrement_workers_active() {
    if let Some(counter) = WORKERS_ACTIVE.get() {
        counter.add(-1, &[]);
    }
}

#[cfg(not(feature = "metrics"))]
pub fn decrement_workers_active() {}

#[cfg(feature = "metrics")]
pub fn record_job_duration(duration_ms: f64) {
    if let Some(histogram) = JOB_DURATION_MS.get() {
        histogram.record(duration_ms, &[]);
    }
}

#[cfg(not(feature = "metrics"))]
pub fn record_job_duration(_duration_ms: f64) {}

/// Pool event sink for the binary: updates metrics, then logs through
/// [`TracingSink`].
#[derive(Clone, Copy, Debug, Default)]
pub struct TelemetrySink;

impl EventSink for TelemetrySink {
    fn record(&self, event: PoolEvent) {
        match &event {
            PoolEvent::WorkerStarted { .. } => increment_workers_active(),
            PoolEvent::WorkerStopped { .. } => decrement_workers_active(),
            PoolEvent::JobCompleted { elapsed, .. } => {
                increment_jobs_processed();
                record_job_duration(elapsed.as_secs_f64() * 1000.0);
            }
            PoolEvent::JobFailed { elapsed, .. } => {
                increment_jobs_failed();
                record_job_duration(elapsed.as_secs_f64() * 1000.0);
            }
            PoolEvent::JobAbandoned { .. } => increment_jobs_abandoned(),
            _ => {}
        }
        TracingSink.record(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::time::Duration;
    use drainpool::{JobId, StopReason};

    #[test]
    fn sink_accepts_every_event_without_a_subscriber() {
        let sink = TelemetrySink;
        for event in [
            PoolEvent::PoolStarted { workers: 1 },
            PoolEvent::WorkerStarted { worker: 1 },
            PoolEvent::JobStarted {
                worker: 1,
                job: JobId::Num(1),
            },
            PoolEvent::JobCompleted {
                worker: 1,
                job: JobId::Num(1),
                elapsed: Duration::from_millis(3),
            },
            PoolEvent::JobFailed {
                worker: 1,
                job: JobId::Num(2),
                error: "boom".into(),
                elapsed: Duration::from_millis(1),
            },
            PoolEvent::JobAbandoned {
                worker: 1,
                job: JobId::Num(3),
            },
            PoolEvent::WorkerStopped {
                worker: 1,
                reason: StopReason::Cancelled,
            },
            PoolEvent::QueueClosed,
            PoolEvent::ShutdownComplete,
        ] {
            sink.record(event);
        }
    }
}
