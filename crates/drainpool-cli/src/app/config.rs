use anyhow::bail;
use clap::Parser;
use core::time::Duration;
use drainpool::PoolConfig;

/// Runtime configuration for the `drainpool` binary.
///
/// These settings size the worker pool and shape the demo workload fed into
/// it. All values are parsed from CLI arguments or environment variables.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "drainpool",
    version,
    about = "Runs a bounded worker pool over paced demo jobs"
)]
pub struct CliArgs {
    /// Number of worker threads draining the queue.
    ///
    /// Environment variable: `NUM_WORKERS`
    #[arg(long, env = "NUM_WORKERS", default_value_t = 3)]
    pub num_workers: usize,

    /// Number of jobs the queue buffers before submitters block.
    ///
    /// Zero makes every submission a direct hand-off to an idle worker.
    ///
    /// Environment variable: `QUEUE_CAPACITY`
    #[arg(long, env = "QUEUE_CAPACITY", default_value_t = 10)]
    pub queue_capacity: usize,

    /// Total number of jobs to submit before shutting down.
    ///
    /// Environment variable: `NUM_JOBS`
    #[arg(long, env = "NUM_JOBS", default_value_t = 15)]
    pub num_jobs: u64,

    /// Pause between two submissions, in milliseconds.
    ///
    /// Environment variable: `SUBMIT_INTERVAL_MS`
    #[arg(long, env = "SUBMIT_INTERVAL_MS", default_value_t = 500)]
    pub submit_interval_ms: u64,

    /// How long each job works for, in milliseconds.
    ///
    /// Environment variable: `JOB_DURATION_MS`
    #[arg(long, env = "JOB_DURATION_MS", default_value_t = 2000)]
    pub job_duration_ms: u64,

    /// Prefix for worker thread names. Workers are suffixed with their
    /// ordinal, e.g. `drainpool-worker-1`.
    ///
    /// Environment variable: `THREAD_NAME`
    #[arg(long, env = "THREAD_NAME", default_value_t = String::from("drainpool-worker"))]
    pub thread_name: String,
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub pool: PoolConfig,
    pub num_jobs: u64,
    pub submit_interval: Duration,
    pub job_duration: Duration,
}

impl TryFrom<CliArgs> for RunConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.num_workers == 0 {
            bail!("NUM_WORKERS must be greater than 0");
        }

        if args.thread_name.trim().is_empty() {
            bail!("THREAD_NAME must not be blank");
        }

        if args.thread_name.contains('\0') {
            bail!("THREAD_NAME must not contain NUL bytes");
        }

        let pool = PoolConfig::new(args.num_workers, args.queue_capacity)
            .with_thread_name(args.thread_name);
        pool.validate()?;

        Ok(Self {
            pool,
            num_jobs: args.num_jobs,
            submit_interval: Duration::from_millis(args.submit_interval_ms),
            job_duration: Duration::from_millis(args.job_duration_ms),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(core::iter::once("drainpool").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn explicit_flags_are_converted() {
        let config = RunConfig::try_from(parse(&[
            "--num-workers",
            "4",
            "--queue-capacity",
            "0",
            "--num-jobs",
            "7",
            "--submit-interval-ms",
            "25",
            "--job-duration-ms",
            "1500",
            "--thread-name",
            "resizer",
        ]))
        .unwrap();

        assert_eq!(config.pool.num_workers, 4);
        assert_eq!(config.pool.queue_capacity, 0);
        assert_eq!(config.pool.thread_name, "resizer");
        assert_eq!(config.num_jobs, 7);
        assert_eq!(config.submit_interval, Duration::from_millis(25));
        assert_eq!(config.job_duration, Duration::from_millis(1500));
    }

    #[test]
    fn zero_workers_is_rejected() {
        let err = RunConfig::try_from(parse(&["--num-workers", "0"])).unwrap_err();
        assert!(err.to_string().contains("NUM_WORKERS"));
    }

    #[test]
    fn blank_thread_name_is_rejected() {
        let err = RunConfig::try_from(parse(&["--num-workers", "1", "--thread-name", "  "]))
            .unwrap_err();
        assert!(err.to_string().contains("THREAD_NAME"));
    }

    #[test]
    fn nul_in_thread_name_is_rejected() {
        let err = RunConfig::try_from(parse(&["--thread-name", "work\0er"])).unwrap_err();
        assert!(err.to_string().contains("THREAD_NAME"));
    }

    #[test]
    fn non_numeric_worker_count_fails_to_parse() {
        let parsed = CliArgs::try_parse_from(["drainpool", "--num-workers", "many"]);
        assert!(parsed.is_err());
    }
}
