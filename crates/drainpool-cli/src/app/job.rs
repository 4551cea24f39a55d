use core::time::Duration;
use drainpool::{BoxError, Job, JobId};

/// Demo workload: logs its payload, then holds its worker for a fixed time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SleepJob {
    pub id: u64,
    pub payload: String,
    pub duration: Duration,
}

impl SleepJob {
    pub fn new(id: u64, duration: Duration) -> Self {
        Self {
            id,
            payload: format!("Task-{id}"),
            duration,
        }
    }
}

impl Job for SleepJob {
    fn id(&self) -> JobId {
        self.id.into()
    }

    fn process(self) -> Result<(), BoxError> {
        tracing::info!(job = self.id, payload = %self.payload, "Working");
        std::thread::sleep(self.duration);
        Ok(())
    }
}
