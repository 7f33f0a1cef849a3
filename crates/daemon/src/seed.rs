// Startup jobs loaded from PUSHQ_JOBS_FILE

use anyhow::{Context, Result};
use pushq_core::domain::{JobId, JobType, NotificationData};
use pushq_infra_memory::InMemoryQueue;
use std::path::Path;

/// Read a JSON array of `{ "phoneNumber", "message" }` objects
pub fn load_jobs(path: &Path) -> Result<Vec<NotificationData>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading jobs file {}", path.display()))?;
    parse_jobs(&raw).with_context(|| format!("parsing jobs file {}", path.display()))
}

pub fn parse_jobs(raw: &str) -> Result<Vec<NotificationData>> {
    serde_json::from_str(raw).context("expected a JSON array of {phoneNumber, message} objects")
}

/// Enqueue every job, in file order
pub fn enqueue_jobs(
    queue: &InMemoryQueue,
    job_type: &JobType,
    jobs: Vec<NotificationData>,
) -> Result<Vec<JobId>> {
    jobs.into_iter()
        .map(|data| {
            queue
                .create(job_type, data.into_payload())
                .map_err(|e| anyhow::anyhow!("enqueue failed: {}", e))
        })
        .collect()
}
