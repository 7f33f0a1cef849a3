// Retry logic used by the queue runtime when a handler reports failure
use crate::domain::Job;
use tracing::{info, warn};

/// Retry decision result
#[derive(Debug, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry the job (with backoff delay in ms)
    Retry(i64),
    /// Do not retry, job has failed permanently
    Failed,
}

/// Retry policy
///
/// Determines if a failed job should be retried based on:
/// - Attempts made so far (counted when the job starts)
/// - Maximum attempts allowed
/// - Backoff factor for exponential delay
pub struct RetryPolicy {
    base_delay_ms: i64,
}

impl RetryPolicy {
    /// Create a new retry policy
    ///
    /// # Arguments
    /// * `base_delay_ms` - Delay before the first retry (default: 1000)
    pub fn new(base_delay_ms: i64) -> Self {
        Self { base_delay_ms }
    }

    /// Determine if a job should be retried
    ///
    /// Returns:
    /// - `RetryDecision::Retry(delay_ms)` if attempts remain
    /// - `RetryDecision::Failed` if max attempts reached
    ///
    /// Backoff formula:
    /// delay = base_delay * (backoff_factor ^ (attempts - 1))
    pub fn should_retry(&self, job: &Job) -> RetryDecision {
        if job.attempts >= job.max_attempts {
            warn!(
                job_id = %job.id,
                attempts = %job.attempts,
                max_attempts = %job.max_attempts,
                "Max retry attempts reached"
            );
            return RetryDecision::Failed;
        }

        let exponent = (job.attempts - 1).max(0);
        let base_delay_ms = self.base_delay_ms as f64 * job.backoff_factor.powi(exponent);

        // ±10% jitter, seeded by job.id so a given job always gets the same delay
        let jitter_seed = job.id.chars().map(|c| c as u32).sum::<u32>();
        let jitter_factor = 0.9 + ((jitter_seed % 21) as f64 / 100.0); // 0.9 to 1.1

        let delay_ms = (base_delay_ms * jitter_factor) as i64;

        info!(
            job_id = %job.id,
            attempt = %job.attempts,
            max_attempts = %job.max_attempts,
            delay_ms = %delay_ms,
            "Scheduling retry"
        );

        RetryDecision::Retry(delay_ms)
    }

    /// Park a job until its retry is due
    pub fn prepare_for_retry(&self, job: &mut Job, error: &str) {
        job.delay(error);

        info!(
            job_id = %job.id,
            attempt = %job.attempts,
            "Job prepared for retry"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{JobPayload, JobState, JobType};

    fn job_with_attempts(attempts: i32, max_attempts: i32) -> Job {
        let mut job = Job::new(
            "job-1",
            0,
            JobType::new("push_notification_code_2"),
            JobPayload::new(serde_json::json!({})),
        );
        job.attempts = attempts;
        job.max_attempts = max_attempts;
        job
    }

    #[test]
    fn test_single_attempt_never_retries() {
        let policy = RetryPolicy::new(1000);
        assert_eq!(policy.should_retry(&job_with_attempts(1, 1)), RetryDecision::Failed);
    }

    #[test]
    fn test_retry_delay_grows_exponentially() {
        let policy = RetryPolicy::new(1000);

        let first = match policy.should_retry(&job_with_attempts(1, 3)) {
            RetryDecision::Retry(ms) => ms,
            RetryDecision::Failed => panic!("expected retry"),
        };
        let second = match policy.should_retry(&job_with_attempts(2, 3)) {
            RetryDecision::Retry(ms) => ms,
            RetryDecision::Failed => panic!("expected retry"),
        };

        assert!((900..=1100).contains(&first), "first delay {first}");
        assert!((1800..=2200).contains(&second), "second delay {second}");
        assert_eq!(policy.should_retry(&job_with_attempts(3, 3)), RetryDecision::Failed);
    }

    #[test]
    fn test_prepare_for_retry_parks_job() {
        let policy = RetryPolicy::new(1000);
        let mut job = job_with_attempts(0, 3);
        job.start(5).unwrap();

        policy.prepare_for_retry(&mut job, "Phone number 1 is blacklisted");
        assert_eq!(job.state, JobState::Delayed);
        assert_eq!(job.error.as_deref(), Some("Phone number 1 is blacklisted"));
        assert_eq!(job.started_at, None);
    }
}
