// Queue Runtime Port
// The broker that stores jobs, enforces delivery concurrency and owns retries.
// This core only registers a handler and answers through the per-job callbacks.

use crate::domain::{JobId, JobPayload, JobType, NotificationError};
use crate::error::Result;
use crate::port::CancelToken;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

/// Progress capability exposed by a delivered job
pub trait ProgressReporter: Send + Sync {
    /// Report `completed` units out of `total`
    fn progress(&self, completed: u32, total: u32);
}

/// What a handler hands back through `Done`
pub type DoneResult = std::result::Result<(), NotificationError>;

type Completion = Box<dyn FnOnce(DoneResult) + Send>;

/// Completion capability for one delivered job.
///
/// Consumed on use, so a job can be resolved at most once. Dropping it
/// unresolved reports a failure to the runtime.
pub struct Done {
    job_id: JobId,
    completion: Option<Completion>,
}

impl Done {
    pub fn new<F>(job_id: impl Into<JobId>, completion: F) -> Self
    where
        F: FnOnce(DoneResult) + Send + 'static,
    {
        Self {
            job_id: job_id.into(),
            completion: Some(Box::new(completion)),
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Resolve with success (no payload)
    pub fn success(self) {
        self.complete(Ok(()));
    }

    /// Resolve with failure
    pub fn fail(self, error: NotificationError) {
        self.complete(Err(error));
    }

    pub fn complete(mut self, result: DoneResult) {
        if let Some(completion) = self.completion.take() {
            completion(result);
        }
    }
}

impl Drop for Done {
    fn drop(&mut self) {
        if let Some(completion) = self.completion.take() {
            warn!(job_id = %self.job_id, "Job handler dropped completion without resolving");
            completion(Err(NotificationError::Cancelled {
                reason: "job handler dropped completion".to_string(),
            }));
        }
    }
}

impl std::fmt::Debug for Done {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Done")
            .field("job_id", &self.job_id)
            .field("resolved", &self.completion.is_none())
            .finish()
    }
}

/// A job handed to a handler by the runtime
#[derive(Clone)]
pub struct QueuedJob {
    pub id: JobId,
    pub job_type: JobType,
    pub payload: JobPayload,
    /// 1-based attempt number
    pub attempt: i32,
    pub progress: Arc<dyn ProgressReporter>,
    /// Fires when the runtime gives up on this execution (timeout, shutdown)
    pub cancel: CancelToken,
}

/// Handler invoked once per delivered job
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, job: QueuedJob, done: Done);
}

/// Queue runtime registration interface
#[async_trait]
pub trait QueueRuntime: Send + Sync {
    /// Deliver up to `concurrency` jobs of `job_type` to `handler` at a time
    ///
    /// # Errors
    /// - AppError::Validation if concurrency is zero
    /// - AppError::Conflict if a handler is already registered for the type
    async fn process(
        &self,
        job_type: &JobType,
        concurrency: usize,
        handler: Arc<dyn JobHandler>,
    ) -> Result<()>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::Mutex;

    /// Records every progress call in order
    #[derive(Default)]
    pub struct RecordingProgress {
        calls: Mutex<Vec<(u32, u32)>>,
    }

    impl RecordingProgress {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn calls(&self) -> Vec<(u32, u32)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl ProgressReporter for RecordingProgress {
        fn progress(&self, completed: u32, total: u32) {
            self.calls.lock().unwrap().push((completed, total));
        }
    }

    /// Completion results captured by `recording_done`
    pub type CompletionLog = Arc<Mutex<Vec<DoneResult>>>;

    /// Build a `Done` whose results land in a shared log
    pub fn recording_done(job_id: impl Into<JobId>) -> (Done, CompletionLog) {
        let log: CompletionLog = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        let done = Done::new(job_id, move |result| sink.lock().unwrap().push(result));
        (done, log)
    }

    /// Registration captured by `MockQueueRuntime`
    pub struct Registration {
        pub job_type: JobType,
        pub concurrency: usize,
        pub handler: Arc<dyn JobHandler>,
    }

    /// Runtime that only records registrations
    #[derive(Default)]
    pub struct MockQueueRuntime {
        registrations: Mutex<Vec<Registration>>,
    }

    impl MockQueueRuntime {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn registration_count(&self) -> usize {
            self.registrations.lock().unwrap().len()
        }

        /// Handler registered for a job type, if any
        pub fn handler_for(&self, job_type: &JobType) -> Option<(usize, Arc<dyn JobHandler>)> {
            self.registrations
                .lock()
                .unwrap()
                .iter()
                .find(|r| &r.job_type == job_type)
                .map(|r| (r.concurrency, Arc::clone(&r.handler)))
        }
    }

    #[async_trait]
    impl QueueRuntime for MockQueueRuntime {
        async fn process(
            &self,
            job_type: &JobType,
            concurrency: usize,
            handler: Arc<dyn JobHandler>,
        ) -> Result<()> {
            self.registrations.lock().unwrap().push(Registration {
                job_type: job_type.clone(),
                concurrency,
                handler,
            });
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mocks::recording_done;
    use super::*;

    #[test]
    fn test_done_success_records_once() {
        let (done, log) = recording_done("job-1");
        assert_eq!(done.job_id(), "job-1");
        done.success();
        assert_eq!(log.lock().unwrap().as_slice(), &[Ok(())]);
    }

    #[test]
    fn test_done_fail_carries_error() {
        let (done, log) = recording_done("job-1");
        done.fail(NotificationError::BlacklistedRecipient {
            phone_number: "4153518780".to_string(),
        });
        let results = log.lock().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(
            results[0].as_ref().unwrap_err().to_string(),
            "Phone number 4153518780 is blacklisted"
        );
    }

    #[test]
    fn test_dropped_done_reports_failure() {
        let (done, log) = recording_done("job-1");
        drop(done);
        let results = log.lock().unwrap();
        assert_eq!(results.len(), 1);
        assert!(matches!(
            results[0],
            Err(NotificationError::Cancelled { .. })
        ));
    }
}
