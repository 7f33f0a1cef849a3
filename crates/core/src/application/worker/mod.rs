// Worker - registers the notification handler with the queue runtime

pub mod constants;
mod executor;

pub use executor::{ExecutionState, NotificationExecutor};

use crate::domain::{JobType, NotificationData};
use crate::error::{AppError, Result};
use crate::port::{Done, JobHandler, QueueRuntime, QueuedJob};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

/// JobProcessor turns delivered jobs into notification executions.
///
/// Stateless apart from the shared executor: every delivered job gets a
/// fresh ExecutionState, so concurrently running jobs never share state.
pub struct JobProcessor {
    executor: Arc<NotificationExecutor>,
}

impl JobProcessor {
    pub fn new(executor: Arc<NotificationExecutor>) -> Self {
        Self { executor }
    }

    /// Ask `runtime` to deliver up to `concurrency` jobs of `job_type` at once
    pub async fn register_handler(
        self: Arc<Self>,
        runtime: &dyn QueueRuntime,
        job_type: &JobType,
        concurrency: usize,
    ) -> Result<()> {
        if concurrency == 0 {
            return Err(AppError::Validation(
                "concurrency must be at least 1".to_string(),
            ));
        }

        let stages = self.executor.stages();
        let handler: Arc<dyn JobHandler> = self;
        runtime.process(job_type, concurrency, handler).await?;

        info!(
            job_type = %job_type,
            concurrency = concurrency,
            stages = stages,
            "Notification handler registered"
        );
        Ok(())
    }
}

#[async_trait]
impl JobHandler for JobProcessor {
    async fn handle(&self, job: QueuedJob, done: Done) {
        let data = match NotificationData::from_payload(&job.payload) {
            Ok(data) => data,
            Err(e) => {
                warn!(job_id = %job.id, error = %e, "Rejecting job with malformed payload");
                done.fail(e);
                return;
            }
        };

        info!(
            job_id = %job.id,
            attempt = job.attempt,
            phone_number = %data.phone_number,
            "Processing notification job"
        );

        self.executor
            .run(
                &data.phone_number,
                &data.message,
                job.progress.as_ref(),
                &job.cancel,
                done,
            )
            .await;
    }
}
