// Job Domain Model

use serde::{Deserialize, Serialize};

use super::outcome::NotificationError;

/// Job ID (UUID v4)
pub type JobId = String;

/// Job State (mirrors the queue broker's lifecycle)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    /// Waiting to be delivered to a handler
    Inactive,
    /// Delivered to a handler, not yet resolved
    Active,
    /// Resolved with success
    Complete,
    /// Resolved with failure and no attempts left
    Failed,
    /// Waiting out a retry backoff before becoming inactive again
    Delayed,
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobState::Inactive => write!(f, "INACTIVE"),
            JobState::Active => write!(f, "ACTIVE"),
            JobState::Complete => write!(f, "COMPLETE"),
            JobState::Failed => write!(f, "FAILED"),
            JobState::Delayed => write!(f, "DELAYED"),
        }
    }
}

/// Job Type (handlers register interest by type name)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobType(String);

impl JobType {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Job Payload (JSON serializable, opaque to the queue)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPayload(serde_json::Value);

impl JobPayload {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }
}

/// Data carried by a push notification job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationData {
    pub phone_number: String,
    pub message: String,
}

impl NotificationData {
    pub fn new(phone_number: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            phone_number: phone_number.into(),
            message: message.into(),
        }
    }

    /// Read `phoneNumber` and `message` out of a job payload
    pub fn from_payload(payload: &JobPayload) -> Result<Self, NotificationError> {
        serde_json::from_value(payload.as_value().clone())
            .map_err(|e| NotificationError::InvalidPayload(e.to_string()))
    }

    pub fn into_payload(self) -> JobPayload {
        JobPayload::new(serde_json::json!({
            "phoneNumber": self.phone_number,
            "message": self.message,
        }))
    }
}

/// Last progress reported for a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobProgress {
    pub completed: u32,
    pub total: u32,
}

impl JobProgress {
    /// Percentage of work done, clamped to 100
    pub fn percent(&self) -> u32 {
        if self.total == 0 {
            return 100;
        }
        let percent = u64::from(self.completed) * 100 / u64::from(self.total);
        percent.min(100) as u32
    }
}

/// Job Entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub job_type: JobType,
    pub payload: JobPayload,
    pub state: JobState,

    pub created_at: i64, // epoch ms
    pub started_at: Option<i64>,
    pub finished_at: Option<i64>,

    pub progress: Option<JobProgress>,
    pub error: Option<String>,

    // Retry bookkeeping (owned by the queue runtime)
    pub attempts: i32,
    pub max_attempts: i32,
    pub backoff_factor: f64,
}

impl Job {
    /// Create a new Job
    ///
    /// # Arguments
    ///
    /// * `id` - Unique job ID (injected, not generated)
    /// * `created_at` - Creation timestamp in epoch ms (injected, not system time)
    /// * `job_type` - Job type the handler registered for
    /// * `payload` - Job payload
    pub fn new(
        id: impl Into<String>,
        created_at: i64,
        job_type: JobType,
        payload: JobPayload,
    ) -> Self {
        Self {
            id: id.into(),
            job_type,
            payload,
            state: JobState::Inactive,
            created_at,
            started_at: None,
            finished_at: None,
            progress: None,
            error: None,
            attempts: 0,
            max_attempts: 1, // No retry unless the queue asks for it
            backoff_factor: 2.0,
        }
    }

    /// Transition to Active state with explicit timestamp
    pub fn start(&mut self, now_millis: i64) -> super::error::Result<()> {
        if self.state != JobState::Inactive {
            return Err(super::error::DomainError::InvalidStateTransition {
                from: self.state.to_string(),
                to: JobState::Active.to_string(),
            });
        }
        self.state = JobState::Active;
        self.started_at = Some(now_millis);
        self.attempts += 1;
        Ok(())
    }

    /// Record progress; ignored unless the job is active
    pub fn record_progress(&mut self, completed: u32, total: u32) -> bool {
        if self.state != JobState::Active {
            return false;
        }
        self.progress = Some(JobProgress { completed, total });
        true
    }

    /// Transition to Complete state with explicit timestamp
    pub fn complete(&mut self, now_millis: i64) -> super::error::Result<()> {
        if self.state != JobState::Active {
            return Err(super::error::DomainError::InvalidStateTransition {
                from: self.state.to_string(),
                to: JobState::Complete.to_string(),
            });
        }
        self.state = JobState::Complete;
        self.finished_at = Some(now_millis);
        self.error = None;
        Ok(())
    }

    /// Mark as Failed with explicit timestamp
    pub fn fail(&mut self, now_millis: i64, error: impl Into<String>) {
        self.state = JobState::Failed;
        self.finished_at = Some(now_millis);
        self.error = Some(error.into());
    }

    /// Park the job until its retry backoff elapses
    pub fn delay(&mut self, error: impl Into<String>) {
        self.state = JobState::Delayed;
        self.started_at = None;
        self.error = Some(error.into());
    }

    /// Move a delayed job back to the inactive set
    pub fn requeue(&mut self) -> super::error::Result<()> {
        if self.state != JobState::Delayed {
            return Err(super::error::DomainError::InvalidStateTransition {
                from: self.state.to_string(),
                to: JobState::Inactive.to_string(),
            });
        }
        self.state = JobState::Inactive;
        Ok(())
    }
}
