// Job lifecycle events broadcast by the in-memory queue
use pushq_core::domain::{JobId, JobType};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobEvent {
    Created {
        id: JobId,
        job_type: JobType,
    },
    Progress {
        id: JobId,
        completed: u32,
        total: u32,
        percent: u32,
    },
    Complete {
        id: JobId,
    },
    Retrying {
        id: JobId,
        attempt: i32,
        delay_ms: i64,
        error: String,
    },
    Failed {
        id: JobId,
        error: String,
    },
}

impl JobEvent {
    pub fn job_id(&self) -> &str {
        match self {
            JobEvent::Created { id, .. }
            | JobEvent::Progress { id, .. }
            | JobEvent::Complete { id }
            | JobEvent::Retrying { id, .. }
            | JobEvent::Failed { id, .. } => id,
        }
    }

    /// Terminal events end a job's lifecycle
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobEvent::Complete { .. } | JobEvent::Failed { .. })
    }
}
