// Terminal result of one notification execution

use thiserror::Error;

/// Reasons a notification job resolves with failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotificationError {
    #[error("Phone number {phone_number} is blacklisted")]
    BlacklistedRecipient { phone_number: String },

    #[error("Execution cancelled: {reason}")]
    Cancelled { reason: String },

    #[error("Invalid job payload: {0}")]
    InvalidPayload(String),
}

/// Exactly one Outcome is produced per execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure(NotificationError),
}

impl Outcome {
    /// Shape expected by the queue's completion capability
    pub fn into_result(self) -> Result<(), NotificationError> {
        match self {
            Outcome::Success => Ok(()),
            Outcome::Failure(e) => Err(e),
        }
    }
}
