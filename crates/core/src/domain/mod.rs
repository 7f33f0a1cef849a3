// Domain Layer - Pure business logic and entities

pub mod blacklist;
pub mod error;
pub mod job;
pub mod outcome;

// Re-exports
pub use blacklist::BlacklistSet;
pub use error::DomainError;
pub use job::{Job, JobId, JobPayload, JobProgress, JobState, JobType, NotificationData};
pub use outcome::{NotificationError, Outcome};
