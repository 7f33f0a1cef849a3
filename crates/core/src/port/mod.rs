// Port Layer - Interfaces for external dependencies

pub mod cancel;
pub mod id_provider; // For deterministic testing
pub mod notification_sender;
pub mod queue_runtime;
pub mod ticker;
pub mod time_provider;

// Re-exports
pub use cancel::{cancel_channel, CancelSender, CancelToken};
pub use id_provider::IdProvider;
pub use notification_sender::NotificationSender;
pub use queue_runtime::{Done, DoneResult, JobHandler, ProgressReporter, QueueRuntime, QueuedJob};
pub use ticker::{TickSource, Ticker};
pub use time_provider::TimeProvider;
