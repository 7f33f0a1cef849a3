// Application Layer - Use Cases and Business Logic

pub mod retry;
pub mod worker;

// Re-exports
pub use retry::{RetryDecision, RetryPolicy};
pub use worker::{ExecutionState, JobProcessor, NotificationExecutor};
