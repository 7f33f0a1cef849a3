// Pushq Infrastructure - In-Memory Adapters
// Implements: QueueRuntime, TickSource, NotificationSender

mod events;
mod queue;
mod sender;
mod ticker;

pub use events::JobEvent;
pub use queue::{InMemoryQueue, QueueSettings};
pub use sender::LogNotificationSender;
pub use ticker::IntervalTickSource;
