// Logging notification sender
use pushq_core::port::NotificationSender;
use tracing::info;

/// Delivery stub: records the notification in the log instead of dialing out
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotificationSender;

impl LogNotificationSender {
    pub fn new() -> Self {
        Self
    }
}

impl NotificationSender for LogNotificationSender {
    fn send(&self, phone_number: &str, message: &str) {
        info!(
            target: "pushq::delivery",
            phone_number = %phone_number,
            "Sending notification to {}, with message: {}",
            phone_number,
            message
        );
    }
}
