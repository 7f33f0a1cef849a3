// Notification Sender Port
// The delivery side effect. Dialing and transport are out of scope, so
// production adapters only log.

/// Delivers one notification to one recipient
pub trait NotificationSender: Send + Sync {
    /// Synchronous, must not block
    fn send(&self, phone_number: &str, message: &str);
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::Mutex;

    /// Records every delivery as (phone_number, message)
    #[derive(Default)]
    pub struct RecordingSender {
        sent: Mutex<Vec<(String, String)>>,
    }

    impl RecordingSender {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn sent(&self) -> Vec<(String, String)> {
            self.sent.lock().unwrap().clone()
        }

        pub fn send_count(&self) -> usize {
            self.sent.lock().unwrap().len()
        }
    }

    impl NotificationSender for RecordingSender {
        fn send(&self, phone_number: &str, message: &str) {
            self.sent
                .lock()
                .unwrap()
                .push((phone_number.to_string(), message.to_string()));
        }
    }
}
