// Cancellation Token

use tokio::sync::watch;

/// Cancellation signal observed by a running execution or dispatch loop
#[derive(Clone, Debug)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// A token that is never cancelled
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    /// Check if cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait for cancellation.
    ///
    /// Pends forever once the sender is gone without having cancelled.
    pub async fn cancelled(&mut self) {
        if self.rx.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Cancellation sender
#[derive(Debug)]
pub struct CancelSender {
    tx: watch::Sender<bool>,
}

impl CancelSender {
    /// Signal cancellation to every token
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// Hand out another token bound to this sender
    pub fn token(&self) -> CancelToken {
        CancelToken {
            rx: self.tx.subscribe(),
        }
    }
}

/// Create a cancellation channel
pub fn cancel_channel() -> (CancelSender, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelSender { tx }, CancelToken { rx })
}
