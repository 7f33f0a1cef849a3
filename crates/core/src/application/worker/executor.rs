// Notification Executor - per-job state machine
//
// One execution = one ticker + one ExecutionState. Each tick:
// 1. report progress once at least half the work is done
// 2. reject blacklisted recipients
// 3. deliver on the first tick
// 4. consume one unit, succeed when none are left
// The ticker is dropped (timer released) as soon as an Outcome exists.

use super::constants::{CANCELLED_BY_RUNTIME, DEFAULT_STAGE_COUNT};
use crate::domain::{BlacklistSet, NotificationError, Outcome};
use crate::error::{AppError, Result};
use crate::port::{CancelToken, Done, NotificationSender, ProgressReporter, TickSource};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Mutable state of a single execution, owned by that execution only
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionState {
    total: u32,
    pending: u32,
    resolved: bool,
}

impl ExecutionState {
    pub fn new(total: u32) -> Self {
        Self {
            total,
            pending: total,
            resolved: false,
        }
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn pending(&self) -> u32 {
        self.pending
    }

    pub fn completed(&self) -> u32 {
        self.total - self.pending
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    /// Run one tick. Returns the Outcome on the tick that resolves the
    /// execution, `None` while work remains or once already resolved.
    pub fn tick(
        &mut self,
        phone_number: &str,
        message: &str,
        blacklist: &BlacklistSet,
        progress: &dyn ProgressReporter,
        sender: &dyn NotificationSender,
    ) -> Option<Outcome> {
        if self.resolved {
            warn!(phone_number = %phone_number, "Tick after resolution ignored");
            return None;
        }

        // Fires on every tick from the halfway point until resolution
        let completed = self.completed();
        if u64::from(completed) * 2 >= u64::from(self.total) {
            progress.progress(completed, self.total);
        }

        if blacklist.contains(phone_number) {
            return Some(self.resolve(Outcome::Failure(
                NotificationError::BlacklistedRecipient {
                    phone_number: phone_number.to_string(),
                },
            )));
        }

        if self.pending == self.total {
            sender.send(phone_number, message);
        }

        self.pending = self.pending.saturating_sub(1);
        if self.pending == 0 {
            return Some(self.resolve(Outcome::Success));
        }
        None
    }

    /// Resolve with a cancellation failure; `None` if already resolved
    pub fn cancel(&mut self, reason: impl Into<String>) -> Option<Outcome> {
        if self.resolved {
            return None;
        }
        Some(self.resolve(Outcome::Failure(NotificationError::Cancelled {
            reason: reason.into(),
        })))
    }

    fn resolve(&mut self, outcome: Outcome) -> Outcome {
        self.resolved = true;
        outcome
    }
}

/// Drives ExecutionState with a periodic timer until exactly one Outcome
pub struct NotificationExecutor {
    blacklist: BlacklistSet,
    sender: Arc<dyn NotificationSender>,
    tick_source: Arc<dyn TickSource>,
    total: u32,
}

impl NotificationExecutor {
    /// Create an executor with the default stage count
    ///
    /// # Arguments
    /// * `blacklist` - Recipients that are always rejected
    /// * `sender` - Delivery side effect, invoked once per successful execution
    /// * `tick_source` - Timer driving the execution
    pub fn new(
        blacklist: BlacklistSet,
        sender: Arc<dyn NotificationSender>,
        tick_source: Arc<dyn TickSource>,
    ) -> Self {
        Self {
            blacklist,
            sender,
            tick_source,
            total: DEFAULT_STAGE_COUNT,
        }
    }

    /// Override the number of ticks a successful execution takes
    pub fn with_stages(mut self, total: u32) -> Result<Self> {
        if total == 0 {
            return Err(AppError::Validation(
                "stage count must be at least 1".to_string(),
            ));
        }
        self.total = total;
        Ok(self)
    }

    pub fn stages(&self) -> u32 {
        self.total
    }

    /// Run one execution to its Outcome.
    ///
    /// The ticker is released before returning, on every path.
    pub async fn execute(
        &self,
        phone_number: &str,
        message: &str,
        progress: &dyn ProgressReporter,
        cancel: &CancelToken,
    ) -> Outcome {
        let mut state = ExecutionState::new(self.total);
        let mut ticker = self.tick_source.start();
        let mut cancel = cancel.clone();

        let outcome = loop {
            let step = tokio::select! {
                biased;
                _ = cancel.cancelled() => state.cancel(CANCELLED_BY_RUNTIME),
                _ = ticker.tick() => state.tick(
                    phone_number,
                    message,
                    &self.blacklist,
                    progress,
                    self.sender.as_ref(),
                ),
            };
            if let Some(outcome) = step {
                break outcome;
            }
        };
        drop(ticker);

        debug!(
            phone_number = %phone_number,
            pending = state.pending(),
            total = state.total(),
            "Execution resolved"
        );
        outcome
    }

    /// Run one execution and hand its Outcome to `resolve`
    pub async fn run(
        &self,
        phone_number: &str,
        message: &str,
        progress: &dyn ProgressReporter,
        cancel: &CancelToken,
        resolve: Done,
    ) {
        let outcome = self.execute(phone_number, message, progress, cancel).await;
        match &outcome {
            Outcome::Success => {
                info!(job_id = %resolve.job_id(), "Notification delivered");
            }
            Outcome::Failure(e) => {
                warn!(job_id = %resolve.job_id(), error = %e, "Notification rejected");
            }
        }
        resolve.complete(outcome.into_result());
    }
}
