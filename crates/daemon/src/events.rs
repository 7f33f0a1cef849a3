// Job event reporting

use pushq_infra_memory::JobEvent;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Human-readable line for one job event
pub fn describe(event: &JobEvent) -> String {
    match event {
        JobEvent::Created { id, .. } => format!("Notification job {id} created"),
        JobEvent::Progress { id, percent, .. } => {
            format!("Notification job {id} {percent}% complete")
        }
        JobEvent::Complete { id } => format!("Notification job {id} completed"),
        JobEvent::Retrying {
            id,
            attempt,
            delay_ms,
            error,
        } => format!(
            "Notification job {id} attempt {attempt} failed: {error} (retrying in {delay_ms}ms)"
        ),
        JobEvent::Failed { id, error } => format!("Notification job {id} failed: {error}"),
    }
}

/// Log every event until the channel closes
pub fn spawn_event_logger(mut rx: broadcast::Receiver<JobEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event @ (JobEvent::Failed { .. } | JobEvent::Retrying { .. })) => {
                    warn!(job_id = %event.job_id(), "{}", describe(&event));
                }
                Ok(event) => info!(job_id = %event.job_id(), "{}", describe(&event)),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped = skipped, "Event logger fell behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

/// Let the logger flush what is left once every sender is gone.
///
/// Returns `false` (and aborts the task) if the channel did not close
/// within `timeout`.
pub async fn drain_event_logger(mut logger: JoinHandle<()>, timeout: Duration) -> bool {
    match tokio::time::timeout(timeout, &mut logger).await {
        Ok(_) => true,
        Err(_) => {
            logger.abort();
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_lines() {
        assert_eq!(
            describe(&JobEvent::Progress {
                id: "7".to_string(),
                completed: 1,
                total: 2,
                percent: 50,
            }),
            "Notification job 7 50% complete"
        );
        assert_eq!(
            describe(&JobEvent::Complete { id: "7".to_string() }),
            "Notification job 7 completed"
        );
        assert_eq!(
            describe(&JobEvent::Failed {
                id: "8".to_string(),
                error: "Phone number 4153518780 is blacklisted".to_string(),
            }),
            "Notification job 8 failed: Phone number 4153518780 is blacklisted"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_logger_reads_buffered_events_before_closing() {
        let (tx, rx) = broadcast::channel(16);
        let logger = spawn_event_logger(rx);

        tx.send(JobEvent::Failed {
            id: "9".to_string(),
            error: "Execution cancelled: cancelled by queue runtime".to_string(),
        })
        .unwrap();
        drop(tx);

        assert!(drain_event_logger(logger, Duration::from_secs(1)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_gives_up_while_senders_remain() {
        let (tx, rx) = broadcast::channel::<JobEvent>(16);
        let logger = spawn_event_logger(rx);

        assert!(!drain_event_logger(logger, Duration::from_secs(1)).await);
        drop(tx);
    }
}
