//! Pushq Notification Worker - Main Entry Point

mod events;
mod logging;
mod seed;

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

// Import workspace crates
use pushq_core::application::worker::constants::GRACEFUL_SHUTDOWN_TIMEOUT;
use pushq_core::application::{JobProcessor, NotificationExecutor};
use pushq_core::config::WorkerConfig;
use pushq_core::VERSION;
use pushq_infra_memory::{
    InMemoryQueue, IntervalTickSource, LogNotificationSender, QueueSettings,
};

/// Upper bound on flushing job events after the queue stops
const EVENT_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize logging (PUSHQ_LOG_FORMAT=json for production)
    let _log_guard = logging::init_logging()?;

    info!("Pushq notification worker v{} starting...", VERSION);

    // 2. Load configuration
    let config =
        WorkerConfig::from_env().map_err(|e| anyhow::anyhow!("Configuration failed: {}", e))?;

    info!(
        job_type = %config.job_type,
        concurrency = config.concurrency,
        stages = config.stages,
        tick_interval_ms = config.tick_interval.as_millis() as u64,
        blacklisted = config.blacklist.len(),
        max_attempts = config.max_attempts,
        "Configuration loaded"
    );

    // 3. Setup dependencies (DI wiring)
    let queue = InMemoryQueue::with_settings(QueueSettings {
        max_attempts: config.max_attempts,
        backoff_factor: 2.0,
        retry_base_delay_ms: config.retry_base_delay_ms,
        job_timeout: config.job_timeout,
        ..QueueSettings::default()
    });
    let event_logger = events::spawn_event_logger(queue.subscribe());

    let executor = NotificationExecutor::new(
        config.blacklist.clone(),
        Arc::new(LogNotificationSender::new()),
        Arc::new(IntervalTickSource::new(config.tick_interval)),
    )
    .with_stages(config.stages)?;

    // 4. Register the job processor
    info!("Starting worker...");
    let processor = Arc::new(JobProcessor::new(Arc::new(executor)));
    processor
        .register_handler(&queue, &config.job_type, config.concurrency)
        .await
        .map_err(|e| anyhow::anyhow!("Handler registration failed: {}", e))?;

    // 5. Enqueue startup jobs
    if let Some(path) = &config.jobs_file {
        let jobs = seed::load_jobs(path)?;
        let ids = seed::enqueue_jobs(&queue, &config.job_type, jobs)?;
        info!(count = ids.len(), path = %path.display(), "Startup jobs enqueued");
    }

    info!("System ready. Waiting for jobs...");
    info!("Press Ctrl+C to shutdown");

    // 6. Wait for shutdown signal
    tokio::signal::ctrl_c().await?;

    info!("Shutdown signal received. Exiting gracefully...");

    // 7. Graceful shutdown
    if tokio::time::timeout(GRACEFUL_SHUTDOWN_TIMEOUT, queue.shutdown())
        .await
        .is_err()
    {
        warn!(
            timeout_secs = GRACEFUL_SHUTDOWN_TIMEOUT.as_secs(),
            "In-flight jobs did not settle before the shutdown timeout"
        );
    }
    // Dropping the last queue handle closes the event stream
    drop(queue);
    if !events::drain_event_logger(event_logger, EVENT_DRAIN_TIMEOUT).await {
        warn!("Event logger did not finish, some job events may be missing");
    }

    info!("Shutdown complete.");

    Ok(())
}
