// In-Memory Queue Runtime
//
// Reference broker for the worker: stores jobs, delivers them to the
// registered handler with bounded concurrency, records progress and
// completion, retries failures with backoff and cancels executions that
// outlive the configured timeout.

use crate::events::JobEvent;
use async_trait::async_trait;
use pushq_core::application::worker::constants::{
    DEFAULT_CANCEL_GRACE_PERIOD, DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_BASE_DELAY_MS,
};
use pushq_core::application::{RetryDecision, RetryPolicy};
use pushq_core::domain::{Job, JobId, JobPayload, JobState, JobType, NotificationError};
use pushq_core::error::{AppError, Result};
use pushq_core::port::id_provider::UuidProvider;
use pushq_core::port::time_provider::SystemTimeProvider;
use pushq_core::port::{
    cancel_channel, CancelSender, Done, DoneResult, IdProvider, JobHandler, ProgressReporter,
    QueueRuntime, QueuedJob, TimeProvider,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Broker-side policy applied to every job
#[derive(Debug, Clone)]
pub struct QueueSettings {
    /// Attempts per job including the first
    pub max_attempts: i32,
    pub backoff_factor: f64,
    pub retry_base_delay_ms: i64,
    /// Cancel an execution that has not resolved after this long
    pub job_timeout: Option<Duration>,
    /// Time a cancelled handler gets to resolve before its task is aborted
    pub cancel_grace: Duration,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_factor: 2.0,
            retry_base_delay_ms: DEFAULT_RETRY_BASE_DELAY_MS,
            job_timeout: None,
            cancel_grace: DEFAULT_CANCEL_GRACE_PERIOD,
        }
    }
}

/// Inactive job IDs of one type, in delivery order
struct Lane {
    tx: mpsc::UnboundedSender<JobId>,
    /// Taken by the dispatcher when a handler registers
    rx: Option<mpsc::UnboundedReceiver<JobId>>,
}

impl Lane {
    fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx: Some(rx) }
    }
}

#[derive(Default)]
struct Store {
    jobs: HashMap<JobId, Job>,
    lanes: HashMap<JobType, Lane>,
}

struct Inner {
    store: Mutex<Store>,
    events: broadcast::Sender<JobEvent>,
    shutdown: CancelSender,
    dispatchers: Mutex<Vec<JoinHandle<()>>>,
    settings: QueueSettings,
    retry_policy: RetryPolicy,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
}

/// In-memory `QueueRuntime`; cheap to clone, clones share the same queue
#[derive(Clone)]
pub struct InMemoryQueue {
    inner: Arc<Inner>,
}

impl InMemoryQueue {
    pub fn new(
        settings: QueueSettings,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (shutdown, _) = cancel_channel();
        let retry_policy = RetryPolicy::new(settings.retry_base_delay_ms);
        Self {
            inner: Arc::new(Inner {
                store: Mutex::new(Store::default()),
                events,
                shutdown,
                dispatchers: Mutex::new(Vec::new()),
                settings,
                retry_policy,
                id_provider,
                time_provider,
            }),
        }
    }

    /// Queue with UUID ids and the system clock
    pub fn with_settings(settings: QueueSettings) -> Self {
        Self::new(settings, Arc::new(UuidProvider), Arc::new(SystemTimeProvider))
    }

    /// Enqueue a job; it is delivered once a handler for its type is registered
    pub fn create(&self, job_type: &JobType, payload: JobPayload) -> Result<JobId> {
        if job_type.as_str().trim().is_empty() {
            return Err(AppError::Validation("job type must not be empty".to_string()));
        }
        if self.inner.shutdown.token().is_cancelled() {
            return Err(AppError::Conflict("queue is shut down".to_string()));
        }

        let id = self.inner.id_provider.generate_id();
        let mut job = Job::new(
            id.clone(),
            self.inner.time_provider.now_millis(),
            job_type.clone(),
            payload,
        );
        job.max_attempts = self.inner.settings.max_attempts;
        job.backoff_factor = self.inner.settings.backoff_factor;

        {
            let mut store = self.inner.store();
            store.jobs.insert(id.clone(), job);
            let lane = store.lanes.entry(job_type.clone()).or_insert_with(Lane::new);
            if lane.tx.send(id.clone()).is_err() {
                store.jobs.remove(&id);
                return Err(AppError::Conflict(format!(
                    "queue for {job_type} is no longer accepting jobs"
                )));
            }
        }

        debug!(job_id = %id, job_type = %job_type, "Job created");
        self.inner.emit(JobEvent::Created {
            id: id.clone(),
            job_type: job_type.clone(),
        });
        Ok(id)
    }

    /// Snapshot of a job
    pub fn get(&self, id: &str) -> Option<Job> {
        self.inner.store().jobs.get(id).cloned()
    }

    pub fn count_by_state(&self, job_type: &JobType, state: JobState) -> usize {
        self.inner
            .store()
            .jobs
            .values()
            .filter(|job| &job.job_type == job_type && job.state == state)
            .count()
    }

    /// Receive lifecycle events for every job created after subscribing
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.inner.events.subscribe()
    }

    /// Stop delivering, cancel in-flight executions and wait for dispatchers
    pub async fn shutdown(&self) {
        info!("Queue shutting down");
        self.inner.shutdown.cancel();

        let dispatchers = std::mem::take(&mut *self.inner.dispatchers());
        for handle in dispatchers {
            if let Err(e) = handle.await {
                error!(error = ?e, "Dispatcher task failed");
            }
        }
        info!("Queue stopped");
    }
}

#[async_trait]
impl QueueRuntime for InMemoryQueue {
    async fn process(
        &self,
        job_type: &JobType,
        concurrency: usize,
        handler: Arc<dyn JobHandler>,
    ) -> Result<()> {
        let permits = permit_count(concurrency)?;
        if self.inner.shutdown.token().is_cancelled() {
            return Err(AppError::Conflict("queue is shut down".to_string()));
        }

        let rx = {
            let mut store = self.inner.store();
            let lane = store.lanes.entry(job_type.clone()).or_insert_with(Lane::new);
            lane.rx.take().ok_or_else(|| {
                AppError::Conflict(format!("a handler is already registered for {job_type}"))
            })?
        };

        let handle = tokio::spawn(dispatch(
            Arc::clone(&self.inner),
            job_type.clone(),
            permits,
            handler,
            rx,
        ));
        self.inner.dispatchers().push(handle);

        info!(job_type = %job_type, concurrency = concurrency, "Dispatcher started");
        Ok(())
    }
}

impl Inner {
    fn store(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn dispatchers(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.dispatchers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: JobEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    /// Inactive -> Active; `None` if the job cannot start
    fn activate(&self, id: &str) -> Option<Job> {
        let now = self.time_provider.now_millis();
        let mut store = self.store();
        let job = store.jobs.get_mut(id)?;
        match job.start(now) {
            Ok(()) => Some(job.clone()),
            Err(e) => {
                warn!(job_id = %id, error = %e, "Skipping job that cannot start");
                None
            }
        }
    }

    fn record_progress(&self, id: &str, completed: u32, total: u32) {
        let percent = {
            let mut store = self.store();
            let Some(job) = store.jobs.get_mut(id) else {
                return;
            };
            if !job.record_progress(completed, total) {
                debug!(job_id = %id, state = %job.state, "Progress ignored for inactive job");
                return;
            }
            job.progress.map(|p| p.percent()).unwrap_or_default()
        };
        self.emit(JobEvent::Progress {
            id: id.to_string(),
            completed,
            total,
            percent,
        });
    }

    /// Apply a handler's resolution; returns the retry delay if the job
    /// was parked for another attempt
    fn finish(&self, id: &str, result: DoneResult) -> Option<Duration> {
        let now = self.time_provider.now_millis();
        let mut store = self.store();
        let Some(job) = store.jobs.get_mut(id) else {
            warn!(job_id = %id, "Resolution for unknown job dropped");
            return None;
        };

        match result {
            Ok(()) => {
                if let Err(e) = job.complete(now) {
                    error!(job_id = %id, error = %e, "Cannot complete job");
                    return None;
                }
                info!(job_id = %id, "Job completed");
                self.emit(JobEvent::Complete { id: id.to_string() });
                None
            }
            Err(e) => {
                let error = e.to_string();
                match self.retry_policy.should_retry(job) {
                    RetryDecision::Retry(delay_ms) => {
                        self.retry_policy.prepare_for_retry(job, &error);
                        self.emit(JobEvent::Retrying {
                            id: id.to_string(),
                            attempt: job.attempts,
                            delay_ms,
                            error,
                        });
                        Some(Duration::from_millis(delay_ms.max(0) as u64))
                    }
                    RetryDecision::Failed => {
                        warn!(job_id = %id, error = %error, "Job failed");
                        job.fail(now, error.clone());
                        self.emit(JobEvent::Failed {
                            id: id.to_string(),
                            error,
                        });
                        None
                    }
                }
            }
        }
    }

    /// Delayed -> Inactive, and back into its lane
    fn requeue(&self, id: &str) {
        let mut store = self.store();
        let Some(job) = store.jobs.get_mut(id) else {
            return;
        };
        if let Err(e) = job.requeue() {
            warn!(job_id = %id, error = %e, "Cannot requeue job");
            return;
        }
        let job_type = job.job_type.clone();
        let sent = store
            .lanes
            .get(&job_type)
            .map(|lane| lane.tx.send(id.to_string()).is_ok())
            .unwrap_or(false);
        if !sent {
            debug!(job_id = %id, "Lane closed, job stays inactive");
        }
    }
}

/// Progress capability handed to the handler for one job
struct JobProgressHandle {
    id: JobId,
    inner: Arc<Inner>,
}

impl ProgressReporter for JobProgressHandle {
    fn progress(&self, completed: u32, total: u32) {
        self.inner.record_progress(&self.id, completed, total);
    }
}

/// Semaphore size for a requested concurrency
fn permit_count(concurrency: usize) -> Result<u32> {
    if concurrency == 0 {
        return Err(AppError::Validation(
            "concurrency must be at least 1".to_string(),
        ));
    }
    u32::try_from(concurrency)
        .ok()
        .filter(|permits| *permits as usize <= Semaphore::MAX_PERMITS)
        .ok_or_else(|| AppError::Validation(format!("concurrency {concurrency} is too large")))
}

/// Deliver jobs of one type, at most `permits` at a time
async fn dispatch(
    inner: Arc<Inner>,
    job_type: JobType,
    permits: u32,
    handler: Arc<dyn JobHandler>,
    mut rx: mpsc::UnboundedReceiver<JobId>,
) {
    let semaphore = Arc::new(Semaphore::new(permits as usize));
    let mut shutdown = inner.shutdown.token();

    loop {
        let permit = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
        };
        let id = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            id = rx.recv() => match id {
                Some(id) => id,
                None => break,
            },
        };
        tokio::spawn(execute(
            Arc::clone(&inner),
            Arc::clone(&handler),
            id,
            permit,
        ));
    }

    // In-flight executions hold permits until they resolve
    let _ = semaphore.acquire_many(permits).await;
    debug!(job_type = %job_type, "Dispatcher drained");
}

/// Run one job through the handler and record its resolution
async fn execute(
    inner: Arc<Inner>,
    handler: Arc<dyn JobHandler>,
    id: JobId,
    permit: OwnedSemaphorePermit,
) {
    let Some(job) = inner.activate(&id) else {
        return;
    };

    let (cancel_tx, cancel) = cancel_channel();
    let (done_tx, mut done_rx) = oneshot::channel::<DoneResult>();
    let done = Done::new(id.clone(), move |result| {
        let _ = done_tx.send(result);
    });
    let queued = QueuedJob {
        id: id.clone(),
        job_type: job.job_type,
        payload: job.payload,
        attempt: job.attempts,
        progress: Arc::new(JobProgressHandle {
            id: id.clone(),
            inner: Arc::clone(&inner),
        }),
        cancel,
    };

    // Spawned so a panicking handler cannot take the dispatcher down
    let handle = tokio::spawn(async move { handler.handle(queued, done).await });

    let mut shutdown = inner.shutdown.token();
    let grace = inner.settings.cancel_grace;
    let result = tokio::select! {
        received = &mut done_rx => resolution(received),
        _ = expire(inner.settings.job_timeout) => {
            warn!(job_id = %id, "Job execution timed out, cancelling");
            cancel_tx.cancel();
            settle(&id, &mut done_rx, &handle, grace).await
        }
        _ = shutdown.cancelled() => {
            info!(job_id = %id, "Cancelling job for shutdown");
            cancel_tx.cancel();
            settle(&id, &mut done_rx, &handle, grace).await
        }
    };

    let retry_after = inner.finish(&id, result);
    drop(permit);

    if let Some(delay) = retry_after {
        let inner = Arc::clone(&inner);
        let id = id.clone();
        tokio::spawn(async move {
            let mut shutdown = inner.shutdown.token();
            tokio::select! {
                _ = shutdown.cancelled() => {}
                _ = tokio::time::sleep(delay) => inner.requeue(&id),
            }
        });
    }

    if let Err(e) = handle.await {
        if e.is_panic() {
            error!(job_id = %id, "Job handler panicked: {:?}", e);
        }
    }
}

fn resolution(received: std::result::Result<DoneResult, oneshot::error::RecvError>) -> DoneResult {
    received.unwrap_or_else(|_| {
        Err(NotificationError::Cancelled {
            reason: "job handler exited without resolving".to_string(),
        })
    })
}

/// Wait for a cancelled handler; abort it once `grace` runs out
async fn settle(
    id: &str,
    done_rx: &mut oneshot::Receiver<DoneResult>,
    handle: &JoinHandle<()>,
    grace: Duration,
) -> DoneResult {
    match tokio::time::timeout(grace, done_rx).await {
        Ok(received) => resolution(received),
        Err(_) => {
            warn!(
                job_id = %id,
                grace_ms = grace.as_millis() as u64,
                "Job handler ignored cancellation, aborting"
            );
            handle.abort();
            Err(NotificationError::Cancelled {
                reason: "job handler ignored cancellation".to_string(),
            })
        }
    }
}

async fn expire(timeout: Option<Duration>) {
    match timeout {
        Some(timeout) => tokio::time::sleep(timeout).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pushq_core::port::id_provider::mocks::SequentialIdProvider;
    use pushq_core::port::time_provider::mocks::MockTimeProvider;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tokio_test::{assert_err, assert_ok};

    const JOB_TYPE: &str = "push_notification_code_2";

    fn queue(settings: QueueSettings) -> InMemoryQueue {
        InMemoryQueue::new(
            settings,
            Arc::new(SequentialIdProvider::default()),
            Arc::new(MockTimeProvider::new(1_000)),
        )
    }

    fn job_type() -> JobType {
        JobType::new(JOB_TYPE)
    }

    fn payload() -> JobPayload {
        JobPayload::new(json!({"phoneNumber": "4159999999", "message": "hello"}))
    }

    /// Collect events until `count` terminal events were seen
    async fn wait_terminal(rx: &mut broadcast::Receiver<JobEvent>, count: usize) -> Vec<JobEvent> {
        let mut events = Vec::new();
        let mut terminal = 0;
        while terminal < count {
            let event = tokio::time::timeout(Duration::from_secs(60), rx.recv())
                .await
                .expect("timed out waiting for job events")
                .expect("event channel closed");
            if event.is_terminal() {
                terminal += 1;
            }
            events.push(event);
        }
        events
    }

    /// Reports half progress, sleeps one second, then resolves with `result`
    struct SteppingHandler {
        result: DoneResult,
        running: AtomicUsize,
        max_running: AtomicUsize,
    }

    impl SteppingHandler {
        fn new(result: DoneResult) -> Arc<Self> {
            Arc::new(Self {
                result,
                running: AtomicUsize::new(0),
                max_running: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl JobHandler for SteppingHandler {
        async fn handle(&self, job: QueuedJob, done: Done) {
            let running = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_running.fetch_max(running, Ordering::SeqCst);
            job.progress.progress(1, 2);
            tokio::time::sleep(Duration::from_secs(1)).await;
            self.running.fetch_sub(1, Ordering::SeqCst);
            done.complete(self.result.clone());
        }
    }

    /// Fails the first attempt, succeeds afterwards
    struct FlakyHandler;

    #[async_trait]
    impl JobHandler for FlakyHandler {
        async fn handle(&self, job: QueuedJob, done: Done) {
            if job.attempt == 1 {
                done.fail(NotificationError::Cancelled {
                    reason: "flaky".to_string(),
                });
            } else {
                done.success();
            }
        }
    }

    /// Resolves only when cancelled
    struct StuckHandler;

    #[async_trait]
    impl JobHandler for StuckHandler {
        async fn handle(&self, mut job: QueuedJob, done: Done) {
            job.cancel.cancelled().await;
            done.fail(NotificationError::Cancelled {
                reason: "stopped".to_string(),
            });
        }
    }

    /// Never looks at its cancel token; the first delivery hangs
    struct DeafHandler {
        hung: AtomicBool,
    }

    #[async_trait]
    impl JobHandler for DeafHandler {
        async fn handle(&self, _job: QueuedJob, done: Done) {
            if !self.hung.swap(true, Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            done.success();
        }
    }

    struct PanickingHandler;

    #[async_trait]
    impl JobHandler for PanickingHandler {
        async fn handle(&self, _job: QueuedJob, _done: Done) {
            panic!("handler blew up");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_job_completes_with_progress() {
        let queue = queue(QueueSettings::default());
        let mut events = queue.subscribe();
        let id = queue.create(&job_type(), payload()).unwrap();

        queue
            .process(&job_type(), 1, SteppingHandler::new(Ok(())))
            .await
            .unwrap();
        let seen = wait_terminal(&mut events, 1).await;

        assert_eq!(
            seen,
            vec![
                JobEvent::Created {
                    id: id.clone(),
                    job_type: job_type(),
                },
                JobEvent::Progress {
                    id: id.clone(),
                    completed: 1,
                    total: 2,
                    percent: 50,
                },
                JobEvent::Complete { id: id.clone() },
            ]
        );
        let job = queue.get(&id).unwrap();
        assert_eq!(job.state, JobState::Complete);
        assert_eq!(job.attempts, 1);
        assert_eq!(job.progress.map(|p| p.percent()), Some(50));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_without_retry_marks_failed() {
        let queue = queue(QueueSettings::default());
        let mut events = queue.subscribe();
        let error = NotificationError::BlacklistedRecipient {
            phone_number: "4153518780".to_string(),
        };

        queue
            .process(&job_type(), 1, SteppingHandler::new(Err(error)))
            .await
            .unwrap();
        let id = queue.create(&job_type(), payload()).unwrap();
        let seen = wait_terminal(&mut events, 1).await;

        assert_eq!(
            seen.last(),
            Some(&JobEvent::Failed {
                id: id.clone(),
                error: "Phone number 4153518780 is blacklisted".to_string(),
            })
        );
        let job = queue.get(&id).unwrap();
        assert_eq!(job.state, JobState::Failed);
        assert_eq!(job.error.as_deref(), Some("Phone number 4153518780 is blacklisted"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_job_is_retried_when_attempts_remain() {
        let queue = queue(QueueSettings {
            max_attempts: 2,
            ..QueueSettings::default()
        });
        let mut events = queue.subscribe();

        queue
            .process(&job_type(), 1, Arc::new(FlakyHandler))
            .await
            .unwrap();
        let id = queue.create(&job_type(), payload()).unwrap();
        let seen = wait_terminal(&mut events, 1).await;

        assert!(seen.iter().any(|e| matches!(
            e,
            JobEvent::Retrying { attempt: 1, .. }
        )));
        assert_eq!(seen.last(), Some(&JobEvent::Complete { id: id.clone() }));
        assert_eq!(queue.get(&id).unwrap().attempts, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_limit_is_enforced() {
        let queue = queue(QueueSettings::default());
        let mut events = queue.subscribe();
        let handler = SteppingHandler::new(Ok(()));

        for _ in 0..3 {
            queue.create(&job_type(), payload()).unwrap();
        }
        queue
            .process(&job_type(), 2, Arc::clone(&handler) as Arc<dyn JobHandler>)
            .await
            .unwrap();

        let started = tokio::time::Instant::now();
        wait_terminal(&mut events, 3).await;

        assert_eq!(handler.max_running.load(Ordering::SeqCst), 2);
        assert_eq!(started.elapsed(), Duration::from_secs(2));
        assert_eq!(queue.count_by_state(&job_type(), JobState::Complete), 3);
    }

    #[tokio::test]
    async fn test_registration_errors() {
        let queue = queue(QueueSettings::default());

        let zero = assert_err!(queue.process(&job_type(), 0, Arc::new(FlakyHandler)).await);
        assert!(matches!(zero, AppError::Validation(_)));

        let huge = assert_err!(
            queue
                .process(&job_type(), usize::MAX, Arc::new(FlakyHandler))
                .await
        );
        assert!(matches!(huge, AppError::Validation(_)));

        assert_ok!(queue.process(&job_type(), 1, Arc::new(FlakyHandler)).await);
        let twice = assert_err!(queue.process(&job_type(), 1, Arc::new(FlakyHandler)).await);
        assert!(matches!(twice, AppError::Conflict(_)));

        queue.shutdown().await;
    }

    #[test]
    fn test_permit_count_bounds() {
        assert_eq!(assert_ok!(permit_count(2)), 2);
        assert_eq!(assert_ok!(permit_count(u32::MAX as usize)), u32::MAX);
        assert_err!(permit_count(0));
        assert_err!(permit_count(u32::MAX as usize + 1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_handler_ignoring_cancellation_is_aborted() {
        let queue = queue(QueueSettings {
            job_timeout: Some(Duration::from_millis(500)),
            ..QueueSettings::default()
        });
        let mut events = queue.subscribe();

        assert_ok!(
            queue
                .process(
                    &job_type(),
                    1,
                    Arc::new(DeafHandler {
                        hung: AtomicBool::new(false),
                    }),
                )
                .await
        );
        let hung = assert_ok!(queue.create(&job_type(), payload()));
        let next = assert_ok!(queue.create(&job_type(), payload()));

        let started = tokio::time::Instant::now();
        let seen = wait_terminal(&mut events, 2).await;

        assert!(seen.contains(&JobEvent::Failed {
            id: hung.clone(),
            error: "Execution cancelled: job handler ignored cancellation".to_string(),
        }));
        assert_eq!(seen.last(), Some(&JobEvent::Complete { id: next }));
        // job_timeout plus the cancel grace period
        assert_eq!(started.elapsed(), Duration::from_millis(1500));
        assert_eq!(queue.get(&hung).unwrap().state, JobState::Failed);

        queue.shutdown().await;
    }

    #[tokio::test]
    async fn test_create_rejects_empty_job_type() {
        let queue = queue(QueueSettings::default());
        let result = queue.create(&JobType::new("  "), payload());
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_cancels_execution() {
        let queue = queue(QueueSettings {
            job_timeout: Some(Duration::from_millis(500)),
            ..QueueSettings::default()
        });
        let mut events = queue.subscribe();

        queue
            .process(&job_type(), 1, Arc::new(StuckHandler))
            .await
            .unwrap();
        let id = queue.create(&job_type(), payload()).unwrap();
        let seen = wait_terminal(&mut events, 1).await;

        assert_eq!(
            seen.last(),
            Some(&JobEvent::Failed {
                id,
                error: "Execution cancelled: stopped".to_string(),
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_handler_fails_job() {
        let queue = queue(QueueSettings::default());
        let mut events = queue.subscribe();

        queue
            .process(&job_type(), 1, Arc::new(PanickingHandler))
            .await
            .unwrap();
        let id = queue.create(&job_type(), payload()).unwrap();
        wait_terminal(&mut events, 1).await;

        let job = queue.get(&id).unwrap();
        assert_eq!(job.state, JobState::Failed);
        assert!(job.error.unwrap().contains("dropped completion"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_in_flight_jobs() {
        let queue = queue(QueueSettings::default());

        queue
            .process(&job_type(), 1, Arc::new(StuckHandler))
            .await
            .unwrap();
        let id = queue.create(&job_type(), payload()).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(queue.get(&id).unwrap().state, JobState::Active);

        queue.shutdown().await;

        assert_eq!(queue.get(&id).unwrap().state, JobState::Failed);
        assert!(matches!(
            queue.create(&job_type(), payload()),
            Err(AppError::Conflict(_))
        ));
    }
}
