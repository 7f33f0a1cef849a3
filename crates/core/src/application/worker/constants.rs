// Worker constants (no magic values)
use std::time::Duration;

/// Job type the notification worker registers for
pub const DEFAULT_JOB_TYPE: &str = "push_notification_code_2";

/// Jobs processed simultaneously by one worker
pub const DEFAULT_CONCURRENCY: usize = 2;

/// Upper bound accepted for `PUSHQ_CONCURRENCY`
pub const MAX_CONCURRENCY: usize = 10_000;

/// Work units per execution (`total`); one unit is consumed per tick
pub const DEFAULT_STAGE_COUNT: u32 = 2;

/// Period between two ticks of one execution (1s)
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(1000);

/// Default retry base delay (1000ms = 1s)
pub const DEFAULT_RETRY_BASE_DELAY_MS: i64 = 1000;

/// Attempts per job including the first; 1 means no retry
pub const DEFAULT_MAX_ATTEMPTS: i32 = 1;

/// How long a cancelled handler may take to resolve before it is aborted
pub const DEFAULT_CANCEL_GRACE_PERIOD: Duration = Duration::from_secs(1);

/// Grace period for in-flight jobs on daemon shutdown (5 seconds)
pub const GRACEFUL_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Reason reported when the runtime cancels an execution
pub const CANCELLED_BY_RUNTIME: &str = "cancelled by queue runtime";
