// Worker configuration, loaded from PUSHQ_* environment variables

use crate::application::worker::constants::{
    DEFAULT_CONCURRENCY, DEFAULT_JOB_TYPE, DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_BASE_DELAY_MS,
    DEFAULT_STAGE_COUNT, DEFAULT_TICK_INTERVAL, MAX_CONCURRENCY,
};
use crate::domain::blacklist::DEFAULT_BLACKLISTED_NUMBERS;
use crate::domain::{BlacklistSet, JobType};
use crate::error::{AppError, Result};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const ENV_JOB_TYPE: &str = "PUSHQ_JOB_TYPE";
pub const ENV_CONCURRENCY: &str = "PUSHQ_CONCURRENCY";
pub const ENV_STAGES: &str = "PUSHQ_STAGES";
pub const ENV_TICK_INTERVAL_MS: &str = "PUSHQ_TICK_INTERVAL_MS";
pub const ENV_BLACKLIST: &str = "PUSHQ_BLACKLIST";
pub const ENV_JOB_TIMEOUT_MS: &str = "PUSHQ_JOB_TIMEOUT_MS";
pub const ENV_MAX_ATTEMPTS: &str = "PUSHQ_MAX_ATTEMPTS";
pub const ENV_RETRY_BASE_DELAY_MS: &str = "PUSHQ_RETRY_BASE_DELAY_MS";
pub const ENV_JOBS_FILE: &str = "PUSHQ_JOBS_FILE";

/// Everything the worker needs to wire itself up
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub job_type: JobType,
    pub concurrency: usize,
    pub stages: u32,
    pub tick_interval: Duration,
    pub blacklist: BlacklistSet,
    /// Runtime-level cap on one execution; `None` waits forever
    pub job_timeout: Option<Duration>,
    pub max_attempts: i32,
    pub retry_base_delay_ms: i64,
    /// JSON array of notification jobs enqueued at startup
    pub jobs_file: Option<PathBuf>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            job_type: JobType::new(DEFAULT_JOB_TYPE),
            concurrency: DEFAULT_CONCURRENCY,
            stages: DEFAULT_STAGE_COUNT,
            tick_interval: DEFAULT_TICK_INTERVAL,
            blacklist: BlacklistSet::new(DEFAULT_BLACKLISTED_NUMBERS),
            job_timeout: None,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_base_delay_ms: DEFAULT_RETRY_BASE_DELAY_MS,
            jobs_file: None,
        }
    }
}

impl WorkerConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup (testable)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(job_type) = lookup(ENV_JOB_TYPE) {
            let job_type = job_type.trim();
            if job_type.is_empty() {
                return Err(AppError::Config(format!("{ENV_JOB_TYPE} must not be empty")));
            }
            config.job_type = JobType::new(job_type);
        }
        if let Some(v) = parse_var::<usize>(&lookup, ENV_CONCURRENCY)? {
            config.concurrency = v;
        }
        if let Some(v) = parse_var::<u32>(&lookup, ENV_STAGES)? {
            config.stages = v;
        }
        if let Some(v) = parse_var::<u64>(&lookup, ENV_TICK_INTERVAL_MS)? {
            config.tick_interval = Duration::from_millis(v);
        }
        if let Some(csv) = lookup(ENV_BLACKLIST) {
            config.blacklist = BlacklistSet::from_csv(&csv);
        }
        if let Some(v) = parse_var::<u64>(&lookup, ENV_JOB_TIMEOUT_MS)? {
            config.job_timeout = Some(Duration::from_millis(v));
        }
        if let Some(v) = parse_var::<i32>(&lookup, ENV_MAX_ATTEMPTS)? {
            config.max_attempts = v;
        }
        if let Some(v) = parse_var::<i64>(&lookup, ENV_RETRY_BASE_DELAY_MS)? {
            config.retry_base_delay_ms = v;
        }
        if let Some(path) = lookup(ENV_JOBS_FILE) {
            config.jobs_file = Some(PathBuf::from(path));
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(AppError::Config(format!("{ENV_CONCURRENCY} must be at least 1")));
        }
        if self.concurrency > MAX_CONCURRENCY {
            return Err(AppError::Config(format!(
                "{ENV_CONCURRENCY} must be at most {MAX_CONCURRENCY}"
            )));
        }
        if self.stages == 0 {
            return Err(AppError::Config(format!("{ENV_STAGES} must be at least 1")));
        }
        if self.tick_interval.is_zero() {
            return Err(AppError::Config(format!(
                "{ENV_TICK_INTERVAL_MS} must be at least 1"
            )));
        }
        if self.job_timeout.is_some_and(|t| t.is_zero()) {
            return Err(AppError::Config(format!(
                "{ENV_JOB_TIMEOUT_MS} must be at least 1"
            )));
        }
        if self.max_attempts < 1 {
            return Err(AppError::Config(format!("{ENV_MAX_ATTEMPTS} must be at least 1")));
        }
        if self.retry_base_delay_ms < 0 {
            return Err(AppError::Config(format!(
                "{ENV_RETRY_BASE_DELAY_MS} must not be negative"
            )));
        }
        Ok(())
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| AppError::Config(format!("{key}={raw:?}: {e}"))),
    }
}
