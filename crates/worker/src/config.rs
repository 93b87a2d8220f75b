use std::str::FromStr;
use std::time::Duration;

use roster_core::import_job::DEFAULT_MAX_ATTEMPTS;
use roster_core::retry::RetryPolicy;

/// A configuration variable that is set but does not parse.
#[derive(Debug, thiserror::Error)]
#[error("{var} has invalid value '{value}': {reason}")]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
    pub reason: String,
}

fn env_or<T>(var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(var) {
        Ok(value) => value.trim().parse().map_err(|e: T::Err| ConfigError {
            var,
            value,
            reason: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

/// Worker configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Independent workers per process.
    pub concurrency: usize,
    /// Idle wait between claim attempts.
    pub poll_interval: Duration,
    /// How long a claimed job stays leased before it can be redelivered.
    pub job_lease: Duration,
    /// Upper bound on one bulk create call.
    pub store_timeout: Duration,
    pub max_attempts: i32,
    pub retry_base_delay: Duration,
    pub retry_max_delay: Duration,
    /// Prefix of each worker's id; the worker index is appended.
    pub worker_id_prefix: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: 2,
            poll_interval: Duration::from_millis(1000),
            job_lease: Duration::from_secs(300),
            store_timeout: Duration::from_secs(30),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_base_delay: Duration::from_millis(1000),
            retry_max_delay: Duration::from_millis(60_000),
            worker_id_prefix: format!("worker-{}", std::process::id()),
        }
    }
}

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var               | Default             |
    /// |-----------------------|---------------------|
    /// | `WORKER_CONCURRENCY`  | `2`                 |
    /// | `POLL_INTERVAL_MS`    | `1000`              |
    /// | `JOB_LEASE_SECS`      | `300`               |
    /// | `STORE_TIMEOUT_SECS`  | `30`                |
    /// | `MAX_ATTEMPTS`        | `5`                 |
    /// | `RETRY_BASE_DELAY_MS` | `1000`              |
    /// | `RETRY_MAX_DELAY_MS`  | `60000`             |
    /// | `WORKER_ID_PREFIX`    | `worker-<pid>`      |
    pub fn from_env() -> Result<Self, ConfigError> {
        let d = Self::default();
        let config = Self {
            concurrency: env_or("WORKER_CONCURRENCY", d.concurrency)?,
            poll_interval: Duration::from_millis(env_or(
                "POLL_INTERVAL_MS",
                d.poll_interval.as_millis() as u64,
            )?),
            job_lease: Duration::from_secs(env_or("JOB_LEASE_SECS", d.job_lease.as_secs())?),
            store_timeout: Duration::from_secs(env_or(
                "STORE_TIMEOUT_SECS",
                d.store_timeout.as_secs(),
            )?),
            max_attempts: env_or("MAX_ATTEMPTS", d.max_attempts)?,
            retry_base_delay: Duration::from_millis(env_or(
                "RETRY_BASE_DELAY_MS",
                d.retry_base_delay.as_millis() as u64,
            )?),
            retry_max_delay: Duration::from_millis(env_or(
                "RETRY_MAX_DELAY_MS",
                d.retry_max_delay.as_millis() as u64,
            )?),
            worker_id_prefix: env_or("WORKER_ID_PREFIX", d.worker_id_prefix)?,
        };

        if config.concurrency == 0 {
            return Err(ConfigError {
                var: "WORKER_CONCURRENCY",
                value: "0".into(),
                reason: "must be at least 1".into(),
            });
        }
        if config.max_attempts < 1 {
            return Err(ConfigError {
                var: "MAX_ATTEMPTS",
                value: config.max_attempts.to_string(),
                reason: "must be at least 1".into(),
            });
        }
        // A lease shorter than the store timeout would let a healthy but slow
        // delivery be redelivered underneath itself.
        if config.job_lease <= config.store_timeout {
            return Err(ConfigError {
                var: "JOB_LEASE_SECS",
                value: config.job_lease.as_secs().to_string(),
                reason: "must exceed STORE_TIMEOUT_SECS".into(),
            });
        }
        Ok(config)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: self.retry_base_delay,
            max_delay: self.retry_max_delay,
            jitter: true,
        }
    }
}
