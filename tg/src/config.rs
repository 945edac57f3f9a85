//! Dispatcher configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Dispatcher configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Capacity of each per-app queue
    #[serde(default = "default_app_queue_capacity")]
    pub app_queue_capacity: usize,

    /// Capacity of the shared execution queue
    #[serde(default = "default_exec_queue_capacity")]
    pub exec_queue_capacity: usize,

    /// Number of executor loops started by `start()`
    #[serde(default = "default_executors")]
    pub executors: usize,

    /// Wake latency in microseconds when a source queue is empty
    #[serde(default = "default_poll_interval_us")]
    pub poll_interval_us: u64,

    /// Backoff in microseconds between retries on a full queue
    #[serde(default = "default_retry_interval_us")]
    pub retry_interval_us: u64,

    /// Conservative estimate in microseconds for tasks with no opinion
    #[serde(default = "default_estimate_us")]
    pub default_estimate_us: i64,

    /// Additive correction applied to task-supplied estimate hints
    #[serde(default)]
    pub delta_us: i64,

    /// Upper bound in microseconds on blocking admission. Unset means a
    /// full app queue blocks the enqueueing caller indefinitely.
    #[serde(default)]
    pub admission_timeout_us: Option<u64>,
}

fn default_app_queue_capacity() -> usize {
    128
}

fn default_exec_queue_capacity() -> usize {
    128
}

fn default_executors() -> usize {
    1
}

fn default_poll_interval_us() -> u64 {
    1_000
}

fn default_retry_interval_us() -> u64 {
    100
}

fn default_estimate_us() -> i64 {
    100_000
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            app_queue_capacity: 128,
            exec_queue_capacity: 128,
            executors: 1,
            poll_interval_us: 1_000,
            retry_interval_us: 100,
            default_estimate_us: 100_000,
            delta_us: 0,
            admission_timeout_us: None,
        }
    }
}

impl DispatchConfig {
    /// Get the empty-queue wake latency as a Duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_micros(self.poll_interval_us)
    }

    /// Get the full-queue retry backoff as a Duration
    pub fn retry_interval(&self) -> Duration {
        Duration::from_micros(self.retry_interval_us)
    }

    /// Get the admission timeout as a Duration, if configured
    pub fn admission_timeout(&self) -> Option<Duration> {
        self.admission_timeout_us.map(Duration::from_micros)
    }
}
