//! Task model and collaborator capability traits
//!
//! A [`Task`] is the dispatch core's wrapper around caller-supplied
//! behavior: the core owns identity, status, the memoized time estimate,
//! and the leased execution environment, while the [`TaskLogic`] trait
//! carries everything the task actually does.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Opaque key/value configuration interpreted by task logic.
///
/// The dispatch core never validates or interprets entries.
pub type TaskConfig = HashMap<String, String>;

/// Handle to an execution environment leased from the platform layer.
pub type EnvHandle = Arc<dyn ExecEnv>;

/// Marker for platform execution environments (accelerator contexts, workers).
pub trait ExecEnv: Send + Sync + std::fmt::Debug {}

/// Leases execution environments, one per task creation.
pub trait EnvProvider: Send + Sync {
    fn env(&self, acc_id: &str) -> eyre::Result<EnvHandle>;
}

/// Builds task logic instances. Release is `Drop`.
pub trait TaskFactory: Send + Sync {
    fn build(&self) -> Box<dyn TaskLogic>;
}

/// Caller-supplied behavior of a task
#[async_trait]
pub trait TaskLogic: Send + Sync {
    /// Whether the task has everything it needs to run.
    fn is_ready(&self, config: &TaskConfig) -> bool;

    /// Expected execution time in microseconds; `<= 0` means no opinion.
    fn estimate_us(&self, config: &TaskConfig) -> i64 {
        let _ = config;
        0
    }

    /// A default configuration value, as a freshly built task would report it.
    fn default_config(&self, idx: u32, key: &str) -> String {
        let _ = (idx, key);
        String::new()
    }

    /// Run the task against its environment.
    async fn execute(&self, env: &EnvHandle, config: &TaskConfig) -> eyre::Result<()>;
}

/// Task lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum TaskStatus {
    /// Freshly created, not yet configured
    #[default]
    New = 0,
    /// Caller finished configuration; admissible
    Ready = 1,
    /// Accepted into a queue, waiting for execution
    Scheduled = 2,
    /// An executor is running it
    Running = 3,
    /// Execution completed successfully
    Finished = 4,
    /// Execution returned an error or panicked
    Failed = 5,
}

impl TaskStatus {
    /// Whether the task has reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Failed)
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::New,
            1 => Self::Ready,
            2 => Self::Scheduled,
            3 => Self::Running,
            4 => Self::Finished,
            _ => Self::Failed,
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::New => write!(f, "new"),
            Self::Ready => write!(f, "ready"),
            Self::Scheduled => write!(f, "scheduled"),
            Self::Running => write!(f, "running"),
            Self::Finished => write!(f, "finished"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "new" => Ok(Self::New),
            "ready" => Ok(Self::Ready),
            "scheduled" => Ok(Self::Scheduled),
            "running" => Ok(Self::Running),
            "finished" => Ok(Self::Finished),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Unknown task status: {}", s)),
        }
    }
}

/// Shared handle to a task; callers keep one to poll status after admission.
pub type TaskRef = Arc<Task>;

/// A unit of work tracked by the dispatch core.
///
/// Identity and the cached estimate are write-once; status moves through
/// [`TaskStatus`] as the scheduler and executor stages handle the task.
pub struct Task {
    id: u64,
    env: EnvHandle,
    logic: Box<dyn TaskLogic>,
    app_id: OnceLock<String>,
    status: AtomicU8,
    estimate_us: AtomicI64,
    config: RwLock<TaskConfig>,
}

impl Task {
    pub(crate) fn new(id: u64, env: EnvHandle, logic: Box<dyn TaskLogic>) -> Self {
        Self {
            id,
            env,
            logic,
            app_id: OnceLock::new(),
            status: AtomicU8::new(TaskStatus::New as u8),
            estimate_us: AtomicI64::new(0),
            config: RwLock::new(TaskConfig::new()),
        }
    }

    /// Unique id, assigned at creation and never reused.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Owning application, set at admission time.
    pub fn app_id(&self) -> Option<String> {
        self.app_id.get().cloned()
    }

    /// The first binding wins; admission never rebinds a task.
    pub(crate) fn bind_app(&self, app_id: &str) {
        let _ = self.app_id.set(app_id.to_string());
    }

    /// Current lifecycle status.
    pub fn status(&self) -> TaskStatus {
        TaskStatus::from_u8(self.status.load(Ordering::SeqCst))
    }

    /// Update the lifecycle status.
    ///
    /// Callers normally only move `New` -> `Ready`; the other transitions
    /// belong to the scheduler and executor stages.
    pub fn set_status(&self, status: TaskStatus) {
        self.status.store(status as u8, Ordering::SeqCst);
    }

    /// The leased execution environment.
    pub fn env(&self) -> &EnvHandle {
        &self.env
    }

    /// Cached execution-time estimate in microseconds; `<= 0` until estimated.
    pub fn estimate_us(&self) -> i64 {
        self.estimate_us.load(Ordering::SeqCst)
    }

    /// Store the estimate once and return whatever is stored afterwards.
    /// A concurrent first writer wins; the value never changes again.
    pub(crate) fn memoize_estimate(&self, estimate_us: i64) -> i64 {
        match self
            .estimate_us
            .compare_exchange(0, estimate_us, Ordering::SeqCst, Ordering::SeqCst)
        {
            Ok(_) => estimate_us,
            Err(existing) => existing,
        }
    }

    /// Set one configuration value.
    pub fn set_config(&self, key: impl Into<String>, value: impl Into<String>) {
        self.config.write().insert(key.into(), value.into());
    }

    /// Read one configuration value.
    pub fn config_value(&self, key: &str) -> Option<String> {
        self.config.read().get(key).cloned()
    }

    /// Snapshot of the full configuration map.
    pub fn config(&self) -> TaskConfig {
        self.config.read().clone()
    }

    /// Whether the caller-supplied logic reports the task ready to run.
    pub fn is_ready(&self) -> bool {
        self.logic.is_ready(&self.config.read())
    }

    pub(crate) fn logic_estimate(&self) -> i64 {
        self.logic.estimate_us(&self.config.read())
    }

    pub(crate) async fn run(&self) -> eyre::Result<()> {
        // Snapshot so no lock is held across the await
        let config = self.config();
        self.logic.execute(&self.env, &config).await
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("app_id", &self.app_id.get())
            .field("status", &self.status())
            .field("estimate_us", &self.estimate_us())
            .finish()
    }
}
