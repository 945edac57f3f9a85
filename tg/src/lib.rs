//! TaskGate - multi-tenant task admission and dispatch core
//!
//! TaskGate accepts units of work from multiple logical applications,
//! holds them in per-app bounded queues, moves them to a shared
//! execution queue under a pluggable fairness policy, and runs them on
//! background executor loops while tracking predicted and actual latency
//! so callers can be quoted an expected wait before they commit.
//!
//! # Core Concepts
//!
//! - **Per-App FIFO**: tasks for one app execute in submission order;
//!   across apps the scheduler randomizes for fairness
//! - **Latency Quotes**: two aggregate counters (lobby and door) answer
//!   "how long would a new arrival wait" without walking any queue
//! - **Memoized Estimates**: a task is estimated once; the value never
//!   changes for the life of the task
//! - **Fault Isolation**: a failing or panicking task is logged and
//!   marked failed; the executor loop keeps going
//!
//! # Modules
//!
//! - [`dispatcher`] - the facade and its scheduler/executor loops
//! - [`task`] - task model and collaborator capability traits
//! - [`estimate`] - execution-time estimation and the feedback hook
//! - [`waittime`] - the lobby/door wait-time counters
//! - [`policy`] - app-queue selection policies
//! - [`config`] - configuration types
//! - [`error`] - error types

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod estimate;
pub mod policy;
pub mod task;
pub mod waittime;

#[cfg(test)]
pub(crate) mod testutil;

// Re-export commonly used types
pub use config::DispatchConfig;
pub use dispatcher::Dispatcher;
pub use error::DispatchError;
pub use estimate::{DelayModel, Estimator, FixedDelta};
pub use policy::{RandomSelect, SelectPolicy};
pub use task::{
    EnvHandle, EnvProvider, ExecEnv, Task, TaskConfig, TaskFactory, TaskLogic, TaskRef, TaskStatus,
};
pub use waittime::WaitTimes;
