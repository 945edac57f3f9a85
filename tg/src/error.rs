//! Dispatch error types
//!
//! Only the admission precondition surfaces to callers synchronously.
//! Everything else in the pipeline (full queues, task faults) is
//! absorbed locally and observable through logs or the task's own
//! status field.

use std::time::Duration;

use thiserror::Error;

/// Errors surfaced by the dispatcher's caller-facing operations
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The task did not report ready at enqueue time. Synchronous and
    /// side-effect free: nothing was queued, no app queue was created.
    #[error("task {task_id} is not ready to be enqueued")]
    InvalidState { task_id: u64 },

    /// The platform layer failed to lease an execution environment.
    #[error("environment provisioning failed: {0}")]
    Env(eyre::Report),

    /// Admission gave up waiting for queue space. Only reachable when an
    /// admission timeout is configured; by default admission blocks
    /// indefinitely.
    #[error("admission timed out after {0:?}")]
    AdmissionTimeout(Duration),
}

impl DispatchError {
    /// Check if this is the admission precondition violation.
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, DispatchError::InvalidState { .. })
    }

    /// Check if this error is transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            DispatchError::InvalidState { .. } => false,
            DispatchError::Env(_) => false,
            DispatchError::AdmissionTimeout(_) => true,
        }
    }
}
