//! Executor loop: runs tasks, measures timing, settles accounting

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Instant;

use futures::FutureExt;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::task::TaskStatus;

use super::core::Shared;

/// Pulls tasks from the execution queue and runs them to a terminal
/// status. Task faults are absorbed here; they never stop the loop.
pub(crate) struct Executor {
    shared: Arc<Shared>,
    slot: usize,
}

impl Executor {
    pub(crate) fn new(shared: Arc<Shared>, slot: usize) -> Self {
        Self { shared, slot }
    }

    /// Run until the hosting runtime goes away.
    pub(crate) async fn run(self) {
        info!(slot = self.slot, "executor started");
        loop {
            self.execute_one().await;
        }
    }

    /// One execution round: wait for a scheduled task, run it, feed the
    /// delay model on success, and settle the counters regardless of
    /// outcome.
    pub(crate) async fn execute_one(&self) {
        let task = loop {
            if let Some(task) = self.shared.exec_queue.pop() {
                break task;
            }
            tokio::select! {
                _ = self.shared.ready.notified() => {}
                _ = sleep(self.shared.config.poll_interval()) => {}
            }
        };

        let predicted_us = self.shared.estimator.estimate(&task);
        task.set_status(TaskStatus::Running);
        debug!(slot = self.slot, task_id = task.id(), predicted_us, "task started");

        let started = Instant::now();
        let outcome = AssertUnwindSafe(task.run()).catch_unwind().await;
        let actual_us = started.elapsed().as_micros() as i64;

        // Settled on success and failure alike, and before the terminal
        // status becomes visible: a caller that sees Finished/Failed
        // must also see this task drained from the counters.
        self.shared.wait.finish(predicted_us);
        self.shared.exec_len.fetch_sub(1, Ordering::SeqCst);

        match outcome {
            Ok(Ok(())) => {
                task.set_status(TaskStatus::Finished);
                self.shared.estimator.observe(&task, predicted_us, actual_us);
                debug!(slot = self.slot, task_id = task.id(), actual_us, "task finished");
            }
            Ok(Err(err)) => {
                task.set_status(TaskStatus::Failed);
                warn!(slot = self.slot, task_id = task.id(), error = %err, "task failed");
            }
            Err(_) => {
                task.set_status(TaskStatus::Failed);
                error!(slot = self.slot, task_id = task.id(), "task panicked");
            }
        }
    }
}
