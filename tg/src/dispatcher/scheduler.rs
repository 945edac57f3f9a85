//! Scheduler loop: moves tasks from app queues to the execution queue

use std::sync::Arc;
use std::sync::atomic::Ordering;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::core::Shared;

/// Picks one ready app per round and moves one of its tasks forward.
pub(crate) struct Scheduler {
    shared: Arc<Shared>,
}

impl Scheduler {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    /// Run until the hosting runtime goes away.
    pub(crate) async fn run(self) {
        info!("scheduler started");
        loop {
            self.schedule_one().await;
        }
    }

    /// One scheduling round: wait for a non-empty app queue, pick one
    /// under the fairness policy, and move exactly one task to the
    /// execution queue.
    pub(crate) async fn schedule_one(&self) {
        let ready = loop {
            let ready = self.ready_apps();
            if !ready.is_empty() {
                break ready;
            }
            // Block until an admission wakes us, with the poll interval
            // bounding how stale the wake-up can get
            tokio::select! {
                _ = self.shared.work.notified() => {}
                _ = sleep(self.shared.config.poll_interval()) => {}
            }
        };

        let idx = self.shared.policy.select(&ready);
        let app_id = &ready[idx];

        let Some(queue) = self.shared.app_queues.lock().get(app_id).cloned() else {
            // Queues are never removed, so this is a consistency anomaly
            warn!(%app_id, "selected app queue vanished, abandoning round");
            return;
        };

        let Some(task) = queue.pop() else {
            debug!(%app_id, "app queue drained between scan and pop");
            return;
        };
        let task_id = task.id();

        // Full execution queue: hold the task and retry at a fixed interval
        let mut pending = task;
        loop {
            match self.shared.exec_queue.push(pending) {
                Ok(()) => break,
                Err(back) => {
                    pending = back;
                    sleep(self.shared.config.retry_interval()).await;
                }
            }
        }

        self.shared.exec_len.fetch_add(1, Ordering::SeqCst);
        self.shared.ready.notify_one();
        debug!(%app_id, task_id, "scheduled task for execution");
    }

    /// Snapshot of app ids with pending work. Holds the map lock only
    /// for the scan.
    fn ready_apps(&self) -> Vec<String> {
        self.shared
            .app_queues
            .lock()
            .iter()
            .filter(|(_, queue)| !queue.is_empty())
            .map(|(app_id, _)| app_id.clone())
            .collect()
    }
}
