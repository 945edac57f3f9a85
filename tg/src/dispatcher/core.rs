//! Dispatcher facade: admission, wait-time quotes, and loop lifecycle

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};

use parking_lot::Mutex;
use taskqueue::TaskQueue;
use tokio::sync::Notify;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::DispatchConfig;
use crate::error::DispatchError;
use crate::estimate::{DelayModel, Estimator, FixedDelta};
use crate::policy::{RandomSelect, SelectPolicy};
use crate::task::{EnvProvider, Task, TaskFactory, TaskRef, TaskStatus};
use crate::waittime::WaitTimes;

use super::executor::Executor;
use super::scheduler::Scheduler;

/// State shared between the facade and the background loops
pub(crate) struct Shared {
    pub(crate) config: DispatchConfig,
    /// Per-app queues, created lazily and never removed
    pub(crate) app_queues: Mutex<HashMap<String, Arc<TaskQueue<TaskRef>>>>,
    pub(crate) exec_queue: TaskQueue<TaskRef>,
    /// Tasks moved to the execution queue and not yet done executing
    pub(crate) exec_len: AtomicI64,
    pub(crate) wait: WaitTimes,
    pub(crate) estimator: Estimator,
    pub(crate) policy: Box<dyn SelectPolicy>,
    /// Wakes the scheduler when an app queue gains work
    pub(crate) work: Notify,
    /// Wakes executors when the execution queue gains work
    pub(crate) ready: Notify,
}

/// The admission, queueing, and dispatch core for one accelerator.
///
/// Tasks arrive through [`create`](Self::create) and
/// [`enqueue`](Self::enqueue), wait in their app's queue until the
/// scheduler moves them to the execution queue, and run on one of the
/// executor loops. Callers keep the returned [`TaskRef`] to poll status;
/// execution failures are never delivered back any other way.
pub struct Dispatcher {
    pub(crate) shared: Arc<Shared>,
    factory: Arc<dyn TaskFactory>,
    provider: Arc<dyn EnvProvider>,
    acc_id: String,
    next_task_id: AtomicU64,
    started: AtomicBool,
}

impl Dispatcher {
    /// Create a dispatcher with the default fairness policy and delay model.
    pub fn new(
        config: DispatchConfig,
        acc_id: impl Into<String>,
        factory: Arc<dyn TaskFactory>,
        provider: Arc<dyn EnvProvider>,
    ) -> Self {
        Self::with_parts(
            config,
            acc_id,
            factory,
            provider,
            Box::new(RandomSelect),
            Box::new(FixedDelta),
        )
    }

    /// Create a dispatcher with an explicit fairness policy and delay model.
    pub fn with_parts(
        config: DispatchConfig,
        acc_id: impl Into<String>,
        factory: Arc<dyn TaskFactory>,
        provider: Arc<dyn EnvProvider>,
        policy: Box<dyn SelectPolicy>,
        model: Box<dyn DelayModel>,
    ) -> Self {
        let estimator = Estimator::new(config.default_estimate_us, config.delta_us, model);
        let exec_queue = TaskQueue::bounded(config.exec_queue_capacity);

        Self {
            shared: Arc::new(Shared {
                config,
                app_queues: Mutex::new(HashMap::new()),
                exec_queue,
                exec_len: AtomicI64::new(0),
                wait: WaitTimes::new(),
                estimator,
                policy,
                work: Notify::new(),
                ready: Notify::new(),
            }),
            factory,
            provider,
            acc_id: acc_id.into(),
            next_task_id: AtomicU64::new(0),
            started: AtomicBool::new(false),
        }
    }

    /// Create a task: build its logic, lease an environment, assign the
    /// next id.
    ///
    /// Ids come from a monotonic counter and are never reused; one is
    /// consumed even if the task is discarded without being enqueued.
    pub fn create(&self) -> Result<TaskRef, DispatchError> {
        let logic = self.factory.build();
        let env = self.provider.env(&self.acc_id).map_err(DispatchError::Env)?;
        let task_id = self.next_task_id.fetch_add(1, Ordering::SeqCst);

        let task = Arc::new(Task::new(task_id, env, logic));
        debug!(task_id, acc_id = %self.acc_id, "created task");
        Ok(task)
    }

    /// Admit a task into `app_id`'s queue.
    ///
    /// Fails synchronously with [`DispatchError::InvalidState`] if the
    /// task does not report ready: nothing is queued and no app queue is
    /// created. A full queue blocks the caller, retrying at the
    /// configured interval until space opens (or the optional admission
    /// timeout elapses).
    pub async fn enqueue(&self, app_id: &str, task: TaskRef) -> Result<(), DispatchError> {
        if !task.is_ready() {
            debug!(%app_id, task_id = task.id(), "rejected admission of unready task");
            return Err(DispatchError::InvalidState { task_id: task.id() });
        }

        let queue = self.app_queue(app_id);
        task.bind_app(app_id);
        let estimate_us = self.shared.estimator.estimate(&task);

        // Must happen before the push: after it, the executor may
        // already own the task's status transitions.
        task.set_status(TaskStatus::Scheduled);

        let deadline = self
            .shared
            .config
            .admission_timeout()
            .map(|timeout| (tokio::time::Instant::now() + timeout, timeout));

        let task_id = task.id();
        let mut pending = task;
        loop {
            match queue.push(pending) {
                Ok(()) => break,
                Err(back) => {
                    pending = back;
                    if let Some((deadline, timeout)) = deadline {
                        if tokio::time::Instant::now() >= deadline {
                            pending.set_status(TaskStatus::Ready);
                            warn!(%app_id, task_id, "admission timed out on full queue");
                            return Err(DispatchError::AdmissionTimeout(timeout));
                        }
                    }
                    sleep(self.shared.config.retry_interval()).await;
                }
            }
        }

        self.shared.wait.admit(estimate_us);
        self.shared.work.notify_one();
        debug!(%app_id, task_id, estimate_us, "task admitted");
        Ok(())
    }

    /// Quote the expected wait for `task` as `(lobby, lobby + door)`,
    /// in microseconds.
    ///
    /// The call reserves the task's estimate in the door projection; a
    /// following [`enqueue`](Self::enqueue) consumes the reservation.
    /// Quoting without enqueueing leaves it in place; there is no
    /// compensating release.
    pub fn get_wait_time(&self, task: &TaskRef) -> (i64, i64) {
        let estimate_us = self.shared.estimator.estimate(task);
        self.shared.wait.quote(estimate_us)
    }

    /// Number of tasks moved to the execution queue and not yet done
    /// executing. Usable as a backpressure signal.
    pub fn get_exe_queue_length(&self) -> i64 {
        self.shared.exec_len.load(Ordering::SeqCst)
    }

    /// Read a default configuration value, as a freshly built task would
    /// report it. No environment is leased, no id is consumed, and no
    /// queue is touched.
    pub fn get_config(&self, idx: u32, key: &str) -> String {
        self.factory.build().default_config(idx, key)
    }

    /// Take the next task selected for execution, if any.
    ///
    /// This reads the same queue the built-in executor loops consume.
    /// Draining it externally bypasses the executor stage and with it
    /// the wait-time and queue-length settlement.
    pub fn pop_ready(&self) -> Option<TaskRef> {
        self.shared.exec_queue.pop()
    }

    /// Launch the scheduler loop and the configured number of executor
    /// loops as detached background tasks.
    ///
    /// Idempotent: repeat calls log a warning and do nothing. There is no
    /// shutdown path; the loops run for the life of the runtime.
    pub fn start(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            warn!("dispatcher already started");
            return;
        }

        tokio::spawn(Scheduler::new(self.shared.clone()).run());
        for slot in 0..self.shared.config.executors {
            tokio::spawn(Executor::new(self.shared.clone(), slot).run());
        }
        info!(executors = self.shared.config.executors, acc_id = %self.acc_id, "dispatcher started");
    }

    /// Locate or lazily create the queue for `app_id`. The map lock
    /// covers only the lookup/insert, never the queue operations.
    fn app_queue(&self, app_id: &str) -> Arc<TaskQueue<TaskRef>> {
        let mut queues = self.shared.app_queues.lock();
        queues
            .entry(app_id.to_string())
            .or_insert_with(|| {
                debug!(%app_id, "created app queue");
                Arc::new(TaskQueue::bounded(self.shared.config.app_queue_capacity))
            })
            .clone()
    }

    #[cfg(test)]
    pub(crate) fn app_queue_count(&self) -> usize {
        self.shared.app_queues.lock().len()
    }
}
