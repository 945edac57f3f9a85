//! Execution-time estimation and the refinement feedback hook

use tracing::debug;

use crate::task::Task;

/// Feedback hook for refining future predictions from observed durations.
///
/// Invoked only for tasks that finish successfully. Implementations may
/// update shared tuning state; they must not panic. A no-op is valid.
pub trait DelayModel: Send + Sync {
    fn observe(&self, task: &Task, predicted_us: i64, actual_us: i64);
}

/// Default model: logs the observation and keeps the correction constants
/// untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixedDelta;

impl DelayModel for FixedDelta {
    fn observe(&self, task: &Task, predicted_us: i64, actual_us: i64) {
        debug!(task_id = task.id(), predicted_us, actual_us, "observed task duration");
    }
}

/// Produces one execution-time estimate per task and caches it there.
pub struct Estimator {
    default_us: i64,
    delta_us: i64,
    model: Box<dyn DelayModel>,
}

impl Estimator {
    pub fn new(default_us: i64, delta_us: i64, model: Box<dyn DelayModel>) -> Self {
        Self {
            default_us,
            delta_us,
            model,
        }
    }

    /// Estimate `task`'s execution time in microseconds.
    ///
    /// The first call memoizes its result on the task; every later call
    /// returns that exact value without consulting the task logic again.
    /// A logic with no opinion gets the conservative constant default.
    pub fn estimate(&self, task: &Task) -> i64 {
        let cached = task.estimate_us();
        if cached > 0 {
            return cached;
        }

        let hint = task.logic_estimate();
        let estimate = if hint <= 0 {
            self.default_us
        } else {
            hint + self.delta_us
        };

        task.memoize_estimate(estimate)
    }

    /// Feed an observed duration to the delay model.
    pub fn observe(&self, task: &Task, predicted_us: i64, actual_us: i64) {
        self.model.observe(task, predicted_us, actual_us);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicI64, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::task::{EnvHandle, TaskConfig, TaskLogic};
    use crate::testutil::{ScriptedLogic, StubEnv};

    /// Returns a different estimate on every call.
    struct VolatileLogic {
        next: AtomicI64,
    }

    #[async_trait]
    impl TaskLogic for VolatileLogic {
        fn is_ready(&self, _config: &TaskConfig) -> bool {
            true
        }

        fn estimate_us(&self, _config: &TaskConfig) -> i64 {
            self.next.fetch_add(100, Ordering::SeqCst)
        }

        async fn execute(&self, _env: &EnvHandle, _config: &TaskConfig) -> eyre::Result<()> {
            Ok(())
        }
    }

    fn estimator() -> Estimator {
        Estimator::new(100_000, 0, Box::new(FixedDelta))
    }

    #[test]
    fn test_no_opinion_falls_back_to_default() {
        let task = Task::new(0, Arc::new(StubEnv), Box::new(ScriptedLogic));
        assert_eq!(estimator().estimate(&task), 100_000);
        assert_eq!(task.estimate_us(), 100_000);
    }

    #[test]
    fn test_hint_plus_delta() {
        let estimator = Estimator::new(100_000, 25, Box::new(FixedDelta));
        let task = Task::new(0, Arc::new(StubEnv), Box::new(ScriptedLogic));
        task.set_config("estimate_us", "400");

        assert_eq!(estimator.estimate(&task), 425);
    }

    #[test]
    fn test_estimate_is_idempotent() {
        let logic = VolatileLogic {
            next: AtomicI64::new(500),
        };
        let task = Task::new(0, Arc::new(StubEnv), Box::new(logic));
        let estimator = estimator();

        // The logic would answer 500, then 600; the memoized value sticks
        let first = estimator.estimate(&task);
        let second = estimator.estimate(&task);
        assert_eq!(first, 500);
        assert_eq!(second, first);
    }

    #[test]
    fn test_negative_hint_treated_as_no_opinion() {
        let task = Task::new(0, Arc::new(StubEnv), Box::new(ScriptedLogic));
        task.set_config("estimate_us", "-5");

        assert_eq!(estimator().estimate(&task), 100_000);
    }
}
