//! Test doubles shared by the crate's unit tests

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::DispatchConfig;
use crate::dispatcher::Dispatcher;
use crate::task::{EnvHandle, EnvProvider, ExecEnv, TaskConfig, TaskFactory, TaskLogic};

#[derive(Debug)]
pub(crate) struct StubEnv;

impl ExecEnv for StubEnv {}

pub(crate) struct StubProvider;

impl EnvProvider for StubProvider {
    fn env(&self, _acc_id: &str) -> eyre::Result<EnvHandle> {
        Ok(Arc::new(StubEnv))
    }
}

pub(crate) struct FailingProvider;

impl EnvProvider for FailingProvider {
    fn env(&self, acc_id: &str) -> eyre::Result<EnvHandle> {
        Err(eyre::eyre!("no environment available for {acc_id}"))
    }
}

/// Logic scripted through task configuration: `ready=false`,
/// `estimate_us=<n>`, `fail=true`, `panic=true`, `delay_ms=<n>`.
pub(crate) struct ScriptedLogic;

#[async_trait]
impl TaskLogic for ScriptedLogic {
    fn is_ready(&self, config: &TaskConfig) -> bool {
        config.get("ready").map(|v| v != "false").unwrap_or(true)
    }

    fn estimate_us(&self, config: &TaskConfig) -> i64 {
        config.get("estimate_us").and_then(|v| v.parse().ok()).unwrap_or(0)
    }

    fn default_config(&self, idx: u32, key: &str) -> String {
        format!("default-{idx}-{key}")
    }

    async fn execute(&self, _env: &EnvHandle, config: &TaskConfig) -> eyre::Result<()> {
        if let Some(ms) = config.get("delay_ms").and_then(|v| v.parse().ok()) {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
        if config.get("panic").is_some_and(|v| v == "true") {
            panic!("scripted panic");
        }
        if config.get("fail").is_some_and(|v| v == "true") {
            return Err(eyre::eyre!("scripted failure"));
        }
        Ok(())
    }
}

pub(crate) struct ScriptedFactory;

impl TaskFactory for ScriptedFactory {
    fn build(&self) -> Box<dyn TaskLogic> {
        Box::new(ScriptedLogic)
    }
}

pub(crate) fn dispatcher(config: DispatchConfig) -> Dispatcher {
    Dispatcher::new(config, "acc0", Arc::new(ScriptedFactory), Arc::new(StubProvider))
}
