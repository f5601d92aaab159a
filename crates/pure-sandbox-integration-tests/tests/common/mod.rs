//! Shared fixtures for the pipeline tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use tokio::sync::mpsc::UnboundedReceiver;

use pure_sandbox_core::{RunOutcome, RunStatus, Sandbox, SandboxConfig, SandboxHandle};
use pure_sandbox_types::{ExecutionMessage, StampedMessage};
use pure_transport::ModuleFetcher;

/// Serves module sources from a fixed map; anything else is a fetch error.
pub struct StaticFetcher {
    pub modules: HashMap<String, String>,
}

impl ModuleFetcher for StaticFetcher {
    fn fetch_module(&self, url: &str) -> anyhow::Result<String> {
        self.modules
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow!("no module at {url}"))
    }
}

/// Spawn a sandbox with a short debounce and the given static modules.
pub fn sandbox_with_modules(
    modules: HashMap<String, String>,
) -> (SandboxHandle, UnboundedReceiver<StampedMessage>) {
    let config = SandboxConfig {
        debounce: Duration::from_millis(10),
        min_fetch_interval: Duration::ZERO,
        ..SandboxConfig::default()
    };
    Sandbox::spawn_with_fetcher(config, Arc::new(StaticFetcher { modules }))
}

pub fn sandbox() -> (SandboxHandle, UnboundedReceiver<StampedMessage>) {
    sandbox_with_modules(HashMap::new())
}

/// Wait until a run newer than `after_id` finishes with a terminal status
/// (anything other than a pending module), bounded by a test-level timeout.
pub async fn wait_for_terminal(handle: &SandboxHandle, after_id: u64) -> RunOutcome {
    let mut outcomes = handle.outcomes();
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            outcomes.changed().await.expect("sandbox loop ended");
            let outcome = outcomes.borrow_and_update().clone();
            if let Some(outcome) = outcome {
                if outcome.execution_id.as_u64() > after_id
                    && !matches!(outcome.status, RunStatus::ModulePending { .. })
                {
                    return outcome;
                }
            }
        }
    })
    .await
    .expect("run never reached a terminal status")
}

pub fn drain(rx: &mut UnboundedReceiver<StampedMessage>) -> Vec<StampedMessage> {
    let mut out = Vec::new();
    while let Ok(message) = rx.try_recv() {
        out.push(message);
    }
    out
}

/// Log payloads stamped with the given execution id.
pub fn logs_for(messages: &[StampedMessage], execution_id: u64) -> Vec<serde_json::Value> {
    messages
        .iter()
        .filter(|m| m.execution_id.as_u64() == execution_id)
        .filter_map(|m| match &m.message {
            ExecutionMessage::Log { messages } => Some(messages.clone()),
            _ => None,
        })
        .flatten()
        .collect()
}
