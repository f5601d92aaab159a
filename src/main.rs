//! pure-sandbox CLI entry point.
//!
//! `pure-sandbox run file.ts` compiles the file, evaluates it in an
//! isolated realm with mocked network and database layers, and prints
//! every stamped message the run produced. The command waits for
//! in-flight module fetches (and the retried runs they trigger) before
//! exiting, bounded by `--settle-ms` of quiet time.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use serde::de::DeserializeOwned;
use tokio::time::Instant;
use tracing_subscriber::EnvFilter;

use pure_sandbox::args::{Args, Command, OutputFormat};
use pure_sandbox::output::write_messages;
use pure_sandbox_core::{MessageView, RunStatus, Sandbox, SandboxConfig, SandboxHandle};
use pure_sandbox_types::{
    parse_module_specifier, ContentHash, ExecutionMessage, ModuleLoadState, RecordedResponse,
    RecordedRows, StampedMessage,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match args.command {
        Command::Run {
            file,
            deps,
            fetch_mocks,
            sql_mocks,
            format,
            settle_ms,
            cdn,
        } => {
            run(
                &file,
                &deps,
                fetch_mocks.as_deref(),
                sql_mocks.as_deref(),
                format,
                Duration::from_millis(settle_ms),
                cdn,
            )
            .await
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn run(
    file: &Path,
    deps: &[String],
    fetch_mocks: Option<&Path>,
    sql_mocks: Option<&Path>,
    format: OutputFormat,
    settle: Duration,
    cdn: Option<String>,
) -> Result<()> {
    let source = fs::read_to_string(file)
        .with_context(|| format!("failed to read source file {}", file.display()))?;

    let mut config = SandboxConfig::default();
    if let Some(cdn) = cdn {
        config.cdn_base = cdn;
    }
    let (handle, mut messages) = Sandbox::spawn(config);

    apply_dependencies(&handle, deps)?;
    if let Some(path) = fetch_mocks {
        let mocks: HashMap<ContentHash, RecordedResponse> = read_json(path)?;
        for (hash, response) in mocks {
            handle.record_fetch_mock(hash, response);
        }
    }
    if let Some(path) = sql_mocks {
        let mocks: HashMap<ContentHash, RecordedRows> = read_json(path)?;
        for (hash, rows) in mocks {
            handle.record_sql_mock(hash, rows);
        }
    }

    handle.submit_edit(source)?;
    let (collected, status) = collect_messages(&handle, &mut messages, settle).await;

    let mut stdout = std::io::stdout().lock();
    write_messages(&mut stdout, format, &collected)?;

    // Sandbox-level failures are messages in the stream, not exit codes;
    // only host failures abort.
    match status {
        Some(RunStatus::Success) => {}
        Some(other) => tracing::warn!(status = ?other, "run did not complete successfully"),
        None => return Err(anyhow!("sandbox shut down before producing an outcome")),
    }
    Ok(())
}

fn apply_dependencies(handle: &SandboxHandle, deps: &[String]) -> Result<()> {
    let mut declared = BTreeSet::new();
    for dep in deps {
        let spec = parse_module_specifier(dep)
            .ok_or_else(|| anyhow!("invalid dependency specifier '{dep}'"))?;
        declared.insert(spec.name);
    }
    handle.set_dependencies(declared);
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read mock file {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("failed to parse mock file {}", path.display()))
}

/// Drain the message bus until the run settles: the last outcome is
/// terminal, no module load is still in flight, and the quiet window has
/// had a chance to catch stragglers.
async fn collect_messages(
    handle: &SandboxHandle,
    messages: &mut tokio::sync::mpsc::UnboundedReceiver<StampedMessage>,
    settle: Duration,
) -> (Vec<StampedMessage>, Option<RunStatus>) {
    let mut outcomes = handle.outcomes();
    let mut view = MessageView::new();
    let mut collected = Vec::new();
    let mut loading: HashSet<String> = HashSet::new();
    let mut status: Option<RunStatus> = None;
    let mut deadline = Instant::now() + settle;

    loop {
        tokio::select! {
            message = messages.recv() => {
                let Some(message) = message else { break };
                if let ExecutionMessage::ModuleLoadStatus { module, status } = &message.message {
                    match status {
                        ModuleLoadState::Loading => {
                            loading.insert(module.clone());
                        }
                        ModuleLoadState::Loaded | ModuleLoadState::Error => {
                            loading.remove(module);
                        }
                    }
                }
                view.apply(message.clone());
                collected.push(message);
                deadline = Instant::now() + settle;
            }
            changed = outcomes.changed() => {
                if changed.is_err() {
                    break;
                }
                let outcome = outcomes.borrow_and_update().clone();
                if let Some(outcome) = outcome {
                    status = Some(outcome.status);
                }
                deadline = Instant::now() + settle;
                if matches!(
                    status,
                    Some(RunStatus::Success)
                        | Some(RunStatus::CompileFailed)
                        | Some(RunStatus::EvaluationFailed)
                ) && loading.is_empty()
                {
                    // Give already-sent messages a moment to drain.
                    while let Ok(message) = messages.try_recv() {
                        view.apply(message.clone());
                        collected.push(message);
                    }
                    break;
                }
            }
            _ = tokio::time::sleep_until(deadline) => break,
        }
    }

    // Only the newest run's output is authoritative.
    let active = view.active_execution_id();
    collected.retain(|m| {
        m.execution_id == active || matches!(m.message, ExecutionMessage::ModuleLoadStatus { .. })
    });
    (collected, status)
}
