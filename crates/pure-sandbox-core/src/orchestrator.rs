//! Debounced evaluation orchestration.
//!
//! The orchestrator owns the edit debounce window, the monotonic execution
//! id counter, and the replay that fires when a module finishes loading. Runs execute serially; a new edit simply restarts the debounce
//! window, and whichever snapshot is current when the window closes is the
//! one that runs. Consumers identify the live run by comparing stamped
//! execution ids against [`SandboxHandle::current_execution_id`].

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, warn};

use pure_sandbox_types::{
    ContentHash, EvaluationContext, ExecutionId, ModuleLoadState, RecordedResponse, RecordedRows,
    StampedMessage,
};
use pure_transport::{HttpModuleFetcher, ModuleFetcher, RequestQueue, DEFAULT_CDN_BASE};

use crate::logger::PureLogger;
use crate::resolver::ModuleResolver;
use crate::worker::{execute_run, RunOutcome, RunRequest};

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Clone)]
pub struct SandboxConfig {
    /// Quiet period after the last edit before a run starts.
    pub debounce: Duration,
    /// Base URL modules are fetched from.
    pub cdn_base: String,
    /// Minimum spacing between outbound module fetches.
    pub min_fetch_interval: Duration,
    /// Timeout for a single module fetch.
    pub fetch_timeout: Duration,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(50),
            cdn_base: DEFAULT_CDN_BASE.to_string(),
            min_fetch_interval: Duration::from_millis(100),
            fetch_timeout: Duration::from_secs(20),
        }
    }
}

/// Mutable inputs shared between the embedder and the run loop. A run
/// snapshots these at start; later mutations affect the next run only.
#[derive(Debug, Default)]
pub struct SandboxInputs {
    pub declared_dependencies: BTreeSet<String>,
    pub fetch_mocks: std::collections::HashMap<ContentHash, RecordedResponse>,
    pub sql_mocks: std::collections::HashMap<ContentHash, RecordedRows>,
    pub functions: std::collections::BTreeMap<String, String>,
}

// ============================================================================
// Handle
// ============================================================================

/// Cheap-to-clone control surface for a running sandbox.
#[derive(Clone)]
pub struct SandboxHandle {
    edits: mpsc::UnboundedSender<String>,
    inputs: Arc<Mutex<SandboxInputs>>,
    current: Arc<AtomicU64>,
    outcomes: watch::Receiver<Option<RunOutcome>>,
}

impl SandboxHandle {
    /// Queue a source snapshot for evaluation after the debounce window.
    pub fn submit_edit(&self, source: impl Into<String>) -> Result<()> {
        self.edits
            .send(source.into())
            .map_err(|_| anyhow!("sandbox run loop has shut down"))
    }

    pub fn set_dependencies(&self, dependencies: BTreeSet<String>) {
        self.inputs.lock().declared_dependencies = dependencies;
    }

    pub fn record_fetch_mock(&self, hash: ContentHash, response: RecordedResponse) {
        self.inputs.lock().fetch_mocks.insert(hash, response);
    }

    pub fn record_sql_mock(&self, hash: ContentHash, rows: RecordedRows) {
        self.inputs.lock().sql_mocks.insert(hash, rows);
    }

    pub fn set_function(&self, name: impl Into<String>, source: impl Into<String>) {
        self.inputs.lock().functions.insert(name.into(), source.into());
    }

    /// Id of the most recently started run. Messages stamped with an older
    /// id are stale.
    pub fn current_execution_id(&self) -> ExecutionId {
        ExecutionId(self.current.load(Ordering::SeqCst))
    }

    /// Watch channel carrying the outcome of each finished run.
    pub fn outcomes(&self) -> watch::Receiver<Option<RunOutcome>> {
        self.outcomes.clone()
    }
}

// ============================================================================
// Sandbox
// ============================================================================

pub struct Sandbox;

impl Sandbox {
    /// Spawn the run loop with the real CDN fetcher. Must be called from
    /// within a tokio runtime.
    pub fn spawn(
        config: SandboxConfig,
    ) -> (SandboxHandle, mpsc::UnboundedReceiver<StampedMessage>) {
        let fetcher = Arc::new(HttpModuleFetcher::new(config.fetch_timeout));
        Self::spawn_with_fetcher(config, fetcher)
    }

    /// Spawn the run loop with a caller-supplied module fetcher.
    pub fn spawn_with_fetcher(
        config: SandboxConfig,
        fetcher: Arc<dyn ModuleFetcher>,
    ) -> (SandboxHandle, mpsc::UnboundedReceiver<StampedMessage>) {
        let (edit_tx, edit_rx) = mpsc::unbounded_channel();
        let (msg_tx, msg_rx) = mpsc::unbounded_channel();
        let (outcome_tx, outcome_rx) = watch::channel(None);
        let inputs = Arc::new(Mutex::new(SandboxInputs::default()));
        let current = Arc::new(AtomicU64::new(0));

        let handle = SandboxHandle {
            edits: edit_tx,
            inputs: inputs.clone(),
            current: current.clone(),
            outcomes: outcome_rx,
        };

        tokio::spawn(run_loop(
            config, fetcher, edit_rx, msg_tx, outcome_tx, inputs, current,
        ));

        (handle, msg_rx)
    }
}

// ============================================================================
// Run loop
// ============================================================================

async fn run_loop(
    config: SandboxConfig,
    fetcher: Arc<dyn ModuleFetcher>,
    mut edits: mpsc::UnboundedReceiver<String>,
    msg_tx: mpsc::UnboundedSender<StampedMessage>,
    outcome_tx: watch::Sender<Option<RunOutcome>>,
    inputs: Arc<Mutex<SandboxInputs>>,
    current: Arc<AtomicU64>,
) {
    let (event_tx, mut events) = mpsc::unbounded_channel();
    let queue = Arc::new(RequestQueue::new(config.min_fetch_interval));
    // The resolver cache outlives individual runs so a module fetched for
    // one run is ready for every later one.
    let resolver = Arc::new(ModuleResolver::new(
        fetcher,
        queue,
        event_tx,
        config.cdn_base.clone(),
    ));

    let mut pending_source: Option<String> = None;
    let mut deadline: Option<Instant> = None;
    let mut last_source: Option<String> = None;

    loop {
        let sleep_target = deadline.unwrap_or_else(|| Instant::now() + Duration::from_secs(3600));
        tokio::select! {
            edit = edits.recv() => {
                match edit {
                    Some(source) => {
                        pending_source = Some(source);
                        deadline = Some(Instant::now() + config.debounce);
                    }
                    None => break,
                }
            }
            event = events.recv() => {
                let Some(event) = event else { continue };
                debug!(module = %event.module, status = ?event.status, "module load event");
                // Every finished load replays the last run; user code may
                // have caught the not-ready signal, so a success outcome
                // does not mean the output is current. An edit already
                // waiting on the debounce window wins instead.
                if event.status == ModuleLoadState::Loaded && pending_source.is_none() {
                    if let Some(source) = last_source.clone() {
                        let outcome =
                            run_once(&source, &resolver, &inputs, &current, &msg_tx).await;
                        if let Some(outcome) = outcome {
                            let _ = outcome_tx.send(Some(outcome));
                        }
                    }
                }
            }
            _ = tokio::time::sleep_until(sleep_target), if deadline.is_some() => {
                deadline = None;
                if let Some(source) = pending_source.take() {
                    let outcome = run_once(&source, &resolver, &inputs, &current, &msg_tx).await;
                    last_source = Some(source);
                    if let Some(outcome) = outcome {
                        let _ = outcome_tx.send(Some(outcome));
                    }
                }
            }
        }
    }
}

/// Execute one run on a blocking thread and wait for it to finish.
async fn run_once(
    source: &str,
    resolver: &Arc<ModuleResolver>,
    inputs: &Arc<Mutex<SandboxInputs>>,
    current: &Arc<AtomicU64>,
    msg_tx: &mpsc::UnboundedSender<StampedMessage>,
) -> Option<RunOutcome> {
    let execution_id = ExecutionId(current.fetch_add(1, Ordering::SeqCst) + 1);
    let context = {
        let inputs = inputs.lock();
        EvaluationContext {
            source_text: source.to_string(),
            execution_id,
            declared_dependencies: inputs.declared_dependencies.clone(),
            fetch_mocks: inputs.fetch_mocks.clone(),
            sql_mocks: inputs.sql_mocks.clone(),
            functions: inputs.functions.clone(),
        }
    };

    let request = RunRequest {
        context: Arc::new(context),
        logger: PureLogger::new(execution_id, msg_tx.clone()),
        resolver: resolver.clone(),
        driver: None,
    };

    match tokio::task::spawn_blocking(move || execute_run(request)).await {
        Ok(outcome) => Some(outcome),
        Err(err) => {
            warn!(%execution_id, error = %err, "evaluation task failed");
            None
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
