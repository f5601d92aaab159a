//! Remote module resolution with a pending/resolved cache.
//!
//! Resolution is two-phase and explicit: [`ModuleResolver::resolve`] returns
//! [`Resolution::Ready`] when the canonical URL is already loaded, otherwise
//! it registers a `Pending` entry, starts a background download, and returns
//! [`Resolution::Pending`]. The orchestrator owns the retry loop - when the
//! background load completes it receives a [`ModuleLoadEvent`] and re-runs
//! the current source once. Entries live for the lifetime of the process and
//! are never evicted.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

use pure_sandbox_types::{ExecutionMessage, ModuleLoadState, ModuleSpec};
use pure_transport::{cdn, ModuleFetcher, RequestQueue};

use crate::logger::PureLogger;

/// State of one cached module URL.
#[derive(Debug, Clone)]
pub enum ModuleState {
    Pending,
    Loaded { source: Arc<str> },
    Failed { error: String },
}

/// Outcome of a resolution attempt.
#[derive(Debug, Clone)]
pub enum Resolution {
    Ready(Arc<str>),
    Pending,
}

/// Notification that a background load finished (or failed), used by the
/// orchestrator to drive the re-run.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleLoadEvent {
    pub module: String,
    pub status: ModuleLoadState,
}

pub struct ModuleResolver {
    cache: Arc<Mutex<HashMap<String, ModuleState>>>,
    fetcher: Arc<dyn ModuleFetcher>,
    queue: Arc<RequestQueue>,
    events: UnboundedSender<ModuleLoadEvent>,
    cdn_base: String,
    runtime: tokio::runtime::Handle,
}

impl ModuleResolver {
    /// Must be called from within a tokio runtime; background loads are
    /// spawned onto it.
    pub fn new(
        fetcher: Arc<dyn ModuleFetcher>,
        queue: Arc<RequestQueue>,
        events: UnboundedSender<ModuleLoadEvent>,
        cdn_base: impl Into<String>,
    ) -> Self {
        Self {
            cache: Arc::new(Mutex::new(HashMap::new())),
            fetcher,
            queue,
            events,
            cdn_base: cdn_base.into(),
            runtime: tokio::runtime::Handle::current(),
        }
    }

    pub fn cdn_base(&self) -> &str {
        &self.cdn_base
    }

    /// Canonical URL for a parsed specifier.
    pub fn canonical_url(&self, spec: &ModuleSpec) -> String {
        cdn::module_url(spec, &self.cdn_base)
    }

    /// Resolve a parsed specifier, kicking off a background load on first
    /// sight.
    pub fn resolve(&self, spec: &ModuleSpec, logger: &PureLogger) -> Resolution {
        let url = self.canonical_url(spec);
        self.resolve_url(&url, &spec.name, logger)
    }

    /// Resolve a canonical URL directly (used for imports discovered inside
    /// already-loaded module sources).
    pub fn resolve_url(&self, url: &str, module_name: &str, logger: &PureLogger) -> Resolution {
        {
            let mut cache = self.cache.lock();
            match cache.get(url) {
                Some(ModuleState::Loaded { source }) => {
                    return Resolution::Ready(source.clone());
                }
                // Failed entries are terminal: the status was already
                // reported, and re-fetching is not attempted.
                Some(ModuleState::Pending) | Some(ModuleState::Failed { .. }) => {
                    return Resolution::Pending;
                }
                None => {
                    cache.insert(url.to_string(), ModuleState::Pending);
                }
            }
        }
        self.spawn_load(url.to_string(), module_name.to_string(), logger.clone());
        Resolution::Pending
    }

    fn spawn_load(&self, url: String, module: String, logger: PureLogger) {
        debug!(url, module, "starting background module load");
        logger.send(ExecutionMessage::ModuleLoadStatus {
            module: module.clone(),
            status: ModuleLoadState::Loading,
        });

        let fetcher = self.fetcher.clone();
        let queue = self.queue.clone();
        let events = self.events.clone();
        let cache = self.cache.clone();

        self.runtime.spawn(async move {
            queue.acquire().await;
            let fetch_url = url.clone();
            let fetched =
                tokio::task::spawn_blocking(move || fetcher.fetch_module(&fetch_url)).await;

            let (state, status) = match fetched {
                Ok(Ok(source)) => (
                    ModuleState::Loaded {
                        source: Arc::from(source.as_str()),
                    },
                    ModuleLoadState::Loaded,
                ),
                Ok(Err(e)) => {
                    warn!(url, "module load failed: {e:#}");
                    (
                        ModuleState::Failed {
                            error: format!("{e:#}"),
                        },
                        ModuleLoadState::Error,
                    )
                }
                Err(join_err) => {
                    warn!(url, "module load task panicked: {join_err}");
                    (
                        ModuleState::Failed {
                            error: join_err.to_string(),
                        },
                        ModuleLoadState::Error,
                    )
                }
            };

            cache.lock().insert(url.clone(), state);
            logger.send(ExecutionMessage::ModuleLoadStatus {
                module: module.clone(),
                status,
            });
            let _ = events.send(ModuleLoadEvent { module, status });
        });
    }
}
