//! Compile-sandbox-run pipeline for TypeScript snippets.
//!
//! Source text flows through three stages: the [`compiler`] strips types
//! and lowers modules to CommonJS, the [`realm`] evaluates the result in a
//! fresh isolated engine context with deterministic mock network and
//! database layers, and the [`orchestrator`] debounces edits, stamps every
//! run with a monotonic execution id, and retries runs interrupted by
//! in-flight module fetches. All observable output travels as stamped
//! messages on a single bus; [`consumer::MessageView`] folds that stream
//! into a displayable state.

pub mod compiler;
pub mod consumer;
pub mod errors;
pub mod logger;
pub mod mock_db;
pub mod mock_fetch;
pub mod module_loader;
pub mod orchestrator;
pub mod realm;
pub mod resolver;
pub mod worker;

pub use compiler::Compiler;
pub use consumer::MessageView;
pub use errors::{CompileError, RunError, ValidationError};
pub use logger::PureLogger;
pub use mock_db::{MockQueryLayer, NoopDriver, QueryDriver};
pub use mock_fetch::{normalize_request, MockFetchLayer, SENTINEL_BODY, SENTINEL_STATUS};
pub use module_loader::{LoadOutcome, LoadedModule, ModuleLoader};
pub use orchestrator::{Sandbox, SandboxConfig, SandboxHandle, SandboxInputs};
pub use realm::{Realm, RealmBindings};
pub use resolver::{ModuleLoadEvent, ModuleResolver, Resolution};
pub use worker::{execute_run, RunOutcome, RunRequest, RunStatus};
