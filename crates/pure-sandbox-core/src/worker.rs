//! A single evaluation run: compile, build a fresh realm, evaluate.
//!
//! Runs execute on blocking threads because the engine context is not
//! `Send`. Everything a run needs travels in through [`RunRequest`]; the
//! only outputs are stamped messages on the bus and the [`RunOutcome`]
//! handed back to the orchestrator.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;

use pure_sandbox_types::{CompileStatus, EvaluationContext, ExecutionId, ExecutionMessage};

use crate::compiler::Compiler;
use crate::errors::RunError;
use crate::logger::PureLogger;
use crate::mock_db::{MockQueryLayer, NoopDriver, QueryDriver};
use crate::mock_fetch::MockFetchLayer;
use crate::module_loader::ModuleLoader;
use crate::realm::{Realm, RealmBindings};
use crate::resolver::ModuleResolver;

// ============================================================================
// Types
// ============================================================================

/// Everything one run needs.
pub struct RunRequest {
    pub context: Arc<EvaluationContext>,
    pub logger: PureLogger,
    pub resolver: Arc<ModuleResolver>,
    /// Query driver for statements without a recorded replay. Defaults to
    /// the no-op driver when the orchestrator does not supply one.
    pub driver: Option<Box<dyn QueryDriver>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    Success,
    CompileFailed,
    EvaluationFailed,
    /// The run stopped on a module that is still being fetched; the
    /// orchestrator retries once the load completes.
    ModulePending { module: String },
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub execution_id: ExecutionId,
    pub elapsed: Duration,
    pub status: RunStatus,
}

// ============================================================================
// Execution
// ============================================================================

/// Run the full pipeline for one source snapshot. Never panics on user
/// input; every failure mode maps to a message on the bus and a status.
pub fn execute_run(request: RunRequest) -> RunOutcome {
    let RunRequest {
        context,
        logger,
        resolver,
        driver,
    } = request;
    let execution_id = logger.execution_id();
    let started = Instant::now();

    logger.send(ExecutionMessage::Compile {
        status: CompileStatus::Compiling,
        error: None,
    });

    let compiled = match Compiler::compile(&context.source_text) {
        Ok(compiled) => compiled,
        Err(err) => {
            debug!(%execution_id, error = %err, "compile failed");
            logger.send(ExecutionMessage::Compile {
                status: CompileStatus::Error,
                error: Some(err.info()),
            });
            return RunOutcome {
                execution_id,
                elapsed: started.elapsed(),
                status: RunStatus::CompileFailed,
            };
        }
    };
    logger.send(ExecutionMessage::Compile {
        status: CompileStatus::Success,
        error: None,
    });

    let loader = Arc::new(ModuleLoader::new(
        resolver,
        context.clone(),
        logger.clone(),
    ));
    let fetch = Arc::new(MockFetchLayer::new(
        context.fetch_mocks.clone(),
        logger.clone(),
    ));
    let db = Arc::new(MockQueryLayer::new(
        driver.unwrap_or_else(|| Box::new(NoopDriver)),
        context.sql_mocks.clone(),
        logger.clone(),
    ));

    let mut realm = match Realm::new(RealmBindings {
        logger: logger.clone(),
        fetch,
        db,
        loader,
    }) {
        Ok(realm) => realm,
        Err(err) => {
            logger.error(
                vec![serde_json::Value::String(format!(
                    "failed to prepare evaluation realm: {err}"
                ))],
                None,
            );
            return RunOutcome {
                execution_id,
                elapsed: started.elapsed(),
                status: RunStatus::EvaluationFailed,
            };
        }
    };

    let status = match realm.evaluate(&compiled) {
        Ok(()) => RunStatus::Success,
        Err(err) => {
            logger.report(&err);
            match err {
                RunError::NotReady { module } => RunStatus::ModulePending { module },
                RunError::Evaluation { .. } => RunStatus::EvaluationFailed,
            }
        }
    };

    let elapsed = started.elapsed();
    debug!(%execution_id, ?status, ?elapsed, "run finished");
    RunOutcome {
        execution_id,
        elapsed,
        status,
    }
}

// ============================================================================
// Tests
// ============================================================================
