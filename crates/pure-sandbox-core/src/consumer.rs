//! Consumer-side view over the stamped message stream.
//!
//! The bus delivers messages from every run, including runs that were
//! superseded mid-flight. [`MessageView`] folds the stream into what a
//! display surface should show: output of the newest run only, the
//! current compile phase, and per-module load states (which persist
//! across runs, since the resolver cache does too).

use std::collections::BTreeMap;

use pure_sandbox_types::{
    CompileErrorInfo, CompileStatus, ExecutionId, ExecutionMessage, ModuleLoadState,
    StampedMessage,
};

#[derive(Debug, Default)]
pub struct MessageView {
    active: ExecutionId,
    logs: Vec<StampedMessage>,
    compile_status: Option<CompileStatus>,
    compile_error: Option<CompileErrorInfo>,
    modules: BTreeMap<String, ModuleLoadState>,
}

impl MessageView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the view to a new run, discarding output from older runs.
    pub fn set_active(&mut self, execution_id: ExecutionId) {
        if execution_id > self.active {
            self.active = execution_id;
            self.logs.retain(|m| m.execution_id == execution_id);
        }
    }

    /// Fold one stamped message into the view. Messages stamped with an id
    /// older than the active run are dropped.
    pub fn apply(&mut self, message: StampedMessage) {
        match &message.message {
            ExecutionMessage::Compile { status, error } => {
                if message.execution_id < self.active {
                    return;
                }
                // A new compile marks the start of a new run; everything
                // shown so far belongs to a superseded one.
                self.set_active(message.execution_id);
                self.compile_status = Some(*status);
                self.compile_error = error.clone();
            }
            ExecutionMessage::ModuleLoadStatus { module, status } => {
                self.modules.insert(module.clone(), *status);
            }
            _ => {
                if message.execution_id < self.active {
                    return;
                }
                self.set_active(message.execution_id);
                self.logs.push(message);
            }
        }
    }

    pub fn logs(&self) -> &[StampedMessage] {
        &self.logs
    }

    pub fn active_execution_id(&self) -> ExecutionId {
        self.active
    }

    pub fn compile_status(&self) -> Option<CompileStatus> {
        self.compile_status
    }

    pub fn compile_error(&self) -> Option<&CompileErrorInfo> {
        self.compile_error.as_ref()
    }

    pub fn module_status(&self, module: &str) -> Option<ModuleLoadState> {
        self.modules.get(module).copied()
    }

    pub fn module_statuses(&self) -> &BTreeMap<String, ModuleLoadState> {
        &self.modules
    }
}

// ============================================================================
// Tests
// ============================================================================
