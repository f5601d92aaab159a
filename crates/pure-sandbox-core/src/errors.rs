//! Error taxonomy for the evaluation pipeline.
//!
//! The reportable/ignorable split lives on the error value itself and is
//! checked exactly once, at the logger boundary: a [`RunError::NotReady`]
//! is expected control flow (a module is still loading) and is never
//! reported; everything else surfaces to the consumer as a message. Nothing
//! in this taxonomy is allowed to crash the host.

use pure_sandbox_types::CompileErrorInfo;

/// Malformed source rejected by the compiler. The run aborts before any
/// sandbox execution.
#[derive(Debug, Clone, PartialEq)]
pub struct CompileError {
    pub name: String,
    pub message: String,
    pub stack: Option<String>,
}

impl CompileError {
    pub fn syntax(message: impl Into<String>) -> Self {
        Self {
            name: "SyntaxError".to_string(),
            message: message.into(),
            stack: None,
        }
    }

    pub fn info(&self) -> CompileErrorInfo {
        CompileErrorInfo {
            name: self.name.clone(),
            message: self.message.clone(),
            stack: self.stack.clone(),
        }
    }
}

impl std::fmt::Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.name, self.message)
    }
}

impl std::error::Error for CompileError {}

/// A disallowed or undeclared module specifier.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ValidationError: {}", self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Outcome classification for a failed evaluation.
#[derive(Debug, Clone)]
pub enum RunError {
    /// A required module has not finished loading. Expected control flow;
    /// the orchestrator re-runs once the module arrives.
    NotReady { module: String },
    /// Any other uncaught error during sandboxed evaluation, validation
    /// failures included.
    Evaluation {
        message: String,
        stack: Option<String>,
    },
}

impl RunError {
    pub fn is_reportable(&self) -> bool {
        !matches!(self, RunError::NotReady { .. })
    }

    pub fn evaluation(message: impl Into<String>) -> Self {
        RunError::Evaluation {
            message: message.into(),
            stack: None,
        }
    }
}

impl std::fmt::Display for RunError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunError::NotReady { module } => write!(f, "{module} is not loaded yet"),
            RunError::Evaluation { message, .. } => f.write_str(message),
        }
    }
}

impl std::error::Error for RunError {}
