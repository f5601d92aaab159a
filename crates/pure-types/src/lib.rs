//! Shared types for the pure-sandbox workspace.
//!
//! This crate provides foundational types used across multiple crates in the
//! workspace, breaking circular dependency chains.
//!
//! ## Core Types
//!
//! - [`message::ExecutionMessage`] / [`message::StampedMessage`] - the tagged
//!   message protocol emitted by a sandboxed run
//! - [`context::EvaluationContext`] - the immutable per-run snapshot of source,
//!   declared dependencies, and recorded mocks
//! - [`hash::ContentHash`] - deterministic digest used as a replay lookup key
//! - [`module_spec::ModuleSpec`] - a parsed bare module specifier

pub mod context;
pub mod hash;
pub mod message;
pub mod module_spec;

// Re-export commonly used types at crate root
pub use context::{
    CompiledQuery, EvaluationContext, OutboundRequest, QueryRows, RecordedBody, RecordedResponse,
    RecordedRows,
};
pub use hash::{hash_canonical, ContentHash};
pub use message::{
    CompileErrorInfo, CompileStatus, ExecutionId, ExecutionMessage, ModuleLoadState, ResponseType,
    StampedMessage,
};
pub use module_spec::{parse_module_specifier, ModuleKind, ModuleSpec};
