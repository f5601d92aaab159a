//! The tagged message protocol between a sandboxed run and its consumer.
//!
//! Every message placed on the bus is stamped with the [`ExecutionId`] of the
//! run that produced it. Consumers filter on that stamp; a message is never
//! attributed to any run other than the one whose id matches.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::{CompiledQuery, OutboundRequest};
use crate::hash::ContentHash;

/// Monotonically increasing identifier distinguishing one run of the
/// evaluation pipeline from the next.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct ExecutionId(pub u64);

impl ExecutionId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Compile phase reported by the `compile` message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompileStatus {
    Compiling,
    Success,
    Error,
}

/// Structured compile failure payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileErrorInfo {
    pub name: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

/// Background load state of a remote module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleLoadState {
    Loading,
    Loaded,
    Error,
}

/// Shape of a `response` message payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResponseType {
    Json,
    Html,
    Text,
    File,
    Redirect,
    Error,
    Warn,
    ArrayBuffer,
    ReadableStream,
}

/// One message on the bus, before stamping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ExecutionMessage {
    Log {
        messages: Vec<Value>,
    },
    Warn {
        messages: Vec<Value>,
    },
    Error {
        messages: Vec<Value>,
        #[serde(skip_serializing_if = "Option::is_none")]
        stack: Option<String>,
    },
    Fetch {
        request: OutboundRequest,
        hash: ContentHash,
    },
    Sql {
        compiled: CompiledQuery,
        hash: ContentHash,
    },
    Compile {
        status: CompileStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<CompileErrorInfo>,
    },
    ModuleLoadStatus {
        module: String,
        status: ModuleLoadState,
    },
    Response {
        #[serde(rename = "responseType")]
        response_type: ResponseType,
        response: Value,
    },
}

impl ExecutionMessage {
    /// Whether this message belongs to the accumulated log view (as opposed
    /// to the compile/module-status side channels).
    pub fn is_log_kind(&self) -> bool {
        !matches!(
            self,
            ExecutionMessage::Compile { .. } | ExecutionMessage::ModuleLoadStatus { .. }
        )
    }
}

/// A message stamped with the id of the run that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StampedMessage {
    pub execution_id: ExecutionId,
    #[serde(flatten)]
    pub message: ExecutionMessage,
}
