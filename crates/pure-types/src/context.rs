//! Per-run evaluation context and recorded mock payloads.
//!
//! An [`EvaluationContext`] is created fresh on every debounce-triggered run
//! and is immutable once constructed; the next run supersedes it with a new
//! snapshot rather than mutating it. Recorded mocks are supplied externally
//! (a user triggering a real request outside the sandbox) and are additive
//! only.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::hash::ContentHash;
use crate::message::ExecutionId;

/// Immutable snapshot of everything a single run needs.
#[derive(Debug, Clone, Default)]
pub struct EvaluationContext {
    /// The source text under evaluation.
    pub source_text: String,
    /// The id allocated for this run.
    pub execution_id: ExecutionId,
    /// Packages the user has declared; `require` rejects anything else.
    pub declared_dependencies: BTreeSet<String>,
    /// Recorded network responses keyed by content hash.
    pub fetch_mocks: HashMap<ContentHash, RecordedResponse>,
    /// Recorded query rows keyed by content hash.
    pub sql_mocks: HashMap<ContentHash, RecordedRows>,
    /// User-authored sibling modules, loadable via the functions namespace.
    pub functions: BTreeMap<String, String>,
}

/// A normalized outbound request, as hashed and reported by the mock
/// network layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundRequest {
    pub url: String,
    pub method: String,
    pub headers: BTreeMap<String, String>,
    pub body: Value,
}

/// A compiled database query: SQL text plus bound parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledQuery {
    pub sql: String,
    pub parameters: Vec<Value>,
}

/// Rows returned by query execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryRows {
    pub rows: Vec<Value>,
}

/// A recorded response body, tagged with how it should be serialized when
/// the response is reconstructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RecordedBody {
    Json { body: Value },
    Form { body: BTreeMap<String, String> },
    Text { body: String },
    /// Raw bytes, stored as base64.
    Binary { body: String },
    None,
}

impl RecordedBody {
    /// Materialize the body text per its declared kind.
    pub fn materialize(&self) -> String {
        match self {
            RecordedBody::Json { body } => body.to_string(),
            RecordedBody::Form { body } => {
                let mut ser = url::form_urlencoded::Serializer::new(String::new());
                for (key, value) in body {
                    ser.append_pair(key, value);
                }
                ser.finish()
            }
            RecordedBody::Text { body } => body.clone(),
            RecordedBody::Binary { body } => {
                use base64::Engine;
                match base64::engine::general_purpose::STANDARD.decode(body) {
                    Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                    // Not valid base64; replay the stored text as-is.
                    Err(_) => body.clone(),
                }
            }
            RecordedBody::None => String::new(),
        }
    }
}

/// A recorded network response, replayed when a request hashes to its key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedResponse {
    pub status: u16,
    pub status_text: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    pub body: RecordedBody,
}

/// A recorded query result set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordedRows {
    pub rows: Vec<Value>,
}
