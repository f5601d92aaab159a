//! Mock network layer.
//!
//! Intercepts outbound fetch-like calls from the realm: normalizes the
//! request, hashes it, emits a `fetch` message, and replays a recorded
//! response when one exists. An unrecorded request yields a sentinel
//! response with status [`SENTINEL_STATUS`] - a normal outcome user code
//! must treat like any other HTTP response, never a thrown error.

use std::collections::{BTreeMap, HashMap};

use anyhow::{anyhow, Result};
use serde_json::Value;

use pure_sandbox_types::{
    hash_canonical, ContentHash, OutboundRequest, RecordedBody, RecordedResponse,
};

use crate::logger::PureLogger;

/// Status used for the "no recording exists yet" sentinel response.
pub const SENTINEL_STATUS: u16 = 599;
pub const SENTINEL_STATUS_TEXT: &str = "Pure Status: Inbound request not found.";
/// Marker body for the sentinel, distinguishable from a genuine recorded
/// empty object.
pub const SENTINEL_BODY: &str = r#"{"easter":"egg"}"#;

/// A reconstructed (or sentinel) response handed back to the realm.
#[derive(Debug, Clone, PartialEq)]
pub struct MockResponse {
    pub status: u16,
    pub status_text: String,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl MockResponse {
    fn sentinel() -> Self {
        Self {
            status: SENTINEL_STATUS,
            status_text: SENTINEL_STATUS_TEXT.to_string(),
            headers: BTreeMap::new(),
            body: SENTINEL_BODY.to_string(),
        }
    }
}

pub struct MockFetchLayer {
    mocks: HashMap<ContentHash, RecordedResponse>,
    logger: PureLogger,
}

impl MockFetchLayer {
    pub fn new(mocks: HashMap<ContentHash, RecordedResponse>, logger: PureLogger) -> Self {
        Self { mocks, logger }
    }

    /// Hash the normalized request, report it, and replay or fall back to
    /// the sentinel.
    pub fn fetch(&self, request: OutboundRequest) -> MockResponse {
        let hash = hash_canonical(
            &serde_json::to_value(&request).unwrap_or_else(|_| Value::String(request.url.clone())),
        );
        self.logger.send(pure_sandbox_types::ExecutionMessage::Fetch {
            request: request.clone(),
            hash: hash.clone(),
        });

        match self.mocks.get(&hash) {
            Some(recorded) => MockResponse {
                status: recorded.status,
                status_text: recorded.status_text.clone(),
                headers: recorded.headers.clone(),
                body: recorded.body.materialize(),
            },
            None => MockResponse::sentinel(),
        }
    }
}

/// Normalize the plain request value produced by the realm's fetch shim
/// into an [`OutboundRequest`].
///
/// Header keys are flattened to a lowercase plain map regardless of their
/// source shape. A string body is parsed into structured data when no
/// content type is declared or the declared type is JSON, so the hash
/// reflects semantic content rather than incidental formatting.
pub fn normalize_request(raw: Value) -> Result<OutboundRequest> {
    let obj = raw
        .as_object()
        .ok_or_else(|| anyhow!("fetch request must be an object"))?;

    let url_text = obj
        .get("url")
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow!("fetch request has no url"))?;
    let url = url::Url::parse(url_text).map_err(|e| anyhow!("invalid url '{url_text}': {e}"))?;

    let method = obj
        .get("method")
        .and_then(Value::as_str)
        .unwrap_or("GET")
        .to_uppercase();

    let mut headers = BTreeMap::new();
    if let Some(Value::Object(map)) = obj.get("headers") {
        for (key, value) in map {
            let text = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            headers.insert(key.to_lowercase(), text);
        }
    }

    let mut body = obj.get("body").cloned().unwrap_or(Value::Null);
    let content_type = headers.get("content-type").map(String::as_str);
    let json_body = match content_type {
        None => true,
        Some(ct) => ct.starts_with("application/json"),
    };
    if json_body {
        if let Value::String(text) = &body {
            body = serde_json::from_str(text)
                .map_err(|e| anyhow!("request body is not valid JSON: {e}"))?;
        }
    }

    Ok(OutboundRequest {
        url: url.to_string(),
        method,
        headers,
        body,
    })
}
