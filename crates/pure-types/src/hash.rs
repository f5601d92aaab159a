//! Content hashing for replay lookup keys.
//!
//! A [`ContentHash`] is a deterministic digest of a canonicalized request or
//! compiled query. Canonicalization sorts object keys recursively, so two
//! structurally equal values always hash identically regardless of the key
//! order they were built with. The hash is a lookup key, never a security
//! token.

use std::collections::BTreeMap;

use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Stable digest of a canonicalized JSON value (SHA-256, base64 text form).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(pub String);

impl ContentHash {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContentHash {
    fn from(s: &str) -> Self {
        ContentHash(s.to_string())
    }
}

/// Hash a JSON value over its canonical serialization.
pub fn hash_canonical(value: &Value) -> ContentHash {
    let mut out = String::new();
    write_canonical(value, &mut out);
    let digest = Sha256::digest(out.as_bytes());
    ContentHash(base64::engine::general_purpose::STANDARD.encode(digest))
}

/// Canonical serialization: compact JSON with object keys sorted at every
/// nesting level. Kept explicit rather than relying on serializer defaults.
fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<&String, &Value> = map.iter().collect();
            out.push('{');
            for (i, (key, val)) in sorted.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String((*key).clone()).to_string());
                out.push(':');
                write_canonical(val, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        other => out.push_str(&other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_hash_is_key_order_independent() {
        let a: Value = serde_json::from_str(r#"{"b":1,"a":{"y":2,"x":3}}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"a":{"x":3,"y":2},"b":1}"#).unwrap();
        assert_eq!(hash_canonical(&a), hash_canonical(&b));
    }

    #[test]
    fn test_hash_distinguishes_values() {
        assert_ne!(
            hash_canonical(&json!({"a": 1})),
            hash_canonical(&json!({"a": 2}))
        );
        assert_ne!(hash_canonical(&json!([1, 2])), hash_canonical(&json!([2, 1])));
    }

    #[test]
    fn test_hash_is_stable_across_calls() {
        let v = json!({"url": "https://api.example.com/x", "method": "GET"});
        assert_eq!(hash_canonical(&v), hash_canonical(&v));
    }

    #[test]
    fn test_canonical_form_sorts_keys() {
        let v: Value = serde_json::from_str(r#"{"z":null,"a":"s"}"#).unwrap();
        let mut out = String::new();
        write_canonical(&v, &mut out);
        assert_eq!(out, r#"{"a":"s","z":null}"#);
    }
}
