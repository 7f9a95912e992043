//! Hashing System - SHA-256 Fingerprints
//!
//! Identical specs hash identically regardless of key order; identical
//! emitted source hashes identically. Re-running a generation is checkable
//! by comparing fingerprints.

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::codegen::BackendKind;
use crate::spec::PageSpec;

/// Lowercase hex SHA-256 of `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Compact JSON with object keys sorted at every depth.
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string(&canonicalize(serde_json::to_value(value)?))
}

fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));
            Value::Object(entries.into_iter().map(|(k, v)| (k, canonicalize(v))).collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

/// Fingerprint of a parsed spec.
pub fn compute_spec_hash(spec: &PageSpec) -> Result<String, serde_json::Error> {
    let canonical = canonical_json(spec)?;
    Ok(sha256_hex(canonical.as_bytes()))
}

/// Fingerprint of emitted source for one backend.
/// output_hash = sha256(backend + ":" + source)
pub fn compute_output_hash(backend: BackendKind, source: &str) -> String {
    sha256_hex(format!("{}:{}", backend, source).as_bytes())
}
