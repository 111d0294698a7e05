//! Identity assigner - content-addressed record identifiers
//!
//! `record − id field → canonical_json → SHA-256 → 8-4-4-4-12-32 hex groups`
//!
//! The identity is the full 256-bit digest, so the string is longer than a
//! UUID: 64 hex characters in six hyphen-separated groups. Re-running the
//! pipeline over the same logical data yields the same identities, which
//! is what lets the loading side upsert on `id`.

use sha2::{Digest, Sha256};
use serde_json::Value;

use crate::canonical::canonical_json;

/// Field that carries a record's identity
pub const ID_FIELD: &str = "id";

/// Hex group lengths of a formatted identity
const GROUPS: [usize; 6] = [8, 4, 4, 4, 12, 32];

// ── SHA-256 Identity Computation ──────────────────────────

/// Compute the identity of a record.
///
/// Any existing `id` member is excluded from the hash, so assigning an
/// identity never changes the identity.
pub fn compute_identity(record: &Value) -> String {
    let mut hashable = record.clone();
    if let Value::Object(map) = &mut hashable {
        map.remove(ID_FIELD);
    }

    let canonical = canonical_json(&hashable);
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    format_identity(&hasher.finalize())
}

/// Lowercase hex of a digest, in hyphen-separated 8-4-4-4-12-32 groups
fn format_identity(digest: &[u8]) -> String {
    let mut out = String::with_capacity(digest.len() * 2 + GROUPS.len() - 1);
    let mut bytes = digest.iter();
    for (i, len) in GROUPS.iter().enumerate() {
        if i > 0 {
            out.push('-');
        }
        for byte in bytes.by_ref().take(len / 2) {
            out.push_str(&format!("{:02x}", byte));
        }
    }
    out
}

/// True when `s` has the shape of a formatted identity
pub fn is_identity(s: &str) -> bool {
    let parts: Vec<&str> = s.split('-').collect();
    parts.len() == GROUPS.len()
        && parts.iter().zip(GROUPS).all(|(part, len)| {
            part.len() == len && part.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
        })
}

// ── Assignment ─────────────────────────────────────────────

/// Return a copy of `record` with its identity stored under `id`.
///
/// Non-object records cannot carry a field and are returned unchanged.
pub fn with_identity(record: &Value) -> Value {
    let id = compute_identity(record);
    let mut out = record.clone();
    match &mut out {
        Value::Object(map) => {
            map.insert(ID_FIELD.to_string(), Value::String(id));
        }
        other => {
            tracing::warn!(kind = value_kind(other), "skipping identity for non-object record");
        }
    }
    out
}

/// Assign identities to every record of a sequence
pub fn assign_identities(records: &[Value]) -> Vec<Value> {
    records.iter().map(with_identity).collect()
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
