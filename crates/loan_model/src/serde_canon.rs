//! Canonical JSON for model bundles
//!
//! Bundles are written and hashed in one byte form: object keys sorted at
//! every level, no whitespace, floats in serde_json's round-trip format. A
//! bundle read back from disk therefore re-serializes to the bytes its
//! content hash was computed over.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Serialize `value` as canonical JSON
pub fn to_canonical_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string(&sort_keys(serde_json::to_value(value)?))
}

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<String, Value> =
                map.into_iter().map(|(key, v)| (key, sort_keys(v))).collect();
            Value::Object(sorted.into_iter().collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        scalar => scalar,
    }
}

/// Hex BLAKE3 digest of the canonical JSON of `value`
pub fn hash_canonical_hex<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let json = to_canonical_json(value)?;
    Ok(hex::encode(blake3::hash(json.as_bytes()).as_bytes()))
}
