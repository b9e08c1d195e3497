//! # Hashing & Canonicalization
//!
//! Every hash in Denarius is SHA-256 over a canonical byte encoding, rendered
//! as 64 lowercase hex characters. The same function links blocks together
//! and feeds the proof-of-work predicate, so determinism is not negotiable:
//! two structurally equal values must produce the same digest no matter how
//! they were built.
//!
//! ## Canonical form
//!
//! Values are first lowered to a `serde_json::Value`, then every object has
//! its keys re-inserted in lexicographic order, then the result is written
//! with compact separators (no whitespace at all). Sorting explicitly, rather
//! than relying on serde_json's default `BTreeMap` backing, keeps the
//! encoding stable even if some other crate in the build turns on
//! `preserve_order`.
//!
//! Strings are canonicalized like any other value, so `hash_str("abc")`
//! digests the five bytes `"abc"` including the quotes.

use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// A lowercase, 64-character hex encoding of a SHA-256 digest.
pub type Hex256 = String;

/// The value could not be lowered to JSON (e.g. a map with non-string keys).
#[derive(Debug, Error)]
#[error("value cannot be canonicalized: {0}")]
pub struct CanonicalizeError(#[from] serde_json::Error);

/// Compute the SHA-256 digest of `data` as lowercase hex.
///
/// ```
/// use denarius_protocol::crypto::hash::sha256_hex;
///
/// let digest = sha256_hex(b"denarius");
/// assert_eq!(digest.len(), 64);
/// ```
pub fn sha256_hex(data: &[u8]) -> Hex256 {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Recursively rebuild `value` with all object keys in sorted order.
fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut sorted = Map::new();
            for (key, inner) in entries {
                sorted.insert(key, sort_keys(inner));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

/// Render an already-lowered JSON value in canonical form.
pub fn canonical_json_value(value: &Value) -> String {
    // Serializing a `Value` into a String cannot fail.
    sort_keys(value.clone()).to_string()
}

/// Lower any serializable value to its canonical JSON text.
pub fn canonical_json<T: Serialize + ?Sized>(value: &T) -> Result<String, CanonicalizeError> {
    let lowered = serde_json::to_value(value)?;
    Ok(sort_keys(lowered).to_string())
}

/// Hash the canonical encoding of any serializable value.
pub fn hash_value<T: Serialize + ?Sized>(value: &T) -> Result<Hex256, CanonicalizeError> {
    Ok(sha256_hex(canonical_json(value)?.as_bytes()))
}

/// Hash a bare string through the same canonical encoding as structured
/// values. Used for the genesis seed.
pub fn hash_str(s: &str) -> Hex256 {
    sha256_hex(Value::String(s.to_owned()).to_string().as_bytes())
}

/// Returns `true` if `s` looks like a SHA-256 hex digest.
pub fn is_hex256(s: &str) -> bool {
    s.len() == 64 && s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sha256_known_vector() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn canonical_json_sorts_nested_keys() {
        let value = json!({ "b": 1, "a": { "d": [ { "z": 0, "y": 1 } ], "c": "x" } });
        assert_eq!(
            canonical_json_value(&value),
            r#"{"a":{"c":"x","d":[{"y":1,"z":0}]},"b":1}"#
        );
    }

    #[test]
    fn hash_ignores_construction_order() {
        let mut first = Map::new();
        first.insert("sender".into(), json!("alice"));
        first.insert("amount".into(), json!(10));

        let mut second = Map::new();
        second.insert("amount".into(), json!(10));
        second.insert("sender".into(), json!("alice"));

        assert_eq!(
            hash_value(&Value::Object(first)).unwrap(),
            hash_value(&Value::Object(second)).unwrap()
        );
    }

    #[test]
    fn hash_str_includes_quotes() {
        assert_eq!(hash_str("abc"), sha256_hex(b"\"abc\""));
        assert_ne!(hash_str("abc"), sha256_hex(b"abc"));
    }

    #[test]
    fn digests_are_lowercase_hex256() {
        let digest = hash_str("genesis_block");
        assert!(is_hex256(&digest));
        assert!(!is_hex256(&digest.to_uppercase()));
        assert!(!is_hex256("00ff"));
    }
}
