//! # JSON Canonicalization (RFC 8785)
//!
//! Every structured object is canonicalized before it is hashed or signed,
//! so two equal JSON values always produce the same bytes regardless of key
//! order or whitespace.

use serde::Serialize;

use crate::error::{Error, Result};

/// Canonicalize a serializable value per RFC 8785 (JCS).
pub fn canonicalize<T: Serialize>(value: &T) -> Result<String> {
    serde_jcs::to_string(value).map_err(|e| Error::SerializationError(e.to_string()))
}

/// Canonicalize an already-parsed `serde_json::Value`.
pub fn canonicalize_value(value: &serde_json::Value) -> Result<String> {
    canonicalize(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_key_order_is_irrelevant() {
        let a = json!({"b": 1, "a": 2});
        let b = json!({"a": 2, "b": 1});
        assert_eq!(canonicalize(&a).unwrap(), canonicalize(&b).unwrap());
    }

    #[test]
    fn test_whitespace_is_irrelevant() {
        let a: serde_json::Value = serde_json::from_str(r#"{"a":1,"b":2}"#).unwrap();
        let b: serde_json::Value = serde_json::from_str("{ \"a\" : 1,  \"b\" : 2 }").unwrap();
        assert_eq!(canonicalize(&a).unwrap(), canonicalize(&b).unwrap());
    }

    #[test]
    fn test_nested_objects_are_canonicalized() {
        let value = json!({"z": {"y": 1, "x": 2}, "a": [3, 2, 1]});
        let out = canonicalize(&value).unwrap();
        assert_eq!(out, r#"{"a":[3,2,1],"z":{"x":2,"y":1}}"#);
    }
}
