//! Documents are ordered trees of named fields.
//!
//! The order of keys is preserved (`serde_json` is built with `preserve_order`), matching how
//! document stores hand records to their lifecycle hooks.

pub use serde_json::{Map, Value, json};

/// A stored record: an ordered map of field names to JSON values.
pub type Document = Map<String, Value>;

/// A field "has a value" when it is neither `null` nor the empty string.
///
/// Fields without a value are left alone on both encrypt and decrypt.
#[must_use]
pub fn has_value(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

/// Converts a JSON value into a [`Document`] when it is an object.
#[must_use]
pub fn into_document(value: Value) -> Option<Document> {
    match value {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_value() {
        assert!(!has_value(&Value::Null));
        assert!(!has_value(&json!("")));
        assert!(has_value(&json!("x")));
        assert!(has_value(&json!(0)));
        assert!(has_value(&json!(false)));
        assert!(has_value(&json!({})));
    }

    #[test]
    fn test_into_document() {
        assert!(into_document(json!({ "a": 1 })).is_some());
        assert!(into_document(json!([1, 2])).is_none());
    }
}
