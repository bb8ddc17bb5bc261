//! Applies update clauses to stored documents.
//!
//! Supported: implicit set (operator-free keys), `$set`, `$setOnInsert` (only when the update
//! inserts), `$unset` and `$inc`. Dotted keys address nested fields and create missing
//! intermediate objects; a literal key that already contains the dots takes precedence.

use crate::error::StorageError;
use fcrypt_cryptor::UpdateClause;
use fcrypt_domain::constants::{SET, SET_ON_INSERT, UNSET};
use fcrypt_domain::document::{Document, Value};
use serde_json::Number;

const INC: &str = "$inc";

pub(crate) fn apply(
    doc: &mut Document,
    update: &UpdateClause,
    inserting: bool,
) -> Result<(), StorageError> {
    for (key, value) in update.as_document() {
        match key.as_str() {
            SET => {
                for (path, value) in operand(key, value)? {
                    set_path(doc, path, value.clone())?;
                }
            }
            SET_ON_INSERT if inserting => {
                for (path, value) in operand(key, value)? {
                    set_path(doc, path, value.clone())?;
                }
            }
            SET_ON_INSERT => {
                operand(key, value)?;
            }
            UNSET => {
                for path in operand(key, value)?.keys() {
                    unset_path(doc, path);
                }
            }
            INC => {
                for (path, delta) in operand(key, value)? {
                    inc_path(doc, path, delta)?;
                }
            }
            operator if operator.starts_with('$') => {
                return Err(StorageError::unsupported(operator));
            }
            _ => set_path(doc, key, value.clone())?,
        }
    }
    Ok(())
}

fn operand<'a>(operator: &str, value: &'a Value) -> Result<&'a Document, StorageError> {
    value.as_object().ok_or_else(|| StorageError::InvalidUpdate {
        message: "operator takes a document of fields".into(),
        context: Some(operator.to_owned().into()),
    })
}

pub(crate) fn set_path(doc: &mut Document, path: &str, value: Value) -> Result<(), StorageError> {
    let Some((head, rest)) = path.split_once('.').filter(|_| !doc.contains_key(path)) else {
        doc.insert(path.to_owned(), value);
        return Ok(());
    };
    match doc.entry(head).or_insert_with(|| Value::Object(Document::new())) {
        Value::Object(child) => set_path(child, rest, value),
        _ => Err(StorageError::invalid_update(format!(
            "cannot create field \"{rest}\" inside non-object \"{head}\""
        ))),
    }
}

fn unset_path(doc: &mut Document, path: &str) {
    if doc.shift_remove(path).is_some() {
        return;
    }
    if let Some((head, rest)) = path.split_once('.') {
        if let Some(Value::Object(child)) = doc.get_mut(head) {
            unset_path(child, rest);
        }
    }
}

fn inc_path(doc: &mut Document, path: &str, delta: &Value) -> Result<(), StorageError> {
    let Value::Number(delta) = delta else {
        return Err(StorageError::invalid_update(format!("$inc of \"{path}\" needs a number")));
    };
    let current = crate::filter::resolve(doc, path).cloned();
    let next = match current {
        None | Some(Value::Null) => Value::Number(delta.clone()),
        Some(Value::Number(current)) => Value::Number(add(&current, delta).ok_or_else(|| {
            StorageError::invalid_update(format!("$inc of \"{path}\" overflows"))
        })?),
        Some(_) => {
            return Err(StorageError::invalid_update(format!(
                "$inc of \"{path}\" targets a non-numeric field"
            )));
        }
    };
    set_path(doc, path, next)
}

fn add(a: &Number, b: &Number) -> Option<Number> {
    match (a.as_i64(), b.as_i64()) {
        (Some(a), Some(b)) => a.checked_add(b).map(Number::from),
        _ => Number::from_f64(a.as_f64()? + b.as_f64()?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fcrypt_domain::document::{into_document, json};

    fn doc(value: Value) -> Document {
        into_document(value).unwrap()
    }

    fn clause(value: Value) -> UpdateClause {
        UpdateClause::new(doc(value))
    }

    #[test]
    fn test_set_creates_nested_and_keeps_literal_keys() {
        let mut stored = doc(json!({ "_id": 1, "deeply": { "nested.secret": "old" } }));
        apply(
            &mut stored,
            &clause(json!({ "$set": { "deeply.nested.secret": "new", "a.b": 1 }, "plain": "p" })),
            false,
        )
        .unwrap();
        assert_eq!(
            stored,
            doc(json!({
                "_id": 1,
                "deeply": { "nested.secret": "new" },
                "a": { "b": 1 },
                "plain": "p",
            }))
        );
    }

    #[test]
    fn test_set_on_insert_only_when_inserting() {
        let update = clause(json!({ "$setOnInsert": { "created": true } }));
        let mut existing = doc(json!({ "_id": 1 }));
        apply(&mut existing, &update, false).unwrap();
        assert!(!existing.contains_key("created"));

        let mut inserted = doc(json!({ "_id": 2 }));
        apply(&mut inserted, &update, true).unwrap();
        assert_eq!(inserted["created"], true);
    }

    #[test]
    fn test_unset_and_inc() {
        let mut stored = doc(json!({ "_id": 1, "a": { "b": 1, "c": 2 }, "n": 1 }));
        apply(&mut stored, &clause(json!({ "$unset": { "a.b": "" }, "$inc": { "n": 2, "m": 1.5 } })), false)
            .unwrap();
        assert_eq!(stored, doc(json!({ "_id": 1, "a": { "c": 2 }, "n": 3, "m": 1.5 })));
    }

    #[test]
    fn test_rejects_unknown_operator_and_bad_paths() {
        let mut stored = doc(json!({ "s": "x" }));
        assert!(matches!(
            apply(&mut stored, &clause(json!({ "$push": { "l": 1 } })), false),
            Err(StorageError::UnsupportedOperator { .. })
        ));
        assert!(matches!(
            apply(&mut stored, &clause(json!({ "$set": { "s.t": 1 } })), false),
            Err(StorageError::InvalidUpdate { .. })
        ));
    }
}
