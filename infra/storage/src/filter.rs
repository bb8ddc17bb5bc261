//! Equality matching over dotted paths.
//!
//! A key resolves to a literal field first, then to every way of splitting it at a dot into a
//! field and a sub-path. Only equality is supported: plain values, `$eq`, and the logical
//! `$and`, `$or` and `$nor` over sub-filters.

use crate::error::StorageError;
use fcrypt_domain::document::{Document, Value};

const AND: &str = "$and";
const OR: &str = "$or";
const NOR: &str = "$nor";
const EQ: &str = "$eq";

pub(crate) fn matches(doc: &Document, filter: &Document) -> Result<bool, StorageError> {
    for (key, expected) in filter {
        let satisfied = match key.as_str() {
            AND => {
                let mut all = true;
                for clause in clauses(key, expected)? {
                    all &= matches(doc, clause)?;
                }
                all
            }
            OR => {
                let mut any = false;
                for clause in clauses(key, expected)? {
                    any |= matches(doc, clause)?;
                }
                any
            }
            NOR => {
                let mut any = false;
                for clause in clauses(key, expected)? {
                    any |= matches(doc, clause)?;
                }
                !any
            }
            operator if operator.starts_with('$') => {
                return Err(StorageError::unsupported(operator));
            }
            _ => equals(resolve(doc, key), condition(expected)?),
        };
        if !satisfied {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Value a plain condition compares against: the value itself, or the operand of `$eq`.
pub(crate) fn condition(expected: &Value) -> Result<&Value, StorageError> {
    let Value::Object(map) = expected else {
        return Ok(expected);
    };
    match map.keys().find(|key| key.starts_with('$')) {
        None => Ok(expected),
        Some(_) if map.len() == 1 && map.contains_key(EQ) => Ok(&map[EQ]),
        Some(operator) => Err(StorageError::unsupported(operator)),
    }
}

fn equals(actual: Option<&Value>, expected: &Value) -> bool {
    match actual {
        Some(actual) => actual == expected,
        None => expected.is_null(),
    }
}

fn clauses<'a>(operator: &str, value: &'a Value) -> Result<Vec<&'a Document>, StorageError> {
    let invalid = || StorageError::InvalidDocument {
        message: "logical operators take an array of filters".into(),
        context: Some(operator.to_owned().into()),
    };
    value
        .as_array()
        .ok_or_else(invalid)?
        .iter()
        .map(|clause| clause.as_object().ok_or_else(invalid))
        .collect()
}

pub(crate) fn resolve<'a>(doc: &'a Document, key: &str) -> Option<&'a Value> {
    if let Some(value) = doc.get(key) {
        return Some(value);
    }
    key.match_indices('.')
        .find_map(|(at, _)| doc.get(&key[..at]).and_then(|value| resolve_in(value, &key[at + 1..])))
}

fn resolve_in<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => resolve(map, key),
        Value::Array(items) => {
            let (index, rest) = key.split_once('.').map_or((key, None), |(i, r)| (i, Some(r)));
            let item = items.get(index.parse::<usize>().ok()?)?;
            rest.map_or(Some(item), |rest| resolve_in(item, rest))
        }
        _ => None,
    }
}
