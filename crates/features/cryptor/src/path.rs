//! Lookups along a permutation. Arrays are addressed by decimal index segments.

use fcrypt_domain::document::{Document, Value};

pub(crate) fn get<'a>(doc: &'a Document, segments: &[String]) -> Option<&'a Value> {
    let (first, rest) = segments.split_first()?;
    rest.iter().try_fold(doc.get(first)?, |value, segment| child(value, segment))
}

pub(crate) fn get_mut<'a>(doc: &'a mut Document, segments: &[String]) -> Option<&'a mut Value> {
    let (first, rest) = segments.split_first()?;
    rest.iter().try_fold(doc.get_mut(first)?, |value, segment| child_mut(value, segment))
}

fn child<'a>(value: &'a Value, segment: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => items.get(segment.parse::<usize>().ok()?),
        _ => None,
    }
}

fn child_mut<'a>(value: &'a mut Value, segment: &str) -> Option<&'a mut Value> {
    match value {
        Value::Object(map) => map.get_mut(segment),
        Value::Array(items) => items.get_mut(segment.parse::<usize>().ok()?),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fcrypt_domain::document::{into_document, json};

    fn segments(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn test_nested_and_literal_keys() {
        let doc = into_document(json!({
            "a": { "b": "nested" },
            "a.b": "literal",
        }))
        .unwrap();
        assert_eq!(get(&doc, &segments(&["a", "b"])), Some(&json!("nested")));
        assert_eq!(get(&doc, &segments(&["a.b"])), Some(&json!("literal")));
        assert_eq!(get(&doc, &segments(&["a", "c"])), None);
    }

    #[test]
    fn test_array_index_and_scalar_stop() {
        let mut doc = into_document(json!({ "list": [{ "k": "v0" }, { "k": "v1" }], "s": "x" })).unwrap();
        assert_eq!(get(&doc, &segments(&["list", "1", "k"])), Some(&json!("v1")));
        assert_eq!(get(&doc, &segments(&["list", "two", "k"])), None);
        assert_eq!(get(&doc, &segments(&["s", "deeper"])), None);

        *get_mut(&mut doc, &segments(&["list", "0", "k"])).unwrap() = json!("changed");
        assert_eq!(doc["list"][0]["k"], "changed");
    }
}
