//! Reference resolution for dependent sub-requests.
//!
//! A reference segment `$N.field` is replaced by the value found at `field`
//! in item `N`'s response body. Field paths are dotted (`project.id`);
//! numeric components index into arrays (`items.0.id`).
//!
//! Resolved values end up inside a request path, and the responses they come
//! from may carry attacker-controlled data. Only values made of ASCII letters,
//! digits, `_` and `:` are substituted.

use serde_json::Value;

use crate::aggregate::ResultsStore;
use crate::error::{ReferenceError, ReferenceResult};
use crate::path::{ParsedPath, PathSegment};

/// Builds the concrete path for `parsed`, substituting every reference from `store`.
///
/// # Errors
///
/// Returns the first [`ReferenceError`] encountered, in segment order.
pub fn resolve_path(parsed: &ParsedPath, store: &ResultsStore) -> ReferenceResult<String> {
    let mut path = String::new();

    for segment in parsed.segments() {
        path.push('/');
        match segment {
            PathSegment::Literal { value } => path.push_str(value),
            PathSegment::Reference { index, field } => {
                path.push_str(&resolve_reference(store, *index, field)?);
            }
        }
    }

    Ok(path)
}

/// Looks up one reference and returns the text to substitute.
pub fn resolve_reference(
    store: &ResultsStore,
    index: usize,
    field: &str,
) -> ReferenceResult<String> {
    let result = store
        .result(index)
        .ok_or(ReferenceError::MissingReference { index })?;

    let value = reach(result, field).ok_or_else(|| ReferenceError::ReferenceNotFound {
        index,
        field: field.to_string(),
    })?;

    reference_text(value)
        .filter(|text| is_safe_path_value(text))
        .ok_or_else(|| ReferenceError::IllegalReferenceValue {
            index,
            field: field.to_string(),
        })
}

/// Follows a dotted field path into `value`.
///
/// Returns `None` when any component is missing, when a component is not a
/// valid array index for an array, or when the value found is `null`.
pub fn reach<'a>(value: &'a Value, field: &str) -> Option<&'a Value> {
    if field.is_empty() {
        return None;
    }

    let mut current = value;
    for key in field.split('.') {
        current = match current {
            Value::Object(map) => map.get(key)?,
            Value::Array(items) => items.get(key.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    (!current.is_null()).then_some(current)
}

/// Text form of a scalar value; objects and arrays have none.
fn reference_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// True if `text` is non-empty and made only of `[A-Za-z0-9_:]`.
pub fn is_safe_path_value(text: &str) -> bool {
    !text.is_empty()
        && text
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b':')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::BatchAggregate;
    use crate::path::parse_path;
    use serde_json::json;

    fn store_with(results: Vec<Value>) -> ResultsStore {
        let mut aggregate = BatchAggregate::new(results.len() + 1);
        for (index, result) in results.into_iter().enumerate() {
            aggregate.record_response(index, 200, result).unwrap();
        }
        aggregate.store().clone()
    }

    #[test]
    fn test_resolve_simple_reference() {
        let store = store_with(vec![json!({"id": "42"})]);
        let parsed = parse_path("/users/$0.id/profile", 1).unwrap();
        assert_eq!(resolve_path(&parsed, &store).unwrap(), "/users/42/profile");
    }

    #[test]
    fn test_resolve_nested_field() {
        let store = store_with(vec![json!({"project": {"id": "p_1"}})]);
        let parsed = parse_path("/projects/$0.project.id/tasks", 1).unwrap();
        assert_eq!(resolve_path(&parsed, &store).unwrap(), "/projects/p_1/tasks");
    }

    #[test]
    fn test_resolve_array_index_component() {
        let store = store_with(vec![json!({"items": [{"id": "a"}, {"id": "b"}]})]);
        let parsed = parse_path("/items/$0.items.1.id", 1).unwrap();
        assert_eq!(resolve_path(&parsed, &store).unwrap(), "/items/b");
    }

    #[test]
    fn test_resolve_numbers_and_booleans() {
        let store = store_with(vec![json!({"id": 42, "flag": true})]);
        let parsed = parse_path("/a/$0.id/$0.flag", 1).unwrap();
        assert_eq!(resolve_path(&parsed, &store).unwrap(), "/a/42/true");
    }

    #[test]
    fn test_resolve_multiple_items() {
        let store = store_with(vec![json!({"org": "acme"}), json!({"user": "u:7"})]);
        let parsed = parse_path("/orgs/$0.org/users/$1.user", 2).unwrap();
        assert_eq!(resolve_path(&parsed, &store).unwrap(), "/orgs/acme/users/u:7");
    }

    #[test]
    fn test_unset_slot_is_missing_reference() {
        let store = ResultsStore::new(2);
        let parsed = parse_path("/users/$0.id", 1).unwrap();
        assert_eq!(
            resolve_path(&parsed, &store),
            Err(ReferenceError::MissingReference { index: 0 })
        );
    }

    #[test]
    fn test_failed_slot_is_missing_reference() {
        let mut aggregate = BatchAggregate::new(3);
        aggregate
            .record_reference_error(1, ReferenceError::MissingReference { index: 0 })
            .unwrap();
        let parsed = parse_path("/users/$1.id", 2).unwrap();
        assert_eq!(
            resolve_path(&parsed, aggregate.store()),
            Err(ReferenceError::MissingReference { index: 1 })
        );
    }

    #[test]
    fn test_missing_field_is_not_found() {
        let store = store_with(vec![json!({"id": "42"})]);
        let parsed = parse_path("/b/$0.missing", 1).unwrap();
        assert_eq!(
            resolve_path(&parsed, &store),
            Err(ReferenceError::ReferenceNotFound {
                index: 0,
                field: "missing".to_string()
            })
        );
    }

    #[test]
    fn test_null_and_empty_field_are_not_found() {
        let store = store_with(vec![json!({"id": null})]);
        assert!(matches!(
            resolve_reference(&store, 0, "id"),
            Err(ReferenceError::ReferenceNotFound { .. })
        ));
        assert!(matches!(
            resolve_reference(&store, 0, ""),
            Err(ReferenceError::ReferenceNotFound { .. })
        ));
    }

    #[test]
    fn test_non_object_result_is_not_found() {
        let store = store_with(vec![json!("plain text body")]);
        assert!(matches!(
            resolve_reference(&store, 0, "id"),
            Err(ReferenceError::ReferenceNotFound { .. })
        ));
    }

    #[test]
    fn test_illegal_characters_rejected() {
        let store = store_with(vec![json!({
            "traversal": "../admin",
            "slash": "a/b",
            "space": "a b",
            "query": "a?b=1",
            "empty": "",
            "decimal": 1.5,
            "negative": -3,
            "unicode": "caf\u{e9}",
        })]);

        for field in [
            "traversal", "slash", "space", "query", "empty", "decimal", "negative", "unicode",
        ] {
            assert_eq!(
                resolve_reference(&store, 0, field),
                Err(ReferenceError::IllegalReferenceValue {
                    index: 0,
                    field: field.to_string()
                }),
                "field {field} should be rejected"
            );
        }
    }

    #[test]
    fn test_structured_values_rejected() {
        let store = store_with(vec![json!({"obj": {"a": 1}, "arr": [1]})]);
        assert!(matches!(
            resolve_reference(&store, 0, "obj"),
            Err(ReferenceError::IllegalReferenceValue { .. })
        ));
        assert!(matches!(
            resolve_reference(&store, 0, "arr"),
            Err(ReferenceError::IllegalReferenceValue { .. })
        ));
    }

    #[test]
    fn test_first_failing_segment_wins() {
        let store = store_with(vec![json!({"id": "ok"})]);
        let parsed = parse_path("/a/$0.nope/$1.id", 2).unwrap();
        assert!(matches!(
            resolve_path(&parsed, &store),
            Err(ReferenceError::ReferenceNotFound { index: 0, .. })
        ));
    }

    #[test]
    fn test_literal_only_path_resolves_without_store() {
        let parsed = parse_path("/users/list", 0).unwrap();
        assert_eq!(
            resolve_path(&parsed, &ResultsStore::new(0)).unwrap(),
            "/users/list"
        );
    }

    #[test]
    fn test_safe_path_value() {
        assert!(is_safe_path_value("abc_123"));
        assert!(is_safe_path_value("user:alice"));
        assert!(!is_safe_path_value(""));
        assert!(!is_safe_path_value("a-b"));
        assert!(!is_safe_path_value("a.b"));
    }
}
