//! JSON path resolution for index extraction.
//!
//! Paths are JSON pointers (RFC 6901). Resolution never fails: a path that
//! does not lead anywhere yields `None`, which indexes as "no value".

use serde_json::Value;

/// Resolves `path` against `content`.
///
/// The empty path addresses the whole document.
#[must_use]
pub fn resolve<'a>(content: &'a Value, path: &str) -> Option<&'a Value> {
    content.pointer(path)
}

/// Resolves `path` and returns its elements when it addresses a list.
///
/// Returns `Ok(None)` for an absent path and `Err(value)` with the offending
/// value when the path resolves to something other than a list.
pub fn resolve_list<'a>(content: &'a Value, path: &str) -> Result<Option<&'a [Value]>, &'a Value> {
    match resolve(content, path) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) => Ok(Some(items)),
        Some(other) => Err(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resolves_nested_fields_and_indices() {
        let doc = json!({"a": {"b": [10, 20]}, "c/d": 1, "e~f": 2});
        assert_eq!(resolve(&doc, "/a/b/1"), Some(&json!(20)));
        assert_eq!(resolve(&doc, "/c~1d"), Some(&json!(1)));
        assert_eq!(resolve(&doc, "/e~0f"), Some(&json!(2)));
        assert_eq!(resolve(&doc, ""), Some(&doc));
    }

    #[test]
    fn missing_path_is_absent() {
        let doc = json!({"a": 1});
        assert_eq!(resolve(&doc, "/b"), None);
        assert_eq!(resolve(&doc, "/a/b"), None);
        assert_eq!(resolve(&doc, "a"), None);
    }

    #[test]
    fn resolve_list_distinguishes_absent_and_scalar() {
        let doc = json!({"tags": ["x", "y"], "name": "n"});
        assert_eq!(resolve_list(&doc, "/tags").unwrap().map(<[Value]>::len), Some(2));
        assert_eq!(resolve_list(&doc, "/missing").unwrap(), None);
        assert_eq!(resolve_list(&doc, "/name").unwrap_err(), &json!("n"));
    }
}
