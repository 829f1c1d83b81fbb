//! Tagged serialized-entity form.
//!
//! Controller entities serialize as `{"type": <name>, "data": <object>}` so
//! a peer (or a stored profile) can tell what kind of entity a blob
//! describes before deserializing it. The `is_*` predicates check that tag.

use serde_json::{Value, json};

/// Wraps entity data in the tagged `{type, data}` form.
pub fn tagged(type_name: &str, data: Value) -> Value {
    json!({
        "type": type_name,
        "data": data,
    })
}

/// Returns `true` iff `value` is the tagged form of the named entity type:
/// an object with `"type"` equal to `type_name` and an object `"data"` field.
pub fn is_tagged(value: &Value, type_name: &str) -> bool {
    let Some(object) = value.as_object() else {
        return false;
    };

    object.get("type").and_then(Value::as_str) == Some(type_name)
        && matches!(object.get("data"), Some(Value::Object(_)))
}

/// Returns `true` iff `value` is a serialized browser controller.
pub fn is_browser(value: &Value) -> bool {
    is_tagged(value, "Browser")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tagged_form_is_recognized() {
        let value = tagged("Browser", json!({"settings": {"host": "localhost"}}));
        assert!(is_browser(&value));
        assert!(is_tagged(&value, "Browser"));
        assert!(!is_tagged(&value, "Tab"));
    }

    #[test]
    fn is_browser_rejects_wrong_shapes() {
        assert!(!is_browser(&json!(null)));
        assert!(!is_browser(&json!("Browser")));
        assert!(!is_browser(&json!({"type": "Tab", "data": {}})));
        assert!(!is_browser(&json!({"type": "Browser"})));
        assert!(!is_browser(&json!({"type": "Browser", "data": []})));
    }
}
