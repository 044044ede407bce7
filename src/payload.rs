use crate::services::{AdminError, ServiceResult};
use serde_json::Value;
use tracing::warn;

/// Strict decoding of a list body: `[...]` or `{ "data": [...] }`.
pub fn expect_list(body: &Value) -> ServiceResult<Vec<Value>> {
    match body {
        Value::Array(items) => Ok(items.clone()),
        Value::Object(map) => match map.get("data") {
            Some(Value::Array(items)) => Ok(items.clone()),
            Some(other) => Err(AdminError::EmptyOrMalformedPayload(format!(
                "data is {}",
                kind(other)
            ))),
            None => Err(AdminError::EmptyOrMalformedPayload(
                "object without data".into(),
            )),
        },
        other => Err(AdminError::EmptyOrMalformedPayload(format!(
            "body is {}",
            kind(other)
        ))),
    }
}

/// Lenient list decoding: anything that is not a list is an empty list.
pub fn normalize_list(body: &Value) -> Vec<Value> {
    expect_list(body).unwrap_or_else(|err| {
        warn!(error = %err, "coercing response to empty list");
        Vec::new()
    })
}

/// Peels a `{ "data": T }` wrapper; other bodies are returned as-is.
pub fn unwrap_data(body: Value) -> Value {
    match body {
        Value::Object(mut map) if map.contains_key("data") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// Best-effort human message from an error body.
pub fn error_message(body: &Value) -> Option<String> {
    match body {
        Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        Value::Object(map) => ["message", "error", "detail"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_str))
            .map(str::to_string),
        _ => None,
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wrapped_and_bare_lists_normalize_alike() {
        let items = json!([{ "_id": "1" }, { "_id": "2" }]);
        let wrapped = json!({ "data": items.clone() });
        assert_eq!(normalize_list(&wrapped), normalize_list(&items));
        assert_eq!(normalize_list(&items).len(), 2);
    }

    #[test]
    fn malformed_bodies_become_empty() {
        for body in [
            json!(null),
            json!("oops"),
            json!({ "data": { "_id": "1" } }),
            json!({ "items": [] }),
            json!(42),
        ] {
            assert!(normalize_list(&body).is_empty(), "{body}");
            assert!(matches!(
                expect_list(&body),
                Err(AdminError::EmptyOrMalformedPayload(_))
            ));
        }
    }

    #[test]
    fn unwraps_data_only_when_present() {
        assert_eq!(unwrap_data(json!({ "data": { "a": 1 } })), json!({ "a": 1 }));
        assert_eq!(unwrap_data(json!({ "a": 1 })), json!({ "a": 1 }));
        assert_eq!(unwrap_data(json!([1])), json!([1]));
    }

    #[test]
    fn error_messages_from_common_shapes() {
        assert_eq!(
            error_message(&json!({ "message": "forbidden" })).as_deref(),
            Some("forbidden")
        );
        assert_eq!(
            error_message(&json!({ "error": "bad id" })).as_deref(),
            Some("bad id")
        );
        assert_eq!(error_message(&json!("plain text")).as_deref(), Some("plain text"));
        assert_eq!(error_message(&json!(null)), None);
    }
}
