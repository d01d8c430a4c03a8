//! Purpose: Decode raw response bodies into JSON values.
//! Exports: `decode_body`.
//! Role: Coerces every body shape into something the casting layer accepts.
//! Invariants: Object key order follows the body text.
//! Invariants: Non-JSON bodies are read as `application/x-www-form-urlencoded`.
//! Notes: `true`/`false` become `{"success": ..}` and bare numbers `{"id": ..}`.

use serde_json::{Map, Value};
use url::form_urlencoded;

pub(crate) fn decode_body(raw: &str) -> Value {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Value::Object(map),
        Ok(Value::Bool(success)) => single("success", Value::Bool(success)),
        Ok(Value::Number(id)) => single("id", Value::Number(id)),
        Ok(Value::Null) | Err(_) => decode_form(raw),
        Ok(other) => {
            tracing::trace!(kind = ?shape(&other), "discarding non-object body");
            Value::Object(Map::new())
        }
    }
}

fn decode_form(raw: &str) -> Value {
    let map: Map<String, Value> = form_urlencoded::parse(raw.trim().as_bytes())
        .into_owned()
        .map(|(key, value)| (key, Value::String(value)))
        .collect();
    Value::Object(map)
}

fn single(key: &str, value: Value) -> Value {
    let mut map = Map::new();
    map.insert(key.to_string(), value);
    Value::Object(map)
}

fn shape(value: &Value) -> &'static str {
    match value {
        Value::String(_) => "string",
        Value::Array(_) => "array",
        _ => "other",
    }
}
