//! JSON -> Value, for text written by older encodings.

use prefs_core_store::Value;
use serde_json::{Number, Value as Json};

/// Convert JSON to a storable value.
///
/// Numbers take the first view that holds them: signed, unsigned, float.
pub fn json_to_value(json: Json) -> Value {
    match json {
        Json::Null => Value::Null,
        Json::Bool(flag) => Value::Bool(flag),
        Json::Number(number) => number_to_value(&number),
        Json::String(text) => Value::String(text),
        Json::Array(items) => Value::Array(items.into_iter().map(json_to_value).collect()),
        Json::Object(entries) => Value::Map(
            entries
                .into_iter()
                .map(|(name, item)| (name, json_to_value(item)))
                .collect(),
        ),
    }
}

fn number_to_value(number: &Number) -> Value {
    if let Some(signed) = number.as_i64() {
        return Value::Integer(signed);
    }
    if let Some(unsigned) = number.as_u64() {
        return Value::Unsigned(unsigned);
    }
    number
        .as_f64()
        .map_or_else(|| Value::String(number.to_string()), Value::Float)
}

/// Parse JSON text written by an older encoding into a Value.
///
/// Accepts a complete JSON document, or the bracket-stripped fragment the
/// JSON-envelope codec stores (e.g. `"10 Minutes"` or `1,2`).
pub fn parse_json_text(text: &str) -> Option<Value> {
    if let Ok(json) = serde_json::from_str::<Json>(text) {
        return Some(json_to_value(json));
    }

    let mut items: Vec<Json> = serde_json::from_str(&format!("[{text}]")).ok()?;
    if items.len() != 1 {
        return None;
    }
    items.pop().map(json_to_value)
}
