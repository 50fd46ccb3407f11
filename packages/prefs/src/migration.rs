//! Upgrade of values stored as JSON text by older encodings.

use prefs_core_store::Value;
use prefs_serde_store::{parse_json_text, Serializable};

use crate::Suite;

/// Rewrite the value of `key` in the current representation of `T`.
///
/// Values that already encode back to what is stored are left alone, so
/// lossy collection decoding cannot hide a legacy value.
pub(crate) fn migrate<T: Serializable>(suite: &Suite, key: &str) -> bool {
    let Some(stored) = suite.get_raw(key) else {
        return false;
    };

    if is_current::<T>(&stored) {
        return false;
    }

    let upgraded = upgrade(&stored);
    if upgraded == stored {
        return false;
    }

    let value = match T::from_storable(&upgraded) {
        Ok(value) => value,
        Err(error) => {
            tracing::debug!(key, %error, "legacy value does not decode, left as is");
            return false;
        }
    };

    if !keeps_every_entry(&upgraded, &value) {
        tracing::debug!(key, "legacy value decodes with entries missing, left as is");
        return false;
    }

    tracing::debug!(key, "migrated legacy value");
    suite.set_value(key, &value);
    true
}

/// Whether `decoded` still holds every element of the upgraded container.
///
/// Collection decoding skips elements of the wrong type, so a decode can
/// succeed while discarding most of what was stored.
fn keeps_every_entry<T: Serializable>(upgraded: &Value, decoded: &T) -> bool {
    let encoded = match decoded.to_storable() {
        Ok(encoded) => encoded,
        Err(_) => return false,
    };

    match (upgraded, &encoded) {
        (Value::Array(before), Value::Array(after)) => after.len() >= before.len(),
        (Value::Map(before), Value::Map(after)) => after.len() >= before.len(),
        (Value::Array(_) | Value::Map(_), _) => false,
        _ => true,
    }
}

fn is_current<T: Serializable>(stored: &Value) -> bool {
    T::from_storable(stored)
        .and_then(|value| value.to_storable())
        .is_ok_and(|encoded| &encoded == stored)
}

/// Parse JSON text at the top level, or inside list and map elements.
fn upgrade(value: &Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.iter().map(parse_element).collect()),
        Value::Map(entries) => Value::Map(
            entries
                .iter()
                .map(|(name, item)| (name.clone(), parse_element(item)))
                .collect(),
        ),
        other => parse_element(other),
    }
}

fn parse_element(value: &Value) -> Value {
    match value {
        Value::String(text) => parse_json_text(text).unwrap_or_else(|| value.clone()),
        other => other.clone(),
    }
}
