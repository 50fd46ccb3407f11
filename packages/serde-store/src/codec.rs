//! JSON-envelope codec.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::BridgeError;

/// A codec that stores serde values as JSON text.
///
/// The value is encoded as a one-element JSON array and the outer brackets
/// are stripped before storage, so top-level fragments such as a bare
/// string or number survive even though they are not JSON documents on
/// their own. Decoding re-adds the brackets.
///
/// # Example
///
/// ```rust
/// use prefs_serde_store::JsonEnvelope;
///
/// let text = JsonEnvelope::encode(&"10 Minutes").unwrap();
/// assert_eq!(text, "\"10 Minutes\"");
///
/// let decoded: String = JsonEnvelope::decode(&text).unwrap();
/// assert_eq!(decoded, "10 Minutes");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonEnvelope;

impl JsonEnvelope {
    /// Encode a value as envelope text.
    pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<String, BridgeError> {
        let text = serde_json::to_string(&[value]).map_err(|e| BridgeError::Encode {
            message: e.to_string(),
        })?;

        text.strip_prefix('[')
            .and_then(|inner| inner.strip_suffix(']'))
            .map(str::to_string)
            .ok_or_else(|| BridgeError::Encode {
                message: format!("envelope is not a JSON array: {}", text),
            })
    }

    /// Decode envelope text back into a value.
    pub fn decode<T: DeserializeOwned>(text: &str) -> Result<T, BridgeError> {
        let wrapped = format!("[{}]", text);
        let mut items: Vec<T> = serde_json::from_str(&wrapped).map_err(|e| BridgeError::Decode {
            message: e.to_string(),
        })?;

        if items.len() != 1 {
            return Err(BridgeError::Decode {
                message: format!("envelope holds {} values, expected 1", items.len()),
            });
        }
        items.pop().ok_or_else(|| BridgeError::Decode {
            message: "empty envelope".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Window {
        width: u32,
        title: String,
    }

    #[test]
    fn scalars_are_stored_as_fragments() {
        assert_eq!(JsonEnvelope::encode(&42).unwrap(), "42");
        assert_eq!(JsonEnvelope::encode(&true).unwrap(), "true");
        assert_eq!(JsonEnvelope::encode("hi").unwrap(), "\"hi\"");
    }

    #[test]
    fn structs_roundtrip() {
        let window = Window {
            width: 640,
            title: "main".to_string(),
        };

        let text = JsonEnvelope::encode(&window).unwrap();
        assert_eq!(text, r#"{"width":640,"title":"main"}"#);

        let decoded: Window = JsonEnvelope::decode(&text).unwrap();
        assert_eq!(decoded, window);
    }

    #[test]
    fn sequences_keep_inner_brackets() {
        let text = JsonEnvelope::encode(&vec![1, 2]).unwrap();
        assert_eq!(text, "[1,2]");

        let decoded: Vec<i32> = JsonEnvelope::decode(&text).unwrap();
        assert_eq!(decoded, vec![1, 2]);
    }

    #[test]
    fn multiple_values_are_rejected() {
        let result: Result<i32, _> = JsonEnvelope::decode("1,2");
        assert!(matches!(result, Err(BridgeError::Decode { .. })));
    }

    #[test]
    fn empty_text_is_rejected() {
        let result: Result<i32, _> = JsonEnvelope::decode("");
        assert!(matches!(result, Err(BridgeError::Decode { .. })));
    }

    #[test]
    fn wrong_type_is_a_decode_error() {
        let result: Result<Window, _> = JsonEnvelope::decode("\"not a window\"");
        assert!(matches!(result, Err(BridgeError::Decode { .. })));
    }
}
