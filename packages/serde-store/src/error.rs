//! Error types for the bridge layer.
//!
//! None of these are fatal. Front-ends turn them into a default value, a
//! skipped field or a dropped collection element, and log them.

/// Errors raised while converting between native values and `Value`s.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// The layout reader was asked about a type that is not struct-like.
    #[error("unsupported kind: {type_name} is not a plain struct")]
    UnsupportedKind { type_name: &'static str },

    /// A struct field could not be decoded from the stored value.
    #[error("unresolved field type: {owner}.{field}: {source}")]
    UnresolvedFieldType {
        owner: &'static str,
        field: &'static str,
        #[source]
        source: Box<BridgeError>,
    },

    /// The stored value has the wrong shape for the bridge.
    #[error("bridge mismatch: expected {expected}, found {found}")]
    BridgeMismatch { expected: String, found: &'static str },

    /// Archiving or unarchiving a value failed.
    #[error("archive failure: {message}")]
    ArchiveFailure { message: String },

    /// One element of a collection failed to convert.
    #[error("element decode failure at {position}: {source}")]
    ElementDecodeFailure {
        position: String,
        #[source]
        source: Box<BridgeError>,
    },

    /// A value could not be encoded as JSON.
    #[error("encode error: {message}")]
    Encode { message: String },

    /// JSON text could not be decoded into the target type.
    #[error("decode error: {message}")]
    Decode { message: String },
}

impl BridgeError {
    /// Create a mismatch error for a value of the wrong shape.
    pub fn mismatch(expected: impl Into<String>, found: &prefs_core_store::Value) -> Self {
        BridgeError::BridgeMismatch {
            expected: expected.into(),
            found: found.kind_name(),
        }
    }

    /// Wrap an error as the failure of one collection element.
    pub fn element(position: impl ToString, source: BridgeError) -> Self {
        BridgeError::ElementDecodeFailure {
            position: position.to_string(),
            source: Box::new(source),
        }
    }
}
