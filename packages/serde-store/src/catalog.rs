//! Bridges for user types: JSON envelope, raw value and keyed archive.

use std::any::type_name;
use std::marker::PhantomData;

use bincode::Options;
use prefs_core_store::Value;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::{Bridge, BridgeError, BridgeKind, JsonEnvelope, Serializable};

/// Stores any serde type as JSON-envelope text.
pub struct CodableBridge<T>(PhantomData<fn() -> T>);

impl<T> CodableBridge<T> {
    pub const fn new() -> Self {
        CodableBridge(PhantomData)
    }
}

impl<T> Default for CodableBridge<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Serialize + DeserializeOwned> Bridge for CodableBridge<T> {
    type Native = T;

    fn kind(&self) -> BridgeKind {
        BridgeKind::Codable
    }

    fn serialize(&self, value: &T) -> Result<Value, BridgeError> {
        JsonEnvelope::encode(value).map(Value::String)
    }

    fn deserialize(&self, value: &Value) -> Result<T, BridgeError> {
        let text = value
            .as_str()
            .ok_or_else(|| BridgeError::mismatch("JSON envelope text", value))?;
        JsonEnvelope::decode(text)
    }
}

/// A type represented by a primitive raw value, typically a fieldless enum.
///
/// ```rust
/// use prefs_serde_store::{serializable, RawRepresentable, Serializable, Value};
///
/// #[derive(Debug, PartialEq)]
/// enum Interval {
///     Hourly,
///     Daily,
/// }
///
/// impl RawRepresentable for Interval {
///     type RawValue = String;
///
///     fn raw_value(&self) -> String {
///         match self {
///             Interval::Hourly => "hourly".to_string(),
///             Interval::Daily => "daily".to_string(),
///         }
///     }
///
///     fn from_raw_value(raw: String) -> Option<Self> {
///         match raw.as_str() {
///             "hourly" => Some(Interval::Hourly),
///             "daily" => Some(Interval::Daily),
///             _ => None,
///         }
///     }
/// }
///
/// serializable!(raw_value: Interval);
///
/// assert_eq!(Interval::Daily.to_storable().unwrap(), Value::from("daily"));
/// assert_eq!(Interval::from_storable(&Value::from("hourly")).unwrap(), Interval::Hourly);
/// ```
pub trait RawRepresentable: Sized {
    type RawValue: Serializable;

    fn raw_value(&self) -> Self::RawValue;

    /// `None` when no value corresponds to `raw`.
    fn from_raw_value(raw: Self::RawValue) -> Option<Self>;
}

/// Stores a raw-representable type as its raw value.
pub struct RawValueBridge<T>(PhantomData<fn() -> T>);

impl<T> RawValueBridge<T> {
    pub const fn new() -> Self {
        RawValueBridge(PhantomData)
    }
}

impl<T> Default for RawValueBridge<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn serialize_raw<T: RawRepresentable>(value: &T) -> Result<Value, BridgeError> {
    value.raw_value().to_storable()
}

fn deserialize_raw<T: RawRepresentable>(value: &Value) -> Result<T, BridgeError> {
    let raw = T::RawValue::from_storable(value)?;
    T::from_raw_value(raw)
        .ok_or_else(|| BridgeError::mismatch(format!("raw value of {}", type_name::<T>()), value))
}

impl<T: RawRepresentable> Bridge for RawValueBridge<T> {
    type Native = T;

    fn kind(&self) -> BridgeKind {
        BridgeKind::RawValue
    }

    fn serialize(&self, value: &T) -> Result<Value, BridgeError> {
        serialize_raw(value)
    }

    fn deserialize(&self, value: &Value) -> Result<T, BridgeError> {
        deserialize_raw(value)
    }
}

/// Bridge for types that are both raw-representable and serde types.
///
/// Writes the raw value so enums are never double-encoded. Reads also accept
/// JSON-envelope text left behind by an older encoding of the same type.
pub struct RawValueCodableBridge<T>(PhantomData<fn() -> T>);

impl<T> RawValueCodableBridge<T> {
    pub const fn new() -> Self {
        RawValueCodableBridge(PhantomData)
    }
}

impl<T> Default for RawValueCodableBridge<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: RawRepresentable + Serialize + DeserializeOwned> Bridge for RawValueCodableBridge<T> {
    type Native = T;

    fn kind(&self) -> BridgeKind {
        BridgeKind::RawValueCodable
    }

    fn serialize(&self, value: &T) -> Result<Value, BridgeError> {
        serialize_raw(value)
    }

    fn deserialize(&self, value: &Value) -> Result<T, BridgeError> {
        match deserialize_raw(value) {
            Ok(native) => Ok(native),
            Err(error) => match value.as_str() {
                Some(text) => JsonEnvelope::decode(text).map_err(|_| error),
                None => Err(error),
            },
        }
    }
}

/// A serde type that may be stored as a keyed binary archive.
///
/// The archive records `CLASS_NAME` and refuses to unarchive a blob written
/// for a different class.
pub trait SecureArchivable: Serialize + DeserializeOwned {
    /// Name recorded in, and required of, every archive of this type.
    const CLASS_NAME: &'static str;

    /// Largest archive, in bytes, that will be written or read.
    const ARCHIVE_LIMIT: u64 = 1 << 20;
}

/// Stores a `SecureArchivable` type as an opaque blob.
pub struct ArchiveBridge<T>(PhantomData<fn() -> T>);

impl<T> ArchiveBridge<T> {
    pub const fn new() -> Self {
        ArchiveBridge(PhantomData)
    }
}

impl<T> Default for ArchiveBridge<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: SecureArchivable> ArchiveBridge<T> {
    fn options() -> impl Options {
        bincode::DefaultOptions::new()
            .with_limit(T::ARCHIVE_LIMIT)
            .reject_trailing_bytes()
    }

    fn failure(error: impl std::fmt::Display) -> BridgeError {
        let error = BridgeError::ArchiveFailure {
            message: format!("{}: {}", T::CLASS_NAME, error),
        };
        tracing::warn!(%error, "archive bridge failed");
        error
    }
}

impl<T: SecureArchivable> Bridge for ArchiveBridge<T> {
    type Native = T;

    fn kind(&self) -> BridgeKind {
        BridgeKind::SecureArchive
    }

    fn serialize(&self, value: &T) -> Result<Value, BridgeError> {
        Self::options()
            .serialize(&(T::CLASS_NAME, value))
            .map(Value::Bytes)
            .map_err(Self::failure)
    }

    fn deserialize(&self, value: &Value) -> Result<T, BridgeError> {
        let bytes = value
            .as_bytes()
            .ok_or_else(|| BridgeError::mismatch("archive bytes", value))?;

        let (class_name, native): (String, T) =
            Self::options().deserialize(bytes).map_err(Self::failure)?;

        if class_name != T::CLASS_NAME {
            return Err(Self::failure(format!(
                "archive holds class {}",
                class_name
            )));
        }
        Ok(native)
    }
}
