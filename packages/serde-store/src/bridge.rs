//! The bridge protocol.
//!
//! A `Bridge` converts one native type to and from a store `Value`. Every
//! `Serializable` type names its bridge statically, so the same read and
//! write path works for primitives, collections and user types alike.

use prefs_core_store::Value;

use crate::BridgeError;

/// A stateless two-way conversion between a native type and a `Value`.
///
/// For every `x` the bridge can represent,
/// `deserialize(&serialize(&x)?)? == x`, except where the store cannot hold
/// the value exactly (e.g. a non-finite float).
pub trait Bridge: Send + Sync {
    /// The in-memory type this bridge converts.
    type Native;

    /// Which entry of the catalog this bridge is.
    fn kind(&self) -> BridgeKind;

    /// Convert a native value into its storable form.
    fn serialize(&self, value: &Self::Native) -> Result<Value, BridgeError>;

    /// Convert a storable value back into the native type.
    fn deserialize(&self, value: &Value) -> Result<Self::Native, BridgeError>;
}

/// A type that can be written to and read from a store.
///
/// Types the store holds directly set `IS_NATIVELY_SUPPORTED` and implement
/// `to_native`/`from_native`; `to_storable` and `from_storable` try that
/// fast path before falling back to the bridge.
///
/// Implementations are normally generated: primitives and the standard
/// collections are covered by this crate, `reflect_struct!` covers plain
/// structs and `serializable!` covers codable, raw-value, archivable and
/// custom-bridged types.
pub trait Serializable: Sized + 'static {
    /// The bridge used when the fast path does not apply.
    type Bridge: Bridge<Native = Self>;

    /// Whether the store can hold this type without a bridge.
    const IS_NATIVELY_SUPPORTED: bool = false;

    /// Obtain the bridge for this type.
    fn bridge() -> Self::Bridge;

    /// Direct conversion for natively supported types.
    fn to_native(&self) -> Option<Value> {
        None
    }

    /// Direct conversion back for natively supported types.
    fn from_native(_value: &Value) -> Option<Self> {
        None
    }

    /// Whether this value is the semantic nil, e.g. `None`.
    ///
    /// Writing a nil value removes the key instead of storing it.
    fn is_nil(&self) -> bool {
        false
    }

    fn to_storable(&self) -> Result<Value, BridgeError> {
        if Self::IS_NATIVELY_SUPPORTED {
            if let Some(value) = self.to_native() {
                return Ok(value);
            }
        }
        Self::bridge().serialize(self)
    }

    fn from_storable(value: &Value) -> Result<Self, BridgeError> {
        if Self::IS_NATIVELY_SUPPORTED {
            if let Some(native) = Self::from_native(value) {
                return Ok(native);
            }
        }
        Self::bridge().deserialize(value)
    }
}

/// Every bridge in the catalog.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BridgeKind {
    /// Passthrough for types the store holds directly.
    Native,
    /// A bridge supplied by the type itself.
    Custom,
    /// Raw value, for types that are both raw-representable and codable.
    RawValueCodable,
    /// JSON envelope.
    Codable,
    /// Raw value.
    RawValue,
    /// Keyed binary archive.
    SecureArchive,
    /// Generic struct codec.
    Object,
    Optional,
    Array,
    Dictionary,
    Set,
    SetAlgebra,
    Collection,
    /// Open-ended `AnySerializable` values.
    Any,
}

/// The capabilities a type declares, used to pick its bridge.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub natively_supported: bool,
    pub custom_bridge: bool,
    pub raw_representable: bool,
    pub codable: bool,
    pub secure_archivable: bool,
    pub plain_struct: bool,
}

impl Capabilities {
    pub const NONE: Capabilities = Capabilities {
        natively_supported: false,
        custom_bridge: false,
        raw_representable: false,
        codable: false,
        secure_archivable: false,
        plain_struct: false,
    };

    pub const fn with_natively_supported(self) -> Self {
        Capabilities {
            natively_supported: true,
            ..self
        }
    }

    pub const fn with_custom_bridge(self) -> Self {
        Capabilities {
            custom_bridge: true,
            ..self
        }
    }

    pub const fn with_raw_representable(self) -> Self {
        Capabilities {
            raw_representable: true,
            ..self
        }
    }

    pub const fn with_codable(self) -> Self {
        Capabilities {
            codable: true,
            ..self
        }
    }

    pub const fn with_secure_archivable(self) -> Self {
        Capabilities {
            secure_archivable: true,
            ..self
        }
    }

    pub const fn with_plain_struct(self) -> Self {
        Capabilities {
            plain_struct: true,
            ..self
        }
    }
}

impl BridgeKind {
    /// Select the most specific bridge for a set of capabilities.
    ///
    /// Precedence, first match wins:
    /// 1. natively supported
    /// 2. custom bridge
    /// 3. raw-representable and codable (raw value, never double-encoded)
    /// 4. codable (JSON envelope)
    /// 5. raw-representable
    /// 6. secure archivable
    /// 7. plain struct (generic struct codec)
    ///
    /// Returns `None` when the type declares nothing storable.
    pub const fn resolve(caps: Capabilities) -> Option<BridgeKind> {
        if caps.natively_supported {
            Some(BridgeKind::Native)
        } else if caps.custom_bridge {
            Some(BridgeKind::Custom)
        } else if caps.raw_representable && caps.codable {
            Some(BridgeKind::RawValueCodable)
        } else if caps.codable {
            Some(BridgeKind::Codable)
        } else if caps.raw_representable {
            Some(BridgeKind::RawValue)
        } else if caps.secure_archivable {
            Some(BridgeKind::SecureArchive)
        } else if caps.plain_struct {
            Some(BridgeKind::Object)
        } else {
            None
        }
    }
}
