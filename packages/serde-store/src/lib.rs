//! Bridge layer for prefs stores
//!
//! This layer converts native Rust values to and from the `Value`
//! primitives a `RawStore` can hold. It adds:
//! - `Bridge` / `Serializable`: the conversion protocol and the per-type bridge choice
//! - The bridge catalog: native passthrough, JSON envelope, raw value,
//!   keyed archive, collections and the generic struct codec
//! - `Reflect` and `type_layout`: compile-time field layout for plain structs
//! - `AnySerializable`: a closed union for keys whose value shape varies
//! - Value <-> JSON conversions
//!
//! Bridges never panic on bad data. A value that cannot be decoded is an
//! error the caller turns into a default; a collection element or struct
//! field that cannot be decoded is dropped and the rest survives.
//!
//! # Example
//!
//! ```rust
//! use prefs_serde_store::{reflect_struct, Serializable, Value};
//!
//! reflect_struct! {
//!     #[derive(Debug, Default, PartialEq)]
//!     pub struct Account {
//!         pub name: String,
//!         pub logins: Vec<i64>,
//!     }
//! }
//!
//! let account = Account { name: "alice".into(), logins: vec![1, 2] };
//! let stored: Value = account.to_storable().unwrap();
//! assert_eq!(Account::from_storable(&stored).unwrap(), account);
//! ```

mod any;
mod bridge;
mod catalog;
mod codec;
mod collection;
mod convert;
mod error;
mod layout;
mod macros;
mod native;
mod object;

pub use any::{AnyBridge, AnySerializable, LiteralValue};
pub use bridge::{Bridge, BridgeKind, Capabilities, Serializable};
pub use catalog::{
    ArchiveBridge, CodableBridge, RawRepresentable, RawValueBridge, RawValueCodableBridge,
    SecureArchivable,
};
pub use codec::JsonEnvelope;
pub use collection::{
    ArrayBridge, CollectionBridge, CollectionSerializable, DictionaryBridge,
    DictionarySerializable, OptionalBridge, SetAlgebraBridge, SetAlgebraSerializable, SetBridge,
};
pub use convert::{json_to_value, parse_json_text};
pub use error::BridgeError;
pub use layout::{type_layout, FieldDescriptor, Reflect, TypeHandle, TypeKind, TypeLayout};
pub use native::{Blob, NativeBridge};
pub use object::{deserialize_struct, serialize_struct, ObjectBridge};

// Re-export core types for convenience
pub use prefs_core_store::{DateTime, RawStore, Utc, Value};
