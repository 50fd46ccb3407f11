//! Strongly-typed, observable preferences.
//!
//! A `Suite` wraps a `RawStore`; a `Key<T>` binds a name and a default
//! value to a suite and reads and writes native values through the bridge
//! layer of `prefs_serde_store`. Reads never fail: a missing or
//! undecodable value reads as the key's default.
//!
//! # Example
//!
//! ```rust
//! use prefs::{reflect_struct, Key, Suite};
//!
//! reflect_struct! {
//!     #[derive(Debug, Clone, Default, PartialEq)]
//!     pub struct TimeZone {
//!         pub id: String,
//!         pub name: String,
//!     }
//! }
//!
//! let suite = Suite::in_memory();
//! let count = Key::new("count", 0i64, &suite);
//! let zone = Key::new("zone", TimeZone::default(), &suite);
//!
//! assert_eq!(count.get(), 0);
//!
//! zone.set(TimeZone { id: "0".into(), name: "Asia/Taipei".into() });
//! assert_eq!(zone.get().name, "Asia/Taipei");
//! ```

mod config;
mod key;
mod migration;
mod observation;
mod suite;

pub use config::SuiteConfig;
pub use key::{reset, AnyKey, DeriveKey, Key};
pub use observation::{
    without_propagation, KeyChange, Observation, ObservationOptions, ObserverId,
    PropagationHandle,
};
pub use suite::Suite;

pub use prefs_core_store::{DateTime, Error, RawStore, Utc, Value};
pub use prefs_json_store::{InMemoryStore, LocalDiskStore};
pub use prefs_serde_store::{
    any, reflect_struct, serializable, AnySerializable, Blob, Bridge, BridgeError, BridgeKind,
    RawRepresentable, SecureArchivable, Serializable,
};
