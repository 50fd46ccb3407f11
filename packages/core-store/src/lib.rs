//! Core prefs store layer
//!
//! This layer defines what a preferences store can hold and how it is
//! accessed, without any knowledge of native application types:
//! - `Value`: The closed set of storable primitives
//! - `RawStore`: A string-keyed dictionary of `Value`s with a registered-defaults layer
//! - `Error`: Failures of stores that persist outside the process
//!
//! Typed access lives in higher layers (`prefs-serde-store` converts
//! native types, `prefs` binds them to keys).
//!
//! # Example
//!
//! ```rust
//! use prefs_core_store::{RawStore, Value};
//!
//! fn read_count(store: &dyn RawStore) -> i64 {
//!     store
//!         .get_raw("count")
//!         .and_then(|value| value.as_i64())
//!         .unwrap_or(0)
//! }
//! ```

mod error;
mod traits;
mod value;

pub use error::Error;
pub use traits::RawStore;
pub use value::Value;

pub use chrono::{DateTime, Utc};
