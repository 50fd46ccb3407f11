//! Core trait: RawStore.

use std::sync::Arc;

use crate::{Error, Value};

/// A persistent dictionary keyed by string, holding only `Value` primitives.
///
/// Implementations provide their own thread-safety: every method takes
/// `&self`, and callers may share a store across threads without extra
/// locking around individual calls.
///
/// A store has two layers:
/// - user entries, written with `set_raw` and cleared by `remove_all`
/// - registered defaults, visible through `get_raw` whenever no user entry
///   exists, and never removed by `remove_all`
///
/// # Object Safety
///
/// This trait is object-safe: you can use `Box<dyn RawStore>`.
pub trait RawStore: Send + Sync {
    /// Read the effective value for a key.
    ///
    /// Returns the user entry if present, otherwise the registered default,
    /// otherwise `None`.
    fn get_raw(&self, key: &str) -> Option<Value>;

    /// Write a user entry. `None` and `Some(Value::Null)` remove it.
    fn set_raw(&self, key: &str, value: Option<Value>);

    /// Register an advisory default for a key.
    ///
    /// Later registrations for the same key replace earlier ones.
    fn register_default(&self, key: &str, value: Value);

    /// Remove every user entry. Registered defaults are left untouched.
    fn remove_all(&self);

    /// Keys that currently hold a user entry.
    fn keys(&self) -> Vec<String>;

    /// Check whether a key has an effective value.
    fn contains(&self, key: &str) -> bool {
        self.get_raw(key).is_some()
    }

    /// Flush pending state to durable storage.
    ///
    /// Volatile stores have nothing to flush.
    fn synchronize(&self) -> Result<(), Error> {
        Ok(())
    }
}

// Blanket implementations for references and smart pointers

impl<T: RawStore + ?Sized> RawStore for &T {
    fn get_raw(&self, key: &str) -> Option<Value> {
        (**self).get_raw(key)
    }

    fn set_raw(&self, key: &str, value: Option<Value>) {
        (**self).set_raw(key, value)
    }

    fn register_default(&self, key: &str, value: Value) {
        (**self).register_default(key, value)
    }

    fn remove_all(&self) {
        (**self).remove_all()
    }

    fn keys(&self) -> Vec<String> {
        (**self).keys()
    }

    fn contains(&self, key: &str) -> bool {
        (**self).contains(key)
    }

    fn synchronize(&self) -> Result<(), Error> {
        (**self).synchronize()
    }
}

impl<T: RawStore + ?Sized> RawStore for Box<T> {
    fn get_raw(&self, key: &str) -> Option<Value> {
        self.as_ref().get_raw(key)
    }

    fn set_raw(&self, key: &str, value: Option<Value>) {
        self.as_ref().set_raw(key, value)
    }

    fn register_default(&self, key: &str, value: Value) {
        self.as_ref().register_default(key, value)
    }

    fn remove_all(&self) {
        self.as_ref().remove_all()
    }

    fn keys(&self) -> Vec<String> {
        self.as_ref().keys()
    }

    fn contains(&self, key: &str) -> bool {
        self.as_ref().contains(key)
    }

    fn synchronize(&self) -> Result<(), Error> {
        self.as_ref().synchronize()
    }
}

impl<T: RawStore + ?Sized> RawStore for Arc<T> {
    fn get_raw(&self, key: &str) -> Option<Value> {
        self.as_ref().get_raw(key)
    }

    fn set_raw(&self, key: &str, value: Option<Value>) {
        self.as_ref().set_raw(key, value)
    }

    fn register_default(&self, key: &str, value: Value) {
        self.as_ref().register_default(key, value)
    }

    fn remove_all(&self) {
        self.as_ref().remove_all()
    }

    fn keys(&self) -> Vec<String> {
        self.as_ref().keys()
    }

    fn contains(&self, key: &str) -> bool {
        self.as_ref().contains(key)
    }

    fn synchronize(&self) -> Result<(), Error> {
        self.as_ref().synchronize()
    }
}
