//! A suite: one raw store plus its observers.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use lazy_static::lazy_static;
use prefs_core_store::{Error, RawStore, Value};
use prefs_json_store::{InMemoryStore, LocalDiskStore};
use prefs_serde_store::Serializable;

use crate::key::AnyKey;
use crate::observation::{Observation, ObservationOptions, ObserverRegistry, RawCallback};
use crate::SuiteConfig;

lazy_static! {
    static ref STANDARD: Suite = Suite::in_memory();
}

struct SuiteInner {
    config: SuiteConfig,
    store: Box<dyn RawStore>,
    observers: Arc<ObserverRegistry>,
}

/// Typed access to a raw store.
///
/// Cloning is cheap; clones share the store and the observers. Every write
/// made through a suite notifies the observers of the written key.
#[derive(Clone)]
pub struct Suite {
    inner: Arc<SuiteInner>,
}

impl Suite {
    pub fn new(store: impl RawStore + 'static) -> Self {
        Self::with_config(store, SuiteConfig::default())
    }

    pub fn with_config(store: impl RawStore + 'static, config: SuiteConfig) -> Self {
        tracing::debug!(suite = %config.name, "suite created");
        Suite {
            inner: Arc::new(SuiteInner {
                config,
                store: Box::new(store),
                observers: Arc::new(ObserverRegistry::default()),
            }),
        }
    }

    /// A fresh volatile suite.
    pub fn in_memory() -> Self {
        Self::new(InMemoryStore::new())
    }

    /// The process-wide default suite.
    pub fn standard() -> Self {
        STANDARD.clone()
    }

    /// A suite persisted as a JSON document at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, Error> {
        let path = path.into();
        let name = path.display().to_string();
        let store = LocalDiskStore::open(path)?;
        Ok(Self::with_config(store, SuiteConfig::named(name)))
    }

    pub fn config(&self) -> &SuiteConfig {
        &self.inner.config
    }

    pub fn name(&self) -> &str {
        &self.inner.config.name
    }

    /// The effective raw value of a key, registered defaults included.
    pub fn get_raw(&self, key: &str) -> Option<Value> {
        self.inner.store.get_raw(key)
    }

    /// Write a raw value and notify the key's observers.
    ///
    /// `None` and `Some(Value::Null)` remove the user entry.
    pub fn set_raw(&self, key: &str, value: Option<Value>) {
        let old = self.inner.store.get_raw(key);
        self.inner.store.set_raw(key, value);
        let new = self.inner.store.get_raw(key);
        self.inner.observers.notify(key, old.as_ref(), new.as_ref());
    }

    pub fn register_default(&self, key: &str, value: Value) {
        self.inner.store.register_default(key, value);
    }

    /// Remove every user entry, one key at a time so each key notifies.
    pub fn remove_all(&self) {
        let keys = self.inner.store.keys();
        tracing::debug!(suite = %self.name(), count = keys.len(), "removing all entries");
        for key in keys {
            self.set_raw(&key, None);
        }
    }

    /// Keys holding a user entry.
    pub fn keys(&self) -> Vec<String> {
        self.inner.store.keys()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.store.contains(key)
    }

    pub fn synchronize(&self) -> Result<(), Error> {
        self.inner.store.synchronize()
    }

    /// Decode the stored value of a key.
    ///
    /// `None` when the key is absent or the stored value does not decode.
    pub fn get_value<T: Serializable>(&self, key: &str) -> Option<T> {
        let stored = self.get_raw(key)?;
        match T::from_storable(&stored) {
            Ok(value) => Some(value),
            Err(error) => {
                tracing::debug!(key, %error, "stored value does not decode, using default");
                None
            }
        }
    }

    /// Encode and store a value. A nil value removes the entry.
    ///
    /// A value that cannot be encoded leaves the store untouched.
    pub fn set_value<T: Serializable>(&self, key: &str, value: &T) {
        if value.is_nil() {
            self.set_raw(key, None);
            return;
        }

        match value.to_storable() {
            Ok(stored) => self.set_raw(key, Some(stored)),
            Err(error) => {
                tracing::warn!(key, %error, "value cannot be stored, write skipped");
            }
        }
    }

    /// Call `callback` whenever any of `keys` changes.
    pub fn observe_keys<F>(
        &self,
        keys: &[&dyn AnyKey],
        options: ObservationOptions,
        callback: F,
    ) -> Observation
    where
        F: Fn() + Send + Sync + 'static,
    {
        let names: Vec<String> = keys.iter().map(|key| key.name().to_string()).collect();
        let first = names.first().cloned();
        self.observe_raw(names, options, first, Box::new(move |_, _, _, _| callback()))
    }

    pub(crate) fn observe_raw(
        &self,
        keys: Vec<String>,
        options: ObservationOptions,
        initial_key: Option<String>,
        callback: RawCallback,
    ) -> Observation {
        let (observation, entry) = self.inner.observers.register(keys, callback);
        if options.initial {
            if let Some(key) = initial_key {
                let current = self.get_raw(&key);
                self.inner
                    .observers
                    .deliver(&entry, &key, current.as_ref(), current.as_ref());
            }
        }
        observation
    }
}

impl Default for Suite {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Debug for Suite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Suite")
            .field("name", &self.inner.config.name)
            .finish_non_exhaustive()
    }
}
