//! In-memory store.
//!
//! Volatile suite holding user entries and registered defaults in two maps.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use prefs_core_store::{RawStore, Value};

#[derive(Default)]
struct Domains {
    entries: BTreeMap<String, Value>,
    defaults: BTreeMap<String, Value>,
}

/// An in-memory store using `Value` as the storage format.
///
/// # Example
///
/// ```rust
/// use prefs_json_store::InMemoryStore;
/// use prefs_core_store::{RawStore, Value};
///
/// let store = InMemoryStore::new();
///
/// store.set_raw("name", Some(Value::String("Alice".to_string())));
///
/// assert_eq!(store.get_raw("name"), Some(Value::String("Alice".to_string())));
/// ```
#[derive(Default)]
pub struct InMemoryStore {
    domains: RwLock<Domains>,
}

impl InMemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with initial user entries.
    pub fn with_entries(entries: BTreeMap<String, Value>) -> Self {
        let store = Self::new();
        for (key, value) in entries {
            store.set_raw(&key, Some(value));
        }
        store
    }

    /// Snapshot of the user entries.
    pub fn entries(&self) -> BTreeMap<String, Value> {
        self.read_domains().entries.clone()
    }

    fn read_domains(&self) -> std::sync::RwLockReadGuard<'_, Domains> {
        self.domains.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_domains(&self) -> std::sync::RwLockWriteGuard<'_, Domains> {
        self.domains.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RawStore for InMemoryStore {
    fn get_raw(&self, key: &str) -> Option<Value> {
        let domains = self.read_domains();
        domains
            .entries
            .get(key)
            .or_else(|| domains.defaults.get(key))
            .cloned()
    }

    fn set_raw(&self, key: &str, value: Option<Value>) {
        let mut domains = self.write_domains();
        match value {
            Some(value) if !value.is_null() => {
                domains.entries.insert(key.to_string(), value);
            }
            _ => {
                domains.entries.remove(key);
            }
        }
    }

    fn register_default(&self, key: &str, value: Value) {
        self.write_domains()
            .defaults
            .insert(key.to_string(), value);
    }

    fn remove_all(&self) {
        self.write_domains().entries.clear();
    }

    fn keys(&self) -> Vec<String> {
        self.read_domains().entries.keys().cloned().collect()
    }

    fn contains(&self, key: &str) -> bool {
        let domains = self.read_domains();
        domains.entries.contains_key(key) || domains.defaults.contains_key(key)
    }
}
