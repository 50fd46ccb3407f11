//! Typed keys.

use std::fmt;
use std::sync::Arc;

use prefs_core_store::Value;
use prefs_serde_store::Serializable;

use crate::migration;
use crate::observation::{KeyChange, Observation, ObservationOptions};
use crate::Suite;

/// A named, typed entry of a suite with a default value.
///
/// ```rust
/// use prefs::{Key, Suite};
///
/// let suite = Suite::in_memory();
/// let tags = Key::new("tags", vec!["a".to_string(), "b".to_string()], &suite);
///
/// tags.update(|tags| tags.push("c".to_string()));
/// assert_eq!(tags.get(), ["a", "b", "c"]);
///
/// suite.remove_all();
/// assert_eq!(tags.get(), ["a", "b"]);
/// ```
#[derive(Clone)]
pub struct Key<T> {
    name: String,
    default_value: T,
    suite: Suite,
}

impl<T: Serializable> Key<T> {
    /// Declare a key.
    ///
    /// Unless the default is nil or the suite disables it, the encoded
    /// default is registered with the store so raw readers see it too.
    pub fn new(name: impl Into<String>, default_value: T, suite: &Suite) -> Self {
        let name = name.into();

        if suite.config().register_defaults && !default_value.is_nil() {
            match default_value.to_storable() {
                Ok(Value::Null) => {}
                Ok(stored) => suite.register_default(&name, stored),
                Err(error) => {
                    tracing::warn!(key = %name, %error, "default value cannot be registered");
                }
            }
        }

        Key {
            name,
            default_value,
            suite: suite.clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn default_value(&self) -> &T {
        &self.default_value
    }

    pub fn suite(&self) -> &Suite {
        &self.suite
    }

    pub fn set(&self, value: T) {
        self.suite.set_value(&self.name, &value);
    }

    /// Remove the stored value so the key reads its default again.
    pub fn reset(&self) {
        self.suite.set_raw(&self.name, None);
    }

    /// Rewrite a value stored by an older JSON text encoding in the current
    /// representation. Returns whether the stored value was rewritten.
    pub fn migrate(&self) -> bool {
        migration::migrate::<T>(&self.suite, &self.name)
    }
}

impl<T: Serializable + Clone> Key<T> {
    /// The stored value, or the default when absent or undecodable.
    pub fn get(&self) -> T {
        self.suite
            .get_value(&self.name)
            .unwrap_or_else(|| self.default_value.clone())
    }

    /// Read, modify and write back.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        let mut value = self.get();
        f(&mut value);
        self.set(value);
    }
}

impl<T> Key<T>
where
    T: Serializable + Clone + Send + Sync,
{
    /// Call `callback` with decoded values whenever this key changes.
    pub fn observe<F>(&self, options: ObservationOptions, callback: F) -> Observation
    where
        F: Fn(KeyChange<T>) + Send + Sync + 'static,
    {
        let default_value = self.default_value.clone();
        let decode = move |value: Option<&Value>| {
            value
                .and_then(|value| T::from_storable(value).ok())
                .unwrap_or_else(|| default_value.clone())
        };

        self.suite.observe_raw(
            vec![self.name.clone()],
            options,
            Some(self.name.clone()),
            Box::new(move |key, old, new, propagation| {
                callback(KeyChange {
                    key: key.to_string(),
                    old_value: decode(old),
                    new_value: decode(new),
                    propagation: propagation.clone(),
                })
            }),
        )
    }
}

impl<U: Serializable> Key<Option<U>> {
    /// Declare an optional key whose default is `None`.
    pub fn optional(name: impl Into<String>, suite: &Suite) -> Self {
        Key::new(name, None, suite)
    }
}

impl<T: fmt::Debug> fmt::Debug for Key<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Key")
            .field("name", &self.name)
            .field("default_value", &self.default_value)
            .field("suite", &self.suite.name())
            .finish()
    }
}

/// A key of any value type.
pub trait AnyKey {
    fn name(&self) -> &str;

    fn suite(&self) -> &Suite;

    fn reset(&self);
}

impl<T: Serializable> AnyKey for Key<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn suite(&self) -> &Suite {
        &self.suite
    }

    fn reset(&self) {
        Key::reset(self)
    }
}

/// Reset several keys, possibly of different types.
pub fn reset(keys: &[&dyn AnyKey]) {
    for key in keys {
        key.reset();
    }
}

/// A read-only value computed from two keys on every access.
pub struct DeriveKey<V, A, B> {
    first: Key<A>,
    second: Key<B>,
    derive: Arc<dyn Fn(A, B) -> V + Send + Sync>,
}

impl<V, A, B> DeriveKey<V, A, B>
where
    A: Serializable + Clone,
    B: Serializable + Clone,
{
    pub fn new(
        first: &Key<A>,
        second: &Key<B>,
        derive: impl Fn(A, B) -> V + Send + Sync + 'static,
    ) -> Self {
        DeriveKey {
            first: first.clone(),
            second: second.clone(),
            derive: Arc::new(derive),
        }
    }

    pub fn get(&self) -> V {
        (self.derive)(self.first.get(), self.second.get())
    }
}

impl<V, A: Clone, B: Clone> Clone for DeriveKey<V, A, B> {
    fn clone(&self) -> Self {
        DeriveKey {
            first: self.first.clone(),
            second: self.second.clone(),
            derive: Arc::clone(&self.derive),
        }
    }
}
