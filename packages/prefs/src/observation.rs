//! Change observation with suppressed propagation.
//!
//! Observers run synchronously on the writing thread, after the store has
//! been updated. While a callback runs, its observer is "in flight" on that
//! thread; `without_propagation` uses this to stop the observer's own
//! corrective writes from notifying it again.
//!
//! Suppression is per observer: the suppressed observers sit in the suite's
//! shared suppressed set while the scope is open, and no write reaches them
//! whatever thread issues it. Every other observer keeps firing, including
//! for writes made inside the scope.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};

use prefs_core_store::Value;
use uuid::Uuid;

/// Unique identifier for an observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(Uuid);

impl ObserverId {
    /// Create a new random ObserverId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ObserverId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Options for a new observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObservationOptions {
    /// Invoke the callback once with the current value when observing starts.
    pub initial: bool,
}

impl ObservationOptions {
    pub const INITIAL: ObservationOptions = ObservationOptions { initial: true };
    pub const NONE: ObservationOptions = ObservationOptions { initial: false };
}

impl Default for ObservationOptions {
    fn default() -> Self {
        Self::INITIAL
    }
}

/// A change delivered to a key observer.
///
/// Values are decoded; an absent or undecodable value is the key's default.
#[derive(Debug, Clone)]
pub struct KeyChange<T> {
    pub key: String,
    pub old_value: T,
    pub new_value: T,
    /// Handle for suppressing this observer, possibly from another thread.
    pub propagation: PropagationHandle,
}

pub(crate) type RawCallback =
    Box<dyn Fn(&str, Option<&Value>, Option<&Value>, &PropagationHandle) + Send + Sync>;

pub(crate) struct ObserverEntry {
    id: ObserverId,
    keys: Vec<String>,
    callback: RawCallback,
    active: AtomicBool,
}

impl ObserverEntry {
    fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    fn watches(&self, key: &str) -> bool {
        self.keys.iter().any(|watched| watched == key)
    }
}

thread_local! {
    static IN_FLIGHT: RefCell<Vec<PropagationHandle>> = const { RefCell::new(Vec::new()) };
}

/// The observers of one suite.
#[derive(Default)]
pub(crate) struct ObserverRegistry {
    observers: RwLock<Vec<Arc<ObserverEntry>>>,
    suppressed: Mutex<HashMap<ObserverId, usize>>,
}

impl ObserverRegistry {
    pub(crate) fn register(
        self: &Arc<Self>,
        keys: Vec<String>,
        callback: RawCallback,
    ) -> (Observation, Arc<ObserverEntry>) {
        let entry = Arc::new(ObserverEntry {
            id: ObserverId::new(),
            keys,
            callback,
            active: AtomicBool::new(true),
        });
        tracing::trace!(observer = %entry.id, keys = ?entry.keys, "observer registered");

        self.observers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::clone(&entry));

        let observation = Observation {
            id: entry.id,
            registry: Arc::downgrade(self),
            entry: Arc::downgrade(&entry),
        };
        (observation, entry)
    }

    /// Deliver a change of `key` to every interested observer.
    pub(crate) fn notify(self: &Arc<Self>, key: &str, old: Option<&Value>, new: Option<&Value>) {
        // Snapshot so callbacks can register, invalidate or write freely.
        let targets: Vec<Arc<ObserverEntry>> = self
            .observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|entry| entry.watches(key))
            .cloned()
            .collect();

        for entry in targets {
            if self.is_suppressed(entry.id) {
                tracing::trace!(key, observer = %entry.id, "observer suppressed");
                continue;
            }
            self.deliver(&entry, key, old, new);
        }
    }

    pub(crate) fn deliver(
        self: &Arc<Self>,
        entry: &ObserverEntry,
        key: &str,
        old: Option<&Value>,
        new: Option<&Value>,
    ) {
        if !entry.is_active() {
            return;
        }

        let handle = PropagationHandle {
            observer: entry.id,
            registry: Arc::downgrade(self),
        };
        let _in_flight = InFlight::push(handle.clone());
        tracing::trace!(key, observer = %entry.id, "delivering change");
        (entry.callback)(key, old, new, &handle);
    }

    fn is_suppressed(&self, id: ObserverId) -> bool {
        self.suppressed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&id)
    }

    fn remove(&self, id: ObserverId) {
        let mut observers = self.observers.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(position) = observers.iter().position(|entry| entry.id == id) {
            let entry = observers.remove(position);
            entry.active.store(false, Ordering::Release);
            tracing::trace!(observer = %id, "observer removed");
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.observers.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Marks an observer as in flight on this thread until dropped.
struct InFlight;

impl InFlight {
    fn push(handle: PropagationHandle) -> Self {
        IN_FLIGHT.with(|stack| stack.borrow_mut().push(handle));
        InFlight
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        IN_FLIGHT.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// Keeps an observer in its registry's suppressed set until dropped.
struct Suppression {
    observer: ObserverId,
    registry: Arc<ObserverRegistry>,
}

impl Drop for Suppression {
    fn drop(&mut self) {
        let mut suppressed = self
            .registry
            .suppressed
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(depth) = suppressed.get_mut(&self.observer) {
            *depth -= 1;
            if *depth == 0 {
                suppressed.remove(&self.observer);
            }
        }
    }
}

/// Identifies one observer whose notification is being delivered.
///
/// The handle is `Send`: a callback can hand it to another thread, which
/// can then write without re-triggering the observer.
#[derive(Clone)]
pub struct PropagationHandle {
    observer: ObserverId,
    registry: Weak<ObserverRegistry>,
}

impl PropagationHandle {
    pub fn observer(&self) -> ObserverId {
        self.observer
    }

    /// Run `f` without notifying this observer of any write.
    pub fn without_propagation<R>(&self, f: impl FnOnce() -> R) -> R {
        let _suppression = self.suppress();
        f()
    }

    fn suppress(&self) -> Option<Suppression> {
        let registry = self.registry.upgrade()?;
        *registry
            .suppressed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(self.observer)
            .or_insert(0) += 1;
        Some(Suppression {
            observer: self.observer,
            registry,
        })
    }
}

impl fmt::Debug for PropagationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropagationHandle")
            .field("observer", &self.observer)
            .finish()
    }
}

/// Run `f` without re-triggering the observers whose callbacks are running
/// on this thread.
///
/// Other observers still fire for writes made inside `f`. Outside a
/// callback nothing is suppressed.
///
/// ```rust
/// use prefs::{Key, ObservationOptions, Suite};
///
/// let suite = Suite::in_memory();
/// let level = Key::new("level", 0i64, &suite);
///
/// let clamp = level.clone();
/// let _observation = level.observe(ObservationOptions::NONE, move |change| {
///     if change.new_value > 10 {
///         prefs::without_propagation(|| clamp.set(10));
///     }
/// });
///
/// level.set(42);
/// assert_eq!(level.get(), 10);
/// ```
pub fn without_propagation<R>(f: impl FnOnce() -> R) -> R {
    let in_flight: Vec<PropagationHandle> = IN_FLIGHT.with(|stack| stack.borrow().clone());
    let _suppressions: Vec<Suppression> =
        in_flight.iter().filter_map(PropagationHandle::suppress).collect();
    f()
}

/// A live observation. Dropping it stops delivery.
#[must_use = "dropping an Observation stops it immediately"]
pub struct Observation {
    id: ObserverId,
    registry: Weak<ObserverRegistry>,
    entry: Weak<ObserverEntry>,
}

impl Observation {
    pub fn id(&self) -> ObserverId {
        self.id
    }

    /// Stop delivering changes.
    pub fn invalidate(&self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
    }

    pub fn is_active(&self) -> bool {
        self.entry.upgrade().is_some_and(|entry| entry.is_active())
    }
}

impl Drop for Observation {
    fn drop(&mut self) {
        self.invalidate();
    }
}

impl fmt::Debug for Observation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observation")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counter() -> (Arc<AtomicUsize>, RawCallback) {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let callback: RawCallback = Box::new(move |_, _, _, _| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        (count, callback)
    }

    #[test]
    fn notifies_only_watched_keys() {
        let registry = Arc::new(ObserverRegistry::default());
        let (count, callback) = counter();
        let _observation = registry.register(vec!["a".to_string()], callback).0;

        registry.notify("a", None, Some(&Value::Integer(1)));
        registry.notify("b", None, Some(&Value::Integer(1)));

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn invalidate_and_drop_stop_delivery() {
        let registry = Arc::new(ObserverRegistry::default());
        let (count, callback) = counter();
        let (observation, _) = registry.register(vec!["a".to_string()], callback);

        assert!(observation.is_active());
        observation.invalidate();
        assert!(!observation.is_active());
        registry.notify("a", None, None);
        assert_eq!(count.load(Ordering::SeqCst), 0);

        let (count, callback) = counter();
        let (observation, _) = registry.register(vec!["a".to_string()], callback);
        drop(observation);
        registry.notify("a", None, None);
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn scope_outside_a_callback_suppresses_nothing() {
        let registry = Arc::new(ObserverRegistry::default());
        let (count, callback) = counter();
        let _observation = registry.register(vec!["a".to_string()], callback).0;

        without_propagation(|| registry.notify("a", None, None));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn suppression_skips_only_its_observer() {
        let registry = Arc::new(ObserverRegistry::default());
        let (first_count, first) = counter();
        let (second_count, second) = counter();
        let (_first, entry) = registry.register(vec!["a".to_string()], first);
        let _second = registry.register(vec!["a".to_string()], second).0;
        let handle = PropagationHandle {
            observer: entry.id,
            registry: Arc::downgrade(&registry),
        };

        handle.without_propagation(|| registry.notify("a", None, None));

        assert_eq!(first_count.load(Ordering::SeqCst), 0);
        assert_eq!(second_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn suppression_scopes_nest() {
        let registry = Arc::new(ObserverRegistry::default());
        let (_count, callback) = counter();
        let (_observation, entry) = registry.register(vec!["a".to_string()], callback);
        let handle = PropagationHandle {
            observer: entry.id,
            registry: Arc::downgrade(&registry),
        };

        handle.without_propagation(|| {
            handle.without_propagation(|| assert!(registry.is_suppressed(entry.id)));
            assert!(registry.is_suppressed(entry.id));
        });
        assert!(!registry.is_suppressed(entry.id));
    }

    #[test]
    fn in_flight_stack_is_unwound() {
        let registry = Arc::new(ObserverRegistry::default());
        let depth = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&depth);
        let _observation = registry
            .register(
                vec!["a".to_string()],
                Box::new(move |_, _, _, _| {
                    seen.store(IN_FLIGHT.with(|stack| stack.borrow().len()), Ordering::SeqCst);
                }),
            )
            .0;

        registry.notify("a", None, None);
        assert_eq!(depth.load(Ordering::SeqCst), 1);
        assert_eq!(IN_FLIGHT.with(|stack| stack.borrow().len()), 0);
    }

    #[test]
    fn handle_outliving_registry_is_harmless() {
        let registry = Arc::new(ObserverRegistry::default());
        let handle = PropagationHandle {
            observer: ObserverId::new(),
            registry: Arc::downgrade(&registry),
        };
        drop(registry);

        assert_eq!(handle.without_propagation(|| 5), 5);
    }
}
