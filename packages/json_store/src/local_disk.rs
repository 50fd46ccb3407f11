//! On-disk store.
//!
//! A suite persisted as a single JSON document mapping keys to `Value`s.
//! Only user entries are written; registered defaults live in memory.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use prefs_core_store::{Error, RawStore, Value};

use crate::InMemoryStore;

/// A store that writes through to a JSON file on every mutation.
///
/// Writes are atomic: the document is written to a temporary file in the
/// same directory and renamed over the previous version.
///
/// # Example
///
/// ```rust,no_run
/// use prefs_json_store::LocalDiskStore;
/// use prefs_core_store::{RawStore, Value};
///
/// let store = LocalDiskStore::open("/tmp/prefs/standard.json")?;
/// store.set_raw("launches", Some(Value::Integer(1)));
/// # Ok::<(), prefs_core_store::Error>(())
/// ```
pub struct LocalDiskStore {
    path: PathBuf,
    memory: InMemoryStore,
    write_lock: Mutex<()>,
}

impl LocalDiskStore {
    /// Open the suite at `path`, loading its entries if the file exists.
    ///
    /// The parent directory must already exist.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, Error> {
        let path = path.into();
        let parent = parent_dir(&path);

        if !fs::metadata(parent)?.is_dir() {
            return Err(Error::NotADirectory {
                path: parent.to_path_buf(),
            });
        }

        let entries = if path.exists() {
            tracing::debug!(path = %path.display(), "loading suite");
            load_entries(&path)?
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path,
            memory: InMemoryStore::with_entries(entries),
            write_lock: Mutex::new(()),
        })
    }

    /// Location of the suite document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> Result<(), Error> {
        let entries = self.memory.entries();
        let bytes = serde_json::to_vec_pretty(&entries).map_err(|e| Error::encode(e.to_string()))?;

        let mut file = tempfile::NamedTempFile::new_in(parent_dir(&self.path))?;
        file.write_all(&bytes)?;
        file.persist(&self.path).map_err(|e| Error::Io(e.error))?;

        tracing::trace!(path = %self.path.display(), entries = entries.len(), "suite written");
        Ok(())
    }

    fn mutate(&self, apply: impl FnOnce(&InMemoryStore)) {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        apply(&self.memory);
        if let Err(error) = self.persist() {
            tracing::warn!(path = %self.path.display(), %error, "failed to persist suite");
        }
    }
}

/// Read a suite document. Entries that do not decode are dropped so one bad
/// value (e.g. a non-finite float written as `null`) cannot hide the rest.
fn load_entries(path: &Path) -> Result<BTreeMap<String, Value>, Error> {
    let text = fs::read_to_string(path)?;
    let document: BTreeMap<String, serde_json::Value> = serde_json::from_str(&text)
        .map_err(|e| Error::decode(format!("{}: {}", path.display(), e)))?;

    Ok(document
        .into_iter()
        .filter_map(|(key, json)| match serde_json::from_value::<Value>(json) {
            Ok(value) => Some((key, value)),
            Err(error) => {
                tracing::warn!(
                    path = %path.display(),
                    key = %key,
                    %error,
                    "dropping unreadable entry"
                );
                None
            }
        })
        .collect())
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

impl RawStore for LocalDiskStore {
    fn get_raw(&self, key: &str) -> Option<Value> {
        self.memory.get_raw(key)
    }

    fn set_raw(&self, key: &str, value: Option<Value>) {
        self.mutate(|memory| memory.set_raw(key, value));
    }

    fn register_default(&self, key: &str, value: Value) {
        self.memory.register_default(key, value);
    }

    fn remove_all(&self) {
        self.mutate(|memory| memory.remove_all());
    }

    fn keys(&self) -> Vec<String> {
        self.memory.keys()
    }

    fn contains(&self, key: &str) -> bool {
        self.memory.contains(key)
    }

    fn synchronize(&self) -> Result<(), Error> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.persist()
    }
}
