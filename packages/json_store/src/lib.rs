//! Concrete stores for prefs.
//!
//! - `InMemoryStore`: volatile suite, the default backing for tests and
//!   the process-wide standard suite
//! - `LocalDiskStore`: suite persisted as a JSON document

mod in_memory;
mod local_disk;

pub use in_memory::InMemoryStore;
pub use local_disk::LocalDiskStore;
