mod entry;
mod persist;
mod queue;
mod store;

pub use entry::QueueEntry;
pub use persist::{DebouncedPersister, DEFAULT_DEBOUNCE_MS};
pub use queue::{queue_storage_key, OperationQueue};
pub use store::{MemoryStore, PersistentStore};
