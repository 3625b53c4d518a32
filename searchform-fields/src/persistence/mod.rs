//! Persistence adapters: where field values live between page loads.
//!
//! The store reads a snapshot at construction, writes on `persist`, and
//! re-syncs when the adapter reports an external change. I/O failures are
//! not part of the contract: a failed read is an empty map and writes are
//! best-effort.

mod empty;
mod history;
mod memory;
mod query_string;

pub use empty::EmptyPersistence;
pub use history::{BrowserHistory, MemoryHistory};
pub use memory::MemoryPersistence;
pub use query_string::UrlPersistence;

use std::sync::Arc;

use crate::emitter::Subscription;
use crate::types::PrimitiveMap;

/// Callback fired when the persisted values change outside the store.
pub type ChangeCallback = Arc<dyn Fn() + Send + Sync>;

/// Storage for primitive field values shared by one or more stores.
pub trait PersistenceAdapter: Send + Sync {
    /// Current persisted values.
    fn read(&self) -> PrimitiveMap;

    /// Write values. With a whitelist, only whitelisted names are written
    /// and entries owned by other stores are left alone.
    fn write(&self, values: &PrimitiveMap, whitelist: Option<&[String]>);

    /// Observe external changes, e.g. back/forward navigation.
    fn subscribe(&self, callback: ChangeCallback) -> Subscription;
}

/// Keep only whitelisted entries.
pub(crate) fn restrict(values: &PrimitiveMap, whitelist: Option<&[String]>) -> PrimitiveMap {
    match whitelist {
        None => values.clone(),
        Some(allowed) => values
            .iter()
            .filter(|(name, _)| allowed.iter().any(|allowed| allowed == *name))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect(),
    }
}

/// Adapter that persists to the query string of `history`.
pub fn url(history: Arc<dyn BrowserHistory>) -> Arc<dyn PersistenceAdapter> {
    Arc::new(UrlPersistence::new(history))
}

/// Adapter that persists nothing.
pub fn empty() -> Arc<dyn PersistenceAdapter> {
    Arc::new(EmptyPersistence)
}
