use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use super::{restrict, ChangeCallback, PersistenceAdapter};
use crate::emitter::{Subscription, Topic};
use crate::types::PrimitiveMap;

#[derive(Default)]
struct MemoryState {
    values: PrimitiveMap,
    writes: usize,
}

/// In-process persistence, shareable between stores.
///
/// Writes merge into the held map: whitelisted names are replaced (or
/// removed when absent from the written values) and everything else is
/// kept. [`MemoryPersistence::replace`] simulates an external change.
#[derive(Clone, Default)]
pub struct MemoryPersistence {
    state: Arc<Mutex<MemoryState>>,
    listeners: Topic<()>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with the given values.
    pub fn with_values(values: PrimitiveMap) -> Self {
        let persistence = Self::default();
        persistence.lock().values = values;
        persistence
    }

    /// Current contents.
    pub fn values(&self) -> PrimitiveMap {
        self.lock().values.clone()
    }

    /// Number of writes that changed the contents.
    pub fn writes(&self) -> usize {
        self.lock().writes
    }

    /// Replace the contents from outside and notify subscribers.
    pub fn replace(&self, values: PrimitiveMap) {
        self.lock().values = values;
        self.notify();
    }

    /// Notify subscribers without changing anything.
    pub fn notify(&self) {
        self.listeners.emit(&());
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PersistenceAdapter for MemoryPersistence {
    fn read(&self) -> PrimitiveMap {
        self.values()
    }

    fn write(&self, values: &PrimitiveMap, whitelist: Option<&[String]>) {
        let mut state = self.lock();
        let next = match whitelist {
            None => values.clone(),
            Some(allowed) => {
                let mut next: PrimitiveMap = state
                    .values
                    .iter()
                    .filter(|(name, _)| !allowed.iter().any(|allowed| allowed == *name))
                    .map(|(name, value)| (name.clone(), value.clone()))
                    .collect();
                next.extend(restrict(values, whitelist));
                next
            }
        };
        if next == state.values {
            return;
        }
        debug!(entries = next.len(), "memory persistence updated");
        state.values = next;
        state.writes += 1;
    }

    fn subscribe(&self, callback: ChangeCallback) -> Subscription {
        self.listeners.on(move |_| callback())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PrimitiveValue;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn map(entries: &[(&str, &str)]) -> PrimitiveMap {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), PrimitiveValue::from(*v)))
            .collect()
    }

    #[test]
    fn whitelisted_write_keeps_foreign_entries() {
        let persistence = MemoryPersistence::with_values(map(&[("other", "x"), ("q", "old")]));
        let whitelist = vec!["q".to_string(), "page".to_string()];
        persistence.write(&map(&[("q", "new"), ("intruder", "y")]), Some(&whitelist));

        let values = persistence.values();
        assert_eq!(values["other"], PrimitiveValue::from("x"));
        assert_eq!(values["q"], PrimitiveValue::from("new"));
        assert!(!values.contains_key("intruder"));
        assert_eq!(persistence.writes(), 1);
    }

    #[test]
    fn unchanged_write_is_not_counted() {
        let persistence = MemoryPersistence::with_values(map(&[("q", "a")]));
        persistence.write(&map(&[("q", "a")]), None);
        assert_eq!(persistence.writes(), 0);
    }

    #[test]
    fn replace_notifies_subscribers() {
        let persistence = MemoryPersistence::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let _sub = persistence.subscribe(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        persistence.replace(map(&[("q", "a")]));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(persistence.read().len(), 1);
    }
}
