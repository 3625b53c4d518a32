use std::sync::{Arc, Mutex, PoisonError};

use super::ChangeCallback;
use crate::emitter::{Subscription, Topic};

/// The slice of a browser's `location`/`history` the URL adapter needs.
pub trait BrowserHistory: Send + Sync {
    /// Path part of the current location, e.g. `/products`.
    fn pathname(&self) -> String;

    /// Query string of the current location without the leading `?`.
    fn search(&self) -> String;

    /// Push a new entry (`pathname[?query]`) onto the history stack.
    fn push_state(&self, url: &str);

    /// Observe back/forward navigation.
    fn on_pop_state(&self, callback: ChangeCallback) -> Subscription;
}

struct HistoryStack {
    entries: Vec<String>,
    index: usize,
}

/// In-process history stack with back/forward navigation.
#[derive(Clone)]
pub struct MemoryHistory {
    stack: Arc<Mutex<HistoryStack>>,
    pop_state: Topic<()>,
}

impl MemoryHistory {
    /// Start at `url` (`/path?query`).
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            stack: Arc::new(Mutex::new(HistoryStack {
                entries: vec![url.into()],
                index: 0,
            })),
            pop_state: Topic::new(),
        }
    }

    /// The current entry.
    pub fn location(&self) -> String {
        let stack = self.lock();
        stack.entries[stack.index].clone()
    }

    /// Number of entries on the stack.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Go back one entry, firing pop-state. Returns false at the start.
    pub fn back(&self) -> bool {
        self.go(-1)
    }

    /// Go forward one entry, firing pop-state. Returns false at the end.
    pub fn forward(&self) -> bool {
        self.go(1)
    }

    fn go(&self, delta: isize) -> bool {
        {
            let mut stack = self.lock();
            let Some(target) = stack.index.checked_add_signed(delta) else {
                return false;
            };
            if target >= stack.entries.len() {
                return false;
            }
            stack.index = target;
        }
        self.pop_state.emit(&());
        true
    }

    fn split(&self) -> (String, String) {
        let location = self.location();
        match location.split_once('?') {
            Some((path, query)) => (path.to_string(), query.to_string()),
            None => (location, String::new()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HistoryStack> {
        self.stack.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemoryHistory {
    fn default() -> Self {
        Self::new("/")
    }
}

impl BrowserHistory for MemoryHistory {
    fn pathname(&self) -> String {
        self.split().0
    }

    fn search(&self) -> String {
        self.split().1
    }

    fn push_state(&self, url: &str) {
        let mut stack = self.lock();
        let keep = stack.index + 1;
        stack.entries.truncate(keep);
        stack.entries.push(url.to_string());
        stack.index = keep;
    }

    fn on_pop_state(&self, callback: ChangeCallback) -> Subscription {
        self.pop_state.on(move |_| callback())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn splits_path_and_query() {
        let history = MemoryHistory::new("/products?q=shoes&page=2");
        assert_eq!(history.pathname(), "/products");
        assert_eq!(history.search(), "q=shoes&page=2");

        let history = MemoryHistory::new("/products");
        assert_eq!(history.search(), "");
    }

    #[test]
    fn push_truncates_forward_entries() {
        let history = MemoryHistory::new("/a");
        history.push_state("/b");
        history.push_state("/c");
        assert!(history.back());
        history.push_state("/d");
        assert_eq!(history.len(), 3);
        assert!(!history.forward());
        assert_eq!(history.location(), "/d");
    }

    #[test]
    fn navigation_fires_pop_state() {
        let history = MemoryHistory::new("/a");
        history.push_state("/b");
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let _sub = history.on_pop_state(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        assert!(history.back());
        assert!(!history.back());
        assert!(history.forward());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(history.location(), "/b");
    }
}
