//! Minimal typed publish/subscribe hub.
//!
//! Each event is a [`Topic`] carrying one payload type. Handlers are
//! called in subscription order with a snapshot of the handler set, so a
//! handler may subscribe or unsubscribe while an event is being emitted.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use indexmap::IndexMap;

use crate::collection::FieldsCollection;
use crate::store::FieldStoreState;

/// Identifier of a handler within a topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// RAII guard that unsubscribes when dropped.
///
/// Call [`Subscription::detach`] to keep the handler registered for the
/// lifetime of its source instead.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: Option<SubscriptionId>,
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    /// Wrap an arbitrary unsubscribe action.
    pub fn new(cancel: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            id: None,
            cancel: Some(Box::new(cancel)),
        }
    }

    /// A subscription with nothing to release.
    pub fn noop() -> Self {
        Self {
            id: None,
            cancel: None,
        }
    }

    fn for_topic(id: SubscriptionId, cancel: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            id: Some(id),
            cancel: Some(Box::new(cancel)),
        }
    }

    /// The topic handler id, when this subscription came from a [`Topic`].
    pub fn id(&self) -> Option<SubscriptionId> {
        self.id
    }

    /// Unsubscribe now.
    pub fn unsubscribe(mut self) {
        self.release();
    }

    /// Keep the handler registered; the guard no longer owns it.
    pub fn detach(mut self) {
        self.cancel = None;
    }

    fn release(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

type Handler<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct TopicInner<T> {
    handlers: Mutex<IndexMap<u64, Handler<T>>>,
    next_id: AtomicU64,
}

impl<T> TopicInner<T> {
    fn remove(&self, id: u64) {
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .shift_remove(&id);
    }
}

/// A single event channel.
pub struct Topic<T> {
    inner: Arc<TopicInner<T>>,
}

impl<T: 'static> Topic<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(TopicInner {
                handlers: Mutex::new(IndexMap::new()),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    /// Register a handler.
    pub fn on(&self, handler: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, Arc::new(handler));

        let weak: Weak<TopicInner<T>> = Arc::downgrade(&self.inner);
        Subscription::for_topic(SubscriptionId(id), move || {
            if let Some(inner) = weak.upgrade() {
                inner.remove(id);
            }
        })
    }

    /// Remove a handler by id. Unknown ids are ignored.
    pub fn off(&self, id: SubscriptionId) {
        self.inner.remove(id.0);
    }

    /// Call every handler registered at the moment of the call.
    pub fn emit(&self, payload: &T) {
        let snapshot: Vec<Handler<T>> = {
            let handlers = self
                .inner
                .handlers
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if handlers.is_empty() {
                return;
            }
            handlers.values().cloned().collect()
        };
        for handler in snapshot {
            handler(payload);
        }
    }

    pub fn len(&self) -> usize {
        self.inner
            .handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: 'static> Default for Topic<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Topic<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// The store's events: `change` after every commit, `persist` after every
/// write to the persistence adapter.
///
/// Clones share handlers, so one emitter can be injected into several
/// stores to observe them together.
#[derive(Clone, Default)]
pub struct EventEmitter {
    change: Topic<FieldStoreState>,
    persist: Topic<FieldsCollection>,
}

impl EventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn change(&self) -> &Topic<FieldStoreState> {
        &self.change
    }

    pub fn persist(&self) -> &Topic<FieldsCollection> {
        &self.persist
    }
}

impl fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventEmitter")
            .field("change", &self.change.len())
            .field("persist", &self.persist.len())
            .finish()
    }
}
