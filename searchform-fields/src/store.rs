//! FieldStore: the state machine behind a search form.
//!
//! The store owns every registered field. Each mutation runs to completion
//! under an internal lock, builds a fresh [`FieldsCollection`] and a
//! [`FieldStoreState`] describing what changed, then notifies subscribers
//! with the lock released, so listeners may call back into the store.
//!
//! Serializers also run with the lock released, so an unserialize may read
//! the store; its result is dropped if the field changed in the meantime.
//!
//! The only asynchronous step is a deferred unserialize. Registration and
//! `rehydrate` spawn those on the Tokio runtime; `sync` awaits them inline.
//! Outstanding hydrations are counted by a [`TaskMonitor`] so `when_ready`
//! callbacks observe a fully settled set of values.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use futures::future::{join_all, BoxFuture};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::collection::FieldsCollection;
use crate::emitter::{EventEmitter, Subscription, Topic};
use crate::error::{HydrationError, Result, StoreError};
use crate::field::{Field, FieldOptions, RegisteredField};
use crate::monitor::{ReadyTasks, TaskMonitor};
use crate::persistence::{self, PersistenceAdapter};
use crate::serializer::{HydrationResult, Serializer, SharedSerializer, Unserialized};
use crate::types::{FieldName, FieldValue, PrimitiveMap, PrimitiveValue};

/// The operation that produced a committed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldOperation {
    Register,
    Unregister,
    Update,
    Set,
    Flush,
    Sync,
    Reset,
    Rehydrate,
    Hydrate,
}

/// The atomic unit of published state.
#[derive(Debug, Clone, Default)]
pub struct FieldStoreState {
    pub collection: FieldsCollection,
    /// `None` for the initial state and for hydration bookkeeping commits.
    pub operation: Option<FieldOperation>,
    /// Fields whose value changed as a direct result of `operation`.
    pub touched: Vec<FieldName>,
    pub is_hydrating: bool,
}

/// What a settled hydration falls back to when the lookup fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OnRejection {
    /// Registration and `rehydrate` lookups
    Default,
    /// `sync` lookups keep whatever the field held before
    Previous,
}

/// A field's parse inputs, copied out so the serializer runs unlocked.
struct ParseTarget {
    name: FieldName,
    token: u64,
    serializer: SharedSerializer,
    default_value: FieldValue,
}

/// A deferred unserialize waiting to be driven.
struct PendingHydration {
    name: FieldName,
    token: u64,
    future: BoxFuture<'static, HydrationResult>,
}

enum Parsed {
    Ready(FieldValue),
    Deferred(BoxFuture<'static, HydrationResult>),
}

/// Resolve a persisted primitive against a field's serializer.
///
/// A missing primitive or a malformed one yields the default.
fn parse(
    primitive: Option<&PrimitiveValue>,
    default_value: &FieldValue,
    serializer: &dyn Serializer,
) -> Parsed {
    let Some(primitive) = primitive else {
        return Parsed::Ready(default_value.clone());
    };
    match serializer.unserialize(primitive) {
        Unserialized::Ready(Some(value)) => Parsed::Ready(value),
        Unserialized::Ready(None) => Parsed::Ready(default_value.clone()),
        Unserialized::Deferred(future) => Parsed::Deferred(future),
    }
}

/// Value a field takes once its deferred unserialize settles.
///
/// An absent result means the default; a failure falls back per `on_rejection`.
fn settled_value(
    field: &RegisteredField,
    result: HydrationResult,
    on_rejection: OnRejection,
) -> FieldValue {
    match result {
        Ok(Some(value)) if !value.is_null() => value,
        Ok(_) => field.default_value.clone(),
        Err(err) => {
            warn!(field = %field.name, %err, ?on_rejection, "hydration failed");
            match on_rejection {
                OnRejection::Default => field.default_value.clone(),
                OnRejection::Previous => field.value.clone(),
            }
        }
    }
}

struct Registry {
    fields: IndexMap<FieldName, RegisteredField>,
    whitelist: Vec<FieldName>,
    state: FieldStoreState,
    next_hydration: u64,
}

impl Registry {
    fn new() -> Self {
        Self {
            fields: IndexMap::new(),
            whitelist: Vec::new(),
            state: FieldStoreState::default(),
            next_hydration: 0,
        }
    }

    fn next_token(&mut self) -> u64 {
        self.next_hydration += 1;
        self.next_hydration
    }

    /// Insert a freshly registered field under a token of its own, so
    /// parses taken against an earlier field of the same name never apply.
    fn insert(&mut self, mut field: RegisteredField) {
        field.hydration = self.next_token();
        self.fields.insert(field.name.clone(), field);
    }

    /// Mark a field hydrating and hand out a fresh token.
    ///
    /// A field holds at most one monitor capture, so an earlier in-flight
    /// hydration is superseded rather than counted twice.
    fn begin_hydration(&mut self, name: &str, monitor: &TaskMonitor) -> Option<u64> {
        let token = self.next_token();
        let field = self.fields.get_mut(name)?;
        if !field.is_hydrating {
            monitor.capture();
            field.is_hydrating = true;
        }
        field.hydration = token;
        Some(token)
    }

    /// Drop an in-flight hydration without applying it. Its token no
    /// longer matches, so the late resolution is ignored.
    fn supersede_hydration(&mut self, name: &str, monitor: &TaskMonitor) -> Option<ReadyTasks> {
        if !self.fields.get(name)?.is_hydrating {
            return None;
        }
        let token = self.next_token();
        let field = self.fields.get_mut(name)?;
        trace!(field = %name, "superseding in-flight hydration");
        field.hydration = token;
        field.is_hydrating = false;
        Some(monitor.release_deferred())
    }

    /// Apply a settled hydration. Returns whether the value changed, or
    /// `None` when the hydration was superseded or the field is gone.
    fn finish_hydration(
        &mut self,
        settled: SettledHydration,
        monitor: &TaskMonitor,
        ready: &mut ReadyTasks,
    ) -> Option<bool> {
        let SettledHydration {
            name,
            token,
            result,
            on_rejection,
        } = settled;
        let field = self.fields.get_mut(&name)?;
        if !field.is_hydrating || field.hydration != token {
            trace!(field = %name, "ignoring superseded hydration");
            return None;
        }
        let value = settled_value(field, result, on_rejection);
        let dirty = !field.value.same_value(&value);
        if dirty {
            field.override_value(value);
        }
        field.is_hydrating = false;
        ready.extend(monitor.release_deferred());
        Some(dirty)
    }

    fn commit(
        &mut self,
        operation: Option<FieldOperation>,
        touched: Vec<FieldName>,
        monitor: &TaskMonitor,
    ) -> FieldStoreState {
        self.state = FieldStoreState {
            collection: FieldsCollection::from_map(&self.fields),
            operation,
            touched,
            is_hydrating: monitor.is_hydrating(),
        };
        trace!(
            operation = ?self.state.operation,
            touched = self.state.touched.len(),
            fields = self.fields.len(),
            is_hydrating = self.state.is_hydrating,
            "commit"
        );
        self.state.clone()
    }

    fn names(&self) -> Vec<FieldName> {
        self.fields.keys().cloned().collect()
    }

    fn ensure_unregistered(&self, name: &str) -> Result<()> {
        if self.fields.contains_key(name) {
            return Err(StoreError::DuplicateField {
                name: name.to_string(),
                registered: self.names(),
            });
        }
        Ok(())
    }

    fn parse_targets(&self) -> Vec<ParseTarget> {
        self.fields
            .values()
            .map(|field| ParseTarget {
                name: field.name.clone(),
                token: field.hydration,
                serializer: Arc::clone(&field.serializer),
                default_value: field.default_value.clone(),
            })
            .collect()
    }

    /// Apply parses taken with the lock released. Synchronous results are
    /// applied and recorded as touched, deferred ones are marked hydrating
    /// and queued. A field that went away or started another hydration in
    /// the meantime is skipped.
    fn apply_parsed(
        &mut self,
        parsed: Vec<(ParseTarget, Parsed)>,
        monitor: &TaskMonitor,
    ) -> Reparse {
        let mut reparse = Reparse::default();
        for (target, parsed) in parsed {
            let ParseTarget { name, token, .. } = target;
            match self.fields.get(&name) {
                Some(field) if field.hydration == token => {}
                _ => {
                    trace!(field = %name, "field changed while parsing, skipping");
                    continue;
                }
            }
            match parsed {
                Parsed::Ready(value) => {
                    if let Some(ready) = self.supersede_hydration(&name, monitor) {
                        reparse.superseded = true;
                        reparse.ready.extend(ready);
                    }
                    let Some(field) = self.fields.get_mut(&name) else {
                        continue;
                    };
                    if !field.value.same_value(&value) {
                        trace!(field = %name, "value changed on reparse");
                        field.override_value(value);
                        reparse.touched.push(name);
                    }
                }
                Parsed::Deferred(future) => {
                    if let Some(token) = self.begin_hydration(&name, monitor) {
                        reparse.pending.push(PendingHydration {
                            name,
                            token,
                            future,
                        });
                    }
                }
            }
        }
        reparse
    }
}

/// Outcome of applying a reparse to the registry.
#[derive(Default)]
struct Reparse {
    touched: Vec<FieldName>,
    pending: Vec<PendingHydration>,
    ready: ReadyTasks,
    /// An in-flight hydration was dropped, so `is_hydrating` changed.
    superseded: bool,
}

impl Reparse {
    /// Whether the registry changed in a way subscribers must see.
    fn is_empty(&self) -> bool {
        self.touched.is_empty() && self.pending.is_empty() && !self.superseded
    }
}

/// A deferred unserialize that has run to completion.
struct SettledHydration {
    name: FieldName,
    token: u64,
    result: HydrationResult,
    on_rejection: OnRejection,
}

struct StoreInner {
    persistence: Arc<dyn PersistenceAdapter>,
    emitter: EventEmitter,
    monitor: TaskMonitor,
    /// Persisted values as read when the store was created.
    initial: PrimitiveMap,
    registry: Mutex<Registry>,
    listeners: Topic<()>,
}

impl StoreInner {
    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: &FieldStoreState) {
        self.listeners.emit(&());
        self.emitter.change().emit(state);
    }
}

/// Handle to a field store. Clones share the same store.
#[derive(Clone)]
pub struct FieldStore {
    inner: Arc<StoreInner>,
}

/// Builder for [`FieldStore`]. Created by [`FieldStore::builder`].
#[derive(Default)]
pub struct FieldStoreBuilder {
    persistence: Option<Arc<dyn PersistenceAdapter>>,
    emitter: Option<EventEmitter>,
}

impl FieldStoreBuilder {
    /// Where values are persisted. Defaults to persisting nothing.
    pub fn persistence(mut self, persistence: Arc<dyn PersistenceAdapter>) -> Self {
        self.persistence = Some(persistence);
        self
    }

    /// Share an event emitter with other observers.
    pub fn emitter(mut self, emitter: EventEmitter) -> Self {
        self.emitter = Some(emitter);
        self
    }

    pub fn build(self) -> FieldStore {
        FieldStore::new(
            self.persistence.unwrap_or_else(persistence::empty),
            self.emitter.unwrap_or_default(),
        )
    }
}

impl FieldStore {
    /// Create a store. The persisted values are read once, here; fields
    /// registered later hydrate from this snapshot.
    pub fn new(persistence: Arc<dyn PersistenceAdapter>, emitter: EventEmitter) -> Self {
        let initial = persistence.read();
        debug!(persisted = initial.len(), "field store created");
        Self {
            inner: Arc::new(StoreInner {
                persistence,
                emitter,
                monitor: TaskMonitor::new(),
                initial,
                registry: Mutex::new(Registry::new()),
                listeners: Topic::new(),
            }),
        }
    }

    pub fn builder() -> FieldStoreBuilder {
        FieldStoreBuilder::default()
    }

    // --- Reads ---

    /// The last committed state.
    pub fn state(&self) -> FieldStoreState {
        self.inner.lock().state.clone()
    }

    /// The last committed collection.
    pub fn collection(&self) -> FieldsCollection {
        self.inner.lock().state.collection.clone()
    }

    pub fn exists(&self, name: &str) -> bool {
        self.inner.lock().fields.contains_key(name)
    }

    /// A field as of the last commit.
    pub fn get(&self, name: &str) -> Option<RegisteredField> {
        self.inner.lock().state.collection.get(name).cloned()
    }

    /// A reader for one field that always looks at the latest commit.
    pub fn listen(&self, name: impl Into<FieldName>) -> impl Fn() -> Option<RegisteredField> {
        let store = self.clone();
        let name = name.into();
        move || store.get(&name)
    }

    pub fn is_hydrating(&self) -> bool {
        self.inner.monitor.is_hydrating()
    }

    /// Run `task` once no hydration is outstanding; see [`TaskMonitor::when_ready`].
    pub fn when_ready(&self, key: impl Into<String>, task: impl FnOnce() + Send + 'static) {
        self.inner.monitor.when_ready(key, task);
    }

    // --- Subscriptions ---

    /// Notified after every commit.
    pub fn subscribe(&self, listener: impl Fn() + Send + Sync + 'static) -> Subscription {
        self.inner.listeners.on(move |_| listener())
    }

    /// Notified with the new state after every commit.
    pub fn on_state_change(
        &self,
        listener: impl Fn(&FieldStoreState) + Send + Sync + 'static,
    ) -> Subscription {
        self.inner.emitter.change().on(listener)
    }

    /// Notified with the written collection after every `persist`.
    pub fn on_field_persisted(
        &self,
        listener: impl Fn(&FieldsCollection) + Send + Sync + 'static,
    ) -> Subscription {
        self.inner.emitter.persist().on(listener)
    }

    /// Re-sync whenever the persistence adapter reports an external change
    /// (e.g. back/forward navigation), then call `listener` with the
    /// resulting state. The sync runs on the current Tokio runtime.
    pub fn on_persistence_change(
        &self,
        listener: impl Fn(&FieldStoreState) + Send + Sync + 'static,
    ) -> Subscription {
        let weak = Arc::downgrade(&self.inner);
        let listener = Arc::new(listener);
        self.inner.persistence.subscribe(Arc::new(move || {
            let Some(store) = FieldStore::upgrade(&weak) else {
                return;
            };
            let listener = Arc::clone(&listener);
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    handle.spawn(async move {
                        store.sync().await;
                        (*listener)(&store.state());
                    });
                }
                Err(_) => warn!("persistence changed outside a Tokio runtime, sync skipped"),
            }
        }))
    }

    // --- Registration ---

    /// Register a field and hydrate it from the persisted snapshot.
    ///
    /// Fails when a field with the same name is already registered.
    pub fn register(&self, field: Field) -> Result<()> {
        self.inner.lock().ensure_unregistered(&field.name)?;
        let parsed = parse(
            self.inner.initial.get(&field.name),
            &field.value,
            field.serializer.as_ref(),
        );

        let mut pending = None;
        let state = {
            let mut registry = self.inner.lock();
            // the serializer ran unlocked; someone may have taken the name since
            registry.ensure_unregistered(&field.name)?;

            let name = field.name.clone();
            match parsed {
                Parsed::Ready(value) => {
                    registry.insert(RegisteredField::from_field(field, value, false));
                }
                Parsed::Deferred(future) => {
                    let value = field.value.clone();
                    registry.insert(RegisteredField::from_field(field, value, false));
                    if let Some(token) = registry.begin_hydration(&name, &self.inner.monitor) {
                        pending = Some(PendingHydration {
                            name: name.clone(),
                            token,
                            future,
                        });
                    }
                }
            }
            debug!(field = %name, deferred = pending.is_some(), "field registered");
            registry.whitelist.push(name);
            registry.commit(Some(FieldOperation::Register), Vec::new(), &self.inner.monitor)
        };

        self.inner.publish(&state);
        if let Some(hydration) = pending {
            self.spawn_hydration(hydration);
        }
        Ok(())
    }

    /// Remove a field. Unknown names are ignored.
    pub fn unregister(&self, name: &str) {
        let mut ready = ReadyTasks::default();
        let state = {
            let mut registry = self.inner.lock();
            let Some(field) = registry.fields.shift_remove(name) else {
                return;
            };
            registry.whitelist.retain(|allowed| allowed != name);
            if field.is_hydrating {
                ready.extend(self.inner.monitor.release_deferred());
            }
            debug!(field = %name, "field unregistered");
            registry.commit(Some(FieldOperation::Unregister), Vec::new(), &self.inner.monitor)
        };
        self.inner.publish(&state);
        ready.run();
    }

    /// Merge metadata into a registered field without touching its value.
    ///
    /// Empty options are a no-op; an unknown name is an error.
    pub fn update(&self, name: &str, options: FieldOptions) -> Result<()> {
        if options.is_empty() {
            return Ok(());
        }
        let state = {
            let mut registry = self.inner.lock();
            let field = registry
                .fields
                .get_mut(name)
                .ok_or_else(|| StoreError::FieldNotFound {
                    name: name.to_string(),
                })?;
            field.apply(&options);
            registry.commit(
                Some(FieldOperation::Update),
                vec![name.to_string()],
                &self.inner.monitor,
            )
        };
        self.inner.publish(&state);
        Ok(())
    }

    // --- Values ---

    /// Change a field's value. No-op for unknown fields and identical values.
    pub fn set(&self, name: &str, value: impl Into<FieldValue>) {
        self.apply(name, value.into(), FieldOperation::Set);
    }

    /// Same as [`FieldStore::set`], tagged `flush` so submitters can force
    /// a submit regardless of the field's `submittable` flag.
    pub fn flush(&self, name: &str, value: impl Into<FieldValue>) {
        self.apply(name, value.into(), FieldOperation::Flush);
    }

    /// Restore every modified field to its default.
    pub fn reset(&self) {
        let state = {
            let mut registry = self.inner.lock();
            let mut touched = Vec::new();
            for field in registry.fields.values_mut() {
                if field.is_modified() {
                    let default_value = field.default_value.clone();
                    field.override_value(default_value);
                    touched.push(field.name.clone());
                }
            }
            if touched.is_empty() {
                return;
            }
            registry.commit(Some(FieldOperation::Reset), touched, &self.inner.monitor)
        };
        self.inner.publish(&state);
    }

    /// Drop every field and return to the empty initial state.
    pub fn clean(&self) {
        let mut ready = ReadyTasks::default();
        let state = {
            let mut registry = self.inner.lock();
            for field in registry.fields.values().filter(|field| field.is_hydrating) {
                trace!(field = %field.name, "abandoning hydration");
                ready.extend(self.inner.monitor.release_deferred());
            }
            registry.fields.clear();
            registry.whitelist.clear();
            registry.commit(None, Vec::new(), &self.inner.monitor)
        };
        debug!("field store cleaned");
        self.inner.publish(&state);
        ready.run();
    }

    // --- Persistence ---

    /// Write the committed values, limited to fields registered on this
    /// store, and emit `persist`.
    pub fn persist(&self) {
        let (collection, whitelist) = {
            let registry = self.inner.lock();
            (registry.state.collection.clone(), registry.whitelist.clone())
        };
        let values = collection.to_primitives();
        debug!(values = values.len(), whitelist = whitelist.len(), "persisting fields");
        self.inner.persistence.write(&values, Some(&whitelist));
        self.inner.emitter.persist().emit(&collection);
    }

    /// Re-read the persistence adapter and re-parse every field.
    ///
    /// Commits once right away (no operation) when anything changed or is
    /// deferred, then, after deferred values settle, commits `sync` with
    /// every changed field.
    pub async fn sync(&self) {
        let values = self.inner.persistence.read();
        let Some((state, reparse)) = self.begin_sync(&values) else {
            return;
        };
        self.inner.publish(&state);
        let Reparse {
            touched,
            pending,
            ready,
            ..
        } = reparse;
        ready.run();

        let settled = join_all(pending.into_iter().map(|hydration| async move {
            SettledHydration {
                name: hydration.name,
                token: hydration.token,
                result: hydration.future.await,
                on_rejection: OnRejection::Previous,
            }
        }))
        .await;

        self.finish_sync(touched, settled);
    }

    /// Re-parse every field against `values` supplied by the caller.
    ///
    /// Returns the new collection when a value changed synchronously.
    /// Deferred values land later through `hydrate` commits.
    pub fn rehydrate(&self, values: &PrimitiveMap) -> Option<FieldsCollection> {
        let parsed = self.parse_all(values);
        let (state, reparse) = {
            let mut registry = self.inner.lock();
            let mut reparse = registry.apply_parsed(parsed, &self.inner.monitor);
            let state = if !reparse.touched.is_empty() {
                let touched = std::mem::take(&mut reparse.touched);
                Some(registry.commit(
                    Some(FieldOperation::Rehydrate),
                    touched,
                    &self.inner.monitor,
                ))
            } else if !reparse.is_empty() {
                Some(registry.commit(None, Vec::new(), &self.inner.monitor))
            } else {
                None
            };
            (state, reparse)
        };

        let state = state?;
        self.inner.publish(&state);
        reparse.ready.run();
        for hydration in reparse.pending {
            self.spawn_hydration(hydration);
        }
        state
            .operation
            .is_some()
            .then(|| state.collection.clone())
    }

    // --- Internals ---

    fn upgrade(weak: &Weak<StoreInner>) -> Option<FieldStore> {
        weak.upgrade().map(|inner| FieldStore { inner })
    }

    fn apply(&self, name: &str, value: FieldValue, operation: FieldOperation) {
        let state = {
            let mut registry = self.inner.lock();
            let Some(field) = registry.fields.get_mut(name) else {
                return;
            };
            if field.value.same_value(&value) {
                return;
            }
            field.override_value(value);
            registry.commit(Some(operation), vec![name.to_string()], &self.inner.monitor)
        };
        self.inner.publish(&state);
    }

    /// Run every field's serializer over `values` with the lock released.
    fn parse_all(&self, values: &PrimitiveMap) -> Vec<(ParseTarget, Parsed)> {
        let targets = self.inner.lock().parse_targets();
        targets
            .into_iter()
            .map(|target| {
                let parsed = parse(
                    values.get(&target.name),
                    &target.default_value,
                    target.serializer.as_ref(),
                );
                (target, parsed)
            })
            .collect()
    }

    fn begin_sync(
        &self,
        values: &PrimitiveMap,
    ) -> Option<(FieldStoreState, Reparse)> {
        let parsed = self.parse_all(values);
        let mut registry = self.inner.lock();
        let reparse = registry.apply_parsed(parsed, &self.inner.monitor);
        if reparse.is_empty() {
            return None;
        }
        let state = registry.commit(None, Vec::new(), &self.inner.monitor);
        Some((state, reparse))
    }

    fn finish_sync(&self, mut touched: Vec<FieldName>, settled: Vec<SettledHydration>) {
        let mut ready = ReadyTasks::default();
        let state = {
            let mut registry = self.inner.lock();
            let mut settled_any = false;
            for hydration in settled {
                let name = hydration.name.clone();
                match registry.finish_hydration(hydration, &self.inner.monitor, &mut ready) {
                    Some(true) => {
                        settled_any = true;
                        if !touched.contains(&name) {
                            touched.push(name);
                        }
                    }
                    Some(false) => settled_any = true,
                    None => {}
                }
            }
            if !touched.is_empty() {
                Some(registry.commit(Some(FieldOperation::Sync), touched, &self.inner.monitor))
            } else if settled_any {
                Some(registry.commit(None, Vec::new(), &self.inner.monitor))
            } else {
                None
            }
        };
        if let Some(state) = state {
            self.inner.publish(&state);
        }
        ready.run();
    }

    fn spawn_hydration(&self, hydration: PendingHydration) {
        let weak = Arc::downgrade(&self.inner);
        let PendingHydration {
            name,
            token,
            future,
        } = hydration;

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    let result = future.await;
                    if let Some(store) = FieldStore::upgrade(&weak) {
                        store.settle_hydration(name, token, result);
                    }
                });
            }
            Err(_) => {
                warn!(field = %name, "deferred hydration outside a Tokio runtime, keeping default");
                self.settle_hydration(name, token, Err(HydrationError::Cancelled));
            }
        }
    }

    fn settle_hydration(&self, name: FieldName, token: u64, result: HydrationResult) {
        let mut ready = ReadyTasks::default();
        let settled = SettledHydration {
            name: name.clone(),
            token,
            result,
            on_rejection: OnRejection::Default,
        };
        let state = {
            let mut registry = self.inner.lock();
            let Some(dirty) = registry.finish_hydration(settled, &self.inner.monitor, &mut ready)
            else {
                return;
            };
            if dirty {
                registry.commit(
                    Some(FieldOperation::Hydrate),
                    vec![name],
                    &self.inner.monitor,
                )
            } else {
                registry.commit(None, Vec::new(), &self.inner.monitor)
            }
        };
        self.inner.publish(&state);
        ready.run();
    }
}

impl Default for FieldStore {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl fmt::Debug for FieldStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.inner.lock();
        f.debug_struct("FieldStore")
            .field("fields", &registry.names())
            .field("operation", &registry.state.operation)
            .field("monitor", &self.inner.monitor)
            .finish()
    }
}
