//! Reactive field store for search and filter forms
//!
//! `searchform-fields` keeps the state of a filter form: a set of typed
//! fields whose values round-trip through a persistence backend (usually
//! the URL query string) and whose changes are broadcast to subscribers.
//!
//! # Architecture
//!
//! - **Explicit stores**: a [`FieldStore`] is a cheaply clonable handle; callers
//!   create and pass it around, there is no global instance
//! - **Commit per mutation**: every change publishes a fresh [`FieldsCollection`]
//!   snapshot inside a [`FieldStoreState`] naming the operation and touched fields
//! - **Serializers**: each [`FieldType`] maps to a built-in [`Serializer`]; custom
//!   serializers may resolve asynchronously ("deferred hydration")
//! - **Hydration gate**: the [`TaskMonitor`] holds `when_ready` callbacks until
//!   every deferred hydration has settled
//!
//! ```no_run
//! use searchform_fields::{Field, FieldStore, FieldType};
//!
//! # fn main() -> searchform_fields::Result<()> {
//! let store = FieldStore::default();
//! store.register(Field::new("q", FieldType::String)?.value(""))?;
//! store.set("q", "shoes");
//! assert_eq!(store.state().touched, vec!["q"]);
//! # Ok(())
//! # }
//! ```

pub mod active;
pub mod collection;
pub mod create;
pub mod emitter;
pub mod error;
pub mod field;
pub mod monitor;
pub mod persistence;
pub mod serializer;
pub mod store;
pub mod submit;
pub mod types;

pub use active::{active_filters, clear_all, watch_active_filters, ActiveFilterTag};
pub use collection::FieldsCollection;
pub use create::{create_field_store, StoreOptions};
pub use emitter::{EventEmitter, Subscription, SubscriptionId, Topic};
pub use error::{HydrationError, Result, StoreError};
pub use field::{Field, FieldOptions, Humanized, HumanizedEntry, Humanizer, RegisteredField};
pub use monitor::{ReadyTasks, TaskMonitor};
pub use persistence::{
    BrowserHistory, ChangeCallback, EmptyPersistence, MemoryHistory, MemoryPersistence,
    PersistenceAdapter, UrlPersistence,
};
pub use serializer::{
    ArraySerializer, BooleanSerializer, DateSerializer, HydrationResult, NumberSerializer,
    ScalarSerializer, Serializer, SharedSerializer, StringSerializer, Unserialized,
};
pub use store::{FieldOperation, FieldStore, FieldStoreBuilder, FieldStoreState};
pub use submit::{FormSubmitter, SubmitHandler, SubmitOutcome, SubmitPolicy, DEFAULT_READY_KEY};
pub use types::{FieldName, FieldType, FieldValue, PrimitiveMap, PrimitiveValue, ValueMap};
