//! Deciding when a committed state should submit the form.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::collection::FieldsCollection;
use crate::emitter::Subscription;
use crate::store::{FieldOperation, FieldStore, FieldStoreState};

/// Key under which submissions wait for hydration to settle.
pub const DEFAULT_READY_KEY: &str = "search-form";

/// What a submit handler wants done after it ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubmitOutcome {
    /// Write the submitted values to persistence.
    #[default]
    Persist,
    /// Leave persistence untouched.
    Skip,
}

/// Called with the committed collection when the form submits.
pub type SubmitHandler = Arc<dyn Fn(&FieldsCollection) -> SubmitOutcome + Send + Sync>;

/// Which commits trigger a submit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SubmitPolicy {
    /// Submit after every commit, not just the forced ones.
    pub submit_on_change: bool,
}

impl SubmitPolicy {
    pub fn new(submit_on_change: bool) -> Self {
        Self { submit_on_change }
    }

    /// `reset` and `flush` always submit; `set` submits when a touched
    /// field is submittable.
    pub fn should_submit(&self, state: &FieldStoreState) -> bool {
        if self.submit_on_change {
            return true;
        }
        match state.operation {
            Some(FieldOperation::Reset | FieldOperation::Flush) => true,
            Some(FieldOperation::Set) => state.touched.iter().any(|name| {
                state
                    .collection
                    .get(name)
                    .is_some_and(|field| field.submittable)
            }),
            _ => false,
        }
    }
}

/// Runs the submit handler against a store and persists the result.
#[derive(Clone)]
pub struct FormSubmitter {
    store: FieldStore,
    policy: SubmitPolicy,
    ready_key: String,
    handler: Option<SubmitHandler>,
}

impl FormSubmitter {
    pub fn new(store: FieldStore, policy: SubmitPolicy) -> Self {
        Self {
            store,
            policy,
            ready_key: DEFAULT_READY_KEY.to_string(),
            handler: None,
        }
    }

    /// Handler called on every submit. Without one, submits only persist.
    pub fn on_submit(
        mut self,
        handler: impl Fn(&FieldsCollection) -> SubmitOutcome + Send + Sync + 'static,
    ) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    pub fn ready_key(mut self, key: impl Into<String>) -> Self {
        self.ready_key = key.into();
        self
    }

    pub fn policy(&self) -> SubmitPolicy {
        self.policy
    }

    /// Submit once hydration settles. Repeated dispatches while hydrating
    /// collapse into one.
    pub fn dispatch(&self, persist: bool) {
        let store = self.store.clone();
        let handler = self.handler.clone();
        self.store.when_ready(self.ready_key.clone(), move || {
            let collection = store.collection();
            let outcome = handler
                .as_ref()
                .map_or(SubmitOutcome::Persist, |handler| handler(&collection));
            debug!(?outcome, persist, fields = collection.len(), "form submitted");
            if persist && outcome == SubmitOutcome::Persist {
                store.persist();
            }
        });
    }

    /// Dispatch whenever a commit satisfies the policy.
    pub fn attach(&self) -> Subscription {
        let submitter = self.clone();
        self.store.on_state_change(move |state| {
            if submitter.policy.should_submit(state) {
                submitter.dispatch(true);
            }
        })
    }
}

impl fmt::Debug for FormSubmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormSubmitter")
            .field("policy", &self.policy)
            .field("ready_key", &self.ready_key)
            .field("handler", &self.handler.is_some())
            .finish()
    }
}
