//! Building stores from high-level options.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::emitter::EventEmitter;
use crate::error::{Result, StoreError};
use crate::persistence::{self, BrowserHistory, PersistenceAdapter};
use crate::store::FieldStore;

/// How [`create_field_store`] should assemble a store.
#[derive(Default)]
pub enum StoreOptions {
    /// Persist nothing, private emitter.
    #[default]
    Default,
    /// Explicit collaborators; missing ones fall back to the defaults.
    Config {
        persistence: Option<Arc<dyn PersistenceAdapter>>,
        emitter: Option<EventEmitter>,
    },
    /// Persist in the query string of `history`.
    PersistInUrl {
        history: Option<Arc<dyn BrowserHistory>>,
    },
}

impl fmt::Debug for StoreOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreOptions::Default => f.write_str("Default"),
            StoreOptions::Config {
                persistence,
                emitter,
            } => f
                .debug_struct("Config")
                .field("persistence", &persistence.is_some())
                .field("emitter", emitter)
                .finish(),
            StoreOptions::PersistInUrl { history } => f
                .debug_struct("PersistInUrl")
                .field("history", &history.is_some())
                .finish(),
        }
    }
}

/// Create a store from `options`.
///
/// URL persistence needs a history to write to and fails with
/// [`StoreError::MissingEnvironment`] without one.
pub fn create_field_store(options: StoreOptions) -> Result<FieldStore> {
    debug!(?options, "creating field store");
    let store = match options {
        StoreOptions::Default => FieldStore::default(),
        StoreOptions::Config {
            persistence,
            emitter,
        } => {
            let mut builder = FieldStore::builder();
            if let Some(persistence) = persistence {
                builder = builder.persistence(persistence);
            }
            if let Some(emitter) = emitter {
                builder = builder.emitter(emitter);
            }
            builder.build()
        }
        StoreOptions::PersistInUrl { history } => {
            let history = history.ok_or(StoreError::MissingEnvironment)?;
            FieldStore::builder()
                .persistence(persistence::url(history))
                .build()
        }
    };
    Ok(store)
}
