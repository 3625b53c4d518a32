//! Typed settings and what they build.

use std::fmt;
use std::sync::Arc;

use searchform_fields::{
    create_field_store, BrowserHistory, FieldStore, FormSubmitter, MemoryPersistence,
    StoreOptions, SubmitPolicy, DEFAULT_READY_KEY,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConfigError, ConfigResult};

/// Where a configured store persists its values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersistenceKind {
    /// Persist nothing
    #[default]
    Empty,
    /// Keep values in process memory
    Memory,
    /// Write values to the URL query string
    Url,
}

impl fmt::Display for PersistenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PersistenceKind::Empty => "empty",
            PersistenceKind::Memory => "memory",
            PersistenceKind::Url => "url",
        };
        f.write_str(name)
    }
}

/// The `[store]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    pub persistence: PersistenceKind,
    /// Submit after every commit instead of only on submittable changes
    pub submit_on_change: bool,
    /// Key under which submissions wait for hydration
    pub ready_key: String,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            persistence: PersistenceKind::default(),
            submit_on_change: false,
            ready_key: DEFAULT_READY_KEY.to_string(),
        }
    }
}

/// The `[logging]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `EnvFilter` directives; `RUST_LOG` takes precedence
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: "searchform=info".to_string(),
        }
    }
}

/// Complete searchform settings
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub store: StoreSection,
    pub logging: LoggingSettings,
}

impl StoreSettings {
    /// Reject values the types alone cannot rule out
    pub fn validate(&self) -> ConfigResult<()> {
        if self.store.ready_key.trim().is_empty() {
            return Err(ConfigError::invalid_value(
                "store.ready_key",
                "must not be empty",
            ));
        }
        if self.logging.filter.trim().is_empty() {
            return Err(ConfigError::invalid_value(
                "logging.filter",
                "must not be empty",
            ));
        }
        Ok(())
    }

    pub fn submit_policy(&self) -> SubmitPolicy {
        SubmitPolicy::new(self.store.submit_on_change)
    }

    /// Build a store with the configured persistence.
    ///
    /// `history` is only consulted for URL persistence, which fails
    /// without one.
    pub fn build_store(&self, history: Option<Arc<dyn BrowserHistory>>) -> ConfigResult<FieldStore> {
        debug!(persistence = %self.store.persistence, "building configured store");
        let options = match self.store.persistence {
            PersistenceKind::Empty => StoreOptions::Default,
            PersistenceKind::Memory => StoreOptions::Config {
                persistence: Some(Arc::new(MemoryPersistence::new())),
                emitter: None,
            },
            PersistenceKind::Url => StoreOptions::PersistInUrl { history },
        };
        create_field_store(options).map_err(ConfigError::from)
    }

    /// A submitter for `store` following the configured policy and key
    pub fn submitter(&self, store: FieldStore) -> FormSubmitter {
        FormSubmitter::new(store, self.submit_policy()).ready_key(self.store.ready_key.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use searchform_fields::{MemoryHistory, StoreError};

    #[test]
    fn defaults_are_valid() {
        let settings = StoreSettings::default();
        settings.validate().unwrap();
        assert_eq!(settings.store.persistence, PersistenceKind::Empty);
        assert_eq!(settings.store.ready_key, "search-form");
        assert!(!settings.submit_policy().submit_on_change);
    }

    #[test]
    fn blank_ready_key_is_rejected() {
        let mut settings = StoreSettings::default();
        settings.store.ready_key = "  ".into();
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::InvalidValue { key, .. }) if key == "store.ready_key"
        ));
    }

    #[test]
    fn url_store_requires_history() {
        let mut settings = StoreSettings::default();
        settings.store.persistence = PersistenceKind::Url;

        let err = settings.build_store(None).unwrap_err();
        assert!(matches!(err, ConfigError::Store(StoreError::MissingEnvironment)));

        let history: Arc<dyn BrowserHistory> = Arc::new(MemoryHistory::new("/search"));
        settings.build_store(Some(history)).unwrap();
    }

    #[test]
    fn persistence_kind_uses_lowercase_names() {
        let kind: PersistenceKind = serde_json::from_str("\"memory\"").unwrap();
        assert_eq!(kind, PersistenceKind::Memory);
        assert_eq!(PersistenceKind::Url.to_string(), "url");
    }
}
