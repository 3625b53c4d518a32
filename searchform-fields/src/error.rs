//! Error types for the field store

use thiserror::Error;

/// Result type for field store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Configuration errors raised by the field store.
///
/// These indicate programming mistakes rather than runtime conditions, so
/// every variant carries enough context to find the offending call site.
/// Malformed persisted values and failed hydrations are never reported
/// through this type; they fall back to defaults.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A field with this name is already registered
    #[error(
        "duplicate field registration: \"{name}\" is already registered \
         (registered fields: {count}: [{list}])",
        count = .registered.len(),
        list = .registered.join(", ")
    )]
    DuplicateField {
        name: String,
        registered: Vec<String>,
    },

    /// Metadata update targeted a field that is not registered
    #[error("field \"{name}\" does not exist")]
    FieldNotFound { name: String },

    /// No built-in serializer exists for this field type
    #[error("cannot auto-resolve serializer for type \"{type_name}\"")]
    UnsupportedType { type_name: String },

    /// A type tag outside the closed set of field types
    #[error("unknown field type tag \"{tag}\"")]
    UnknownFieldType { tag: String },

    /// URL persistence requested without a browser-like history
    #[error("URL persistence requires a browser history environment")]
    MissingEnvironment,
}

/// Failure of a deferred unserialize.
///
/// The store swallows these and keeps the field's previous value.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum HydrationError {
    /// The lookup behind the deferred value failed
    #[error("hydration failed: {message}")]
    Failed { message: String },

    /// The lookup was abandoned before producing a value
    #[error("hydration cancelled")]
    Cancelled,
}

impl HydrationError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }
}
