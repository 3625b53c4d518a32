//! searchform configuration management using Figment
//!
//! This crate turns configuration files and environment variables into
//! ready-to-use field stores and installs the tracing subscriber.
//!
//! # Features
//!
//! - **Multiple file formats**: TOML, YAML, JSON detected by extension
//! - **Environment integration**: `SEARCHFORM_` prefixed variables, nested with `__`
//! - **Proper precedence**: defaults → config file → environment
//! - **Store wiring**: persistence backend and submit policy straight from settings
//! - **Logging**: `tracing-subscriber` fmt output filtered by settings or `RUST_LOG`
//!
//! # Quick Start
//!
//! ```no_run
//! use searchform_config::{init_tracing, SettingsLoader};
//!
//! let settings = SettingsLoader::new().file("searchform.toml").load()?;
//! init_tracing(&settings.logging)?;
//!
//! let store = settings.build_store(None)?;
//! let _submit = settings.submitter(store).attach();
//! # Ok::<(), searchform_config::ConfigError>(())
//! ```
//!
//! ## Example TOML Configuration
//!
//! ```toml
//! [store]
//! persistence = "url"
//! submit_on_change = false
//! ready_key = "search-form"
//!
//! [logging]
//! filter = "searchform=info"
//! ```

pub mod error;
pub mod logging;
pub mod provider;
pub mod settings;

pub use error::{ConfigError, ConfigResult};
pub use logging::{env_filter, init_tracing};
pub use provider::{ConfigFormat, SettingsLoader, ENV_PREFIX};
pub use settings::{LoggingSettings, PersistenceKind, StoreSection, StoreSettings};

/// Load settings from defaults and environment only.
pub fn load_settings() -> ConfigResult<StoreSettings> {
    SettingsLoader::new().load()
}
