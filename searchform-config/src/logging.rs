//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

use crate::error::{ConfigError, ConfigResult};
use crate::settings::LoggingSettings;

/// Build the filter: `RUST_LOG` when set, the configured directives otherwise.
pub fn env_filter(settings: &LoggingSettings) -> ConfigResult<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&settings.filter)
        .map_err(|err| ConfigError::invalid_value("logging.filter", err.to_string()))
}

/// Install a stderr fmt subscriber as the global default.
///
/// Returns `false` when a global subscriber was already installed, in
/// which case nothing changes.
pub fn init_tracing(settings: &LoggingSettings) -> ConfigResult<bool> {
    let filter = env_filter(settings)?;
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok();
    if installed {
        tracing::debug!(filter = %settings.filter, "tracing initialized");
    }
    Ok(installed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn configured_filter_is_used_without_rust_log() {
        std::env::remove_var("RUST_LOG");
        let settings = LoggingSettings {
            filter: "searchform=debug".into(),
        };
        let filter = env_filter(&settings).unwrap();
        assert_eq!(filter.to_string(), "searchform=debug");
    }

    #[test]
    #[serial]
    fn bad_directives_are_rejected() {
        std::env::remove_var("RUST_LOG");
        let settings = LoggingSettings {
            filter: "searchform=loud".into(),
        };
        assert!(matches!(
            env_filter(&settings),
            Err(ConfigError::InvalidValue { key, .. }) if key == "logging.filter"
        ));
    }

    #[test]
    #[serial]
    fn second_init_is_a_noop() {
        std::env::remove_var("RUST_LOG");
        let settings = LoggingSettings::default();
        let _ = init_tracing(&settings).unwrap();
        assert!(!init_tracing(&settings).unwrap());
    }
}
