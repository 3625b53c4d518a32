//! Settings loading using Figment

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Json, Serialized, Toml, Yaml},
    Figment,
};
use tracing::{debug, trace};

use crate::error::{ConfigError, ConfigResult};
use crate::settings::StoreSettings;

/// Prefix of environment variables read by default
pub const ENV_PREFIX: &str = "SEARCHFORM_";

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML format (.toml extension)
    Toml,
    /// YAML format (.yaml or .yml extensions)
    Yaml,
    /// JSON format (.json extension)
    Json,
}

impl ConfigFormat {
    /// Detect format from file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "yaml" | "yml" => Some(Self::Yaml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    /// Detect format from a path's extension
    pub fn from_path(path: &Path) -> ConfigResult<Self> {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default();
        Self::from_extension(ext).ok_or_else(|| ConfigError::UnsupportedFormat {
            format: if ext.is_empty() {
                path.display().to_string()
            } else {
                ext.to_string()
            },
        })
    }
}

/// Loads [`StoreSettings`] with a fixed precedence, later sources winning:
///
/// 1. Built-in defaults
/// 2. The configuration file, if one was given
/// 3. Environment variables (`SEARCHFORM_STORE__SUBMIT_ON_CHANGE=true`)
///
/// Nothing is cached; every [`SettingsLoader::load`] reads the sources again.
#[derive(Debug, Clone)]
pub struct SettingsLoader {
    file: Option<PathBuf>,
    env_prefix: String,
}

impl SettingsLoader {
    pub fn new() -> Self {
        Self {
            file: None,
            env_prefix: ENV_PREFIX.to_string(),
        }
    }

    /// Read this file between defaults and environment. It must exist.
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Use another environment prefix.
    pub fn env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Load and validate settings from every source.
    pub fn load(&self) -> ConfigResult<StoreSettings> {
        let settings: StoreSettings = self.figment()?.extract()?;
        settings.validate()?;
        debug!(
            persistence = %settings.store.persistence,
            submit_on_change = settings.store.submit_on_change,
            "settings loaded"
        );
        Ok(settings)
    }

    /// The merged provider chain, for callers extracting their own sections.
    pub fn figment(&self) -> ConfigResult<Figment> {
        let mut figment = Figment::new().merge(Serialized::defaults(StoreSettings::default()));

        if let Some(path) = &self.file {
            figment = figment.merge(Self::file_provider(path)?);
        }

        trace!(prefix = %self.env_prefix, "merging environment variables");
        Ok(figment.merge(Env::prefixed(&self.env_prefix).split("__")))
    }

    fn file_provider(path: &Path) -> ConfigResult<Figment> {
        if !path.is_file() {
            return Err(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let format = ConfigFormat::from_path(path)?;
        trace!(path = %path.display(), ?format, "loading configuration file");
        Ok(match format {
            ConfigFormat::Toml => Figment::from(Toml::file(path)),
            ConfigFormat::Yaml => Figment::from(Yaml::file(path)),
            ConfigFormat::Json => Figment::from(Json::file(path)),
        })
    }
}

impl Default for SettingsLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn detects_formats() {
        assert_eq!(ConfigFormat::from_extension("TOML"), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_extension("yml"), Some(ConfigFormat::Yaml));
        assert_eq!(ConfigFormat::from_extension("json"), Some(ConfigFormat::Json));
        assert_eq!(ConfigFormat::from_extension("ini"), None);
    }

    #[test]
    fn missing_file_is_reported() {
        let dir = TempDir::new().unwrap();
        let err = SettingsLoader::new()
            .file(dir.path().join("absent.toml"))
            .load()
            .unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));
    }

    #[test]
    fn unknown_extension_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("searchform.ini");
        fs::write(&path, "persistence=url").unwrap();
        let err = SettingsLoader::new().file(&path).load().unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat { format } if format == "ini"));
    }

    #[test]
    fn malformed_value_is_a_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("searchform.toml");
        fs::write(&path, "[store]\npersistence = \"cookie\"\n").unwrap();
        let err = SettingsLoader::new()
            .env_prefix("SEARCHFORM_UNIT_UNUSED_")
            .file(&path)
            .load()
            .unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }
}
