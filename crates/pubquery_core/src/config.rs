//! Core configuration loaded from JSON.
//!
//! # Responsibility
//! - Describe log level and search defaults in one typed document.
//! - Reject unknown keys and blank names before anything is built from it.
//!
//! # Invariants
//! - A `CoreConfig` returned by `load_config` / `from_json_str` is validated.
//! - Missing sections fall back to `Default`.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration loading and validation errors.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Json(serde_json::Error),
    /// Document parsed but holds an unusable value.
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "failed to read config: {err}"),
            Self::Json(err) => write!(f, "failed to parse config: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Json(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

/// Search defaults shared by the provider registry and the facade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SearchSettings {
    /// Provider used when a search names none; first registered otherwise.
    pub default_provider: Option<String>,
    /// Fields searched when a provider reports no searchable fields.
    pub fallback_search_fields: Vec<String>,
    pub use_wildcards: bool,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            default_provider: None,
            fallback_search_fields: Vec::new(),
            use_wildcards: true,
        }
    }
}

/// Root configuration document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoreConfig {
    pub log_level: Option<String>,
    pub search: SearchSettings,
}

impl CoreConfig {
    /// Parses and validates a JSON document.
    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks values serde cannot express.
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(level) = &self.log_level {
            if level.trim().is_empty() {
                return Err(ConfigError::Invalid("log_level cannot be blank".to_string()));
            }
        }
        if let Some(name) = &self.search.default_provider {
            if name.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "search.default_provider cannot be blank".to_string(),
                ));
            }
        }
        if self
            .search
            .fallback_search_fields
            .iter()
            .any(|field| field.trim().is_empty())
        {
            return Err(ConfigError::Invalid(
                "search.fallback_search_fields cannot contain blank names".to_string(),
            ));
        }
        Ok(())
    }
}

/// Reads and validates a JSON config file.
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<CoreConfig> {
    let raw = std::fs::read_to_string(path)?;
    CoreConfig::from_json_str(&raw)
}

#[cfg(test)]
mod tests {
    use super::{load_config, ConfigError, CoreConfig};
    use std::io::Write;

    #[test]
    fn empty_document_uses_defaults() {
        let config = CoreConfig::from_json_str("{}").expect("empty config should parse");
        assert_eq!(config, CoreConfig::default());
        assert!(config.search.use_wildcards);
        assert!(config.search.default_provider.is_none());
    }

    #[test]
    fn partial_search_section_keeps_other_defaults() {
        let config = CoreConfig::from_json_str(
            r#"{ "log_level": "debug", "search": { "default_provider": "internal" } }"#,
        )
        .expect("config should parse");
        assert_eq!(config.log_level.as_deref(), Some("debug"));
        assert_eq!(config.search.default_provider.as_deref(), Some("internal"));
        assert!(config.search.use_wildcards);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = CoreConfig::from_json_str(r#"{ "search": { "provider": "x" } }"#)
            .expect_err("unknown key should fail");
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn blank_names_are_rejected() {
        let err = CoreConfig::from_json_str(r#"{ "search": { "default_provider": "  " } }"#)
            .expect_err("blank provider should fail");
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = CoreConfig::from_json_str(
            r#"{ "search": { "fallback_search_fields": ["nodeName", ""] } }"#,
        )
        .expect_err("blank field should fail");
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn load_config_reads_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file should be created");
        write!(
            file,
            r#"{{ "search": {{ "use_wildcards": false, "fallback_search_fields": ["title"] }} }}"#
        )
        .expect("config should be written");

        let config = load_config(file.path()).expect("config file should load");
        assert!(!config.search.use_wildcards);
        assert_eq!(config.search.fallback_search_fields, vec!["title".to_string()]);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let err = load_config(dir.path().join("missing.json")).expect_err("missing file");
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
