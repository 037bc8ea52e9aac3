//! Data-source settings, read from the `datapipe:` section of an
//! application YAML file and overridable through environment variables.
//!
//! ```yaml
//! datapipe:
//!   default_page_size: 50
//!   strict_update: true
//!   consistent_pagination: false
//!   identifier_policy: quote
//! ```
//!
//! Environment overrides (highest priority): `DATAPIPE_DEFAULT_PAGE_SIZE`,
//! `DATAPIPE_STRICT_UPDATE`, `DATAPIPE_CONSISTENT_PAGINATION`,
//! `DATAPIPE_IDENTIFIER_POLICY`.

use crate::params::DEFAULT_PAGE_SIZE;
use crate::query::IdentifierPolicy;
use serde::Deserialize;
use std::path::Path;

const SECTION: &str = "datapipe";

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    /// An I/O or YAML parsing error occurred while loading the file.
    Load(String),
    /// An environment variable held a value of the wrong type.
    Env { key: String, message: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Load(msg) => write!(f, "Config load error: {msg}"),
            ConfigError::Env { key, message } => {
                write!(f, "Config env override '{key}' is invalid: {message}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DataSourceConfig {
    /// Page size used when a request's `per_page` is below 1.
    pub default_page_size: i64,
    /// Report `NotFound` when an update matches no row.
    pub strict_update: bool,
    /// Run the pagination count and fetch inside one transaction.
    pub consistent_pagination: bool,
    pub identifier_policy: IdentifierPolicy,
}

impl Default for DataSourceConfig {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
            strict_update: false,
            consistent_pagination: false,
            identifier_policy: IdentifierPolicy::Raw,
        }
    }
}

impl DataSourceConfig {
    /// Parse the `datapipe` section of a YAML document. A missing section
    /// yields the defaults.
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let yaml: serde_yaml::Value =
            serde_yaml::from_str(content).map_err(|e| ConfigError::Load(e.to_string()))?;
        match yaml.get(SECTION) {
            Some(section) if !section.is_null() => serde_yaml::from_value(section.clone())
                .map_err(|e| ConfigError::Load(e.to_string())),
            _ => Ok(Self::default()),
        }
    }

    /// Load from a YAML file. A missing file yields the defaults.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "datapipe config file not found, using defaults");
            return Ok(Self::default());
        }
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Load(e.to_string()))?;
        Self::from_yaml_str(&content)
    }

    /// Apply `DATAPIPE_*` environment variables on top of this config.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(v) = lookup("DATAPIPE_DEFAULT_PAGE_SIZE") {
            self.default_page_size = parse_env("DATAPIPE_DEFAULT_PAGE_SIZE", &v)?;
        }
        if let Some(v) = lookup("DATAPIPE_STRICT_UPDATE") {
            self.strict_update = parse_env("DATAPIPE_STRICT_UPDATE", &v)?;
        }
        if let Some(v) = lookup("DATAPIPE_CONSISTENT_PAGINATION") {
            self.consistent_pagination = parse_env("DATAPIPE_CONSISTENT_PAGINATION", &v)?;
        }
        if let Some(v) = lookup("DATAPIPE_IDENTIFIER_POLICY") {
            self.identifier_policy = parse_env("DATAPIPE_IDENTIFIER_POLICY", &v)?;
        }
        Ok(self)
    }
}

fn parse_env<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Env {
        key: key.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = DataSourceConfig::default();
        assert_eq!(config.default_page_size, 20);
        assert!(!config.strict_update);
        assert!(!config.consistent_pagination);
        assert_eq!(config.identifier_policy, IdentifierPolicy::Raw);
    }

    #[test]
    fn test_from_yaml_section() {
        let yaml = r#"
app:
  name: "users"
datapipe:
  default_page_size: 50
  strict_update: true
  identifier_policy: quote
"#;
        let config = DataSourceConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.default_page_size, 50);
        assert!(config.strict_update);
        assert!(!config.consistent_pagination);
        assert_eq!(config.identifier_policy, IdentifierPolicy::Quote);
    }

    #[test]
    fn test_missing_section() {
        let config = DataSourceConfig::from_yaml_str("app:\n  name: x\n").unwrap();
        assert_eq!(config, DataSourceConfig::default());
    }

    #[test]
    fn test_bad_yaml() {
        let err = DataSourceConfig::from_yaml_str("datapipe:\n  strict_update: maybe\n").unwrap_err();
        assert!(matches!(err, ConfigError::Load(_)));
    }

    #[test]
    fn test_missing_file() {
        let config = DataSourceConfig::from_yaml_file("/nonexistent/application.yaml").unwrap();
        assert_eq!(config, DataSourceConfig::default());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("DATAPIPE_DEFAULT_PAGE_SIZE", "15"),
            ("DATAPIPE_CONSISTENT_PAGINATION", "true"),
            ("DATAPIPE_IDENTIFIER_POLICY", "validate"),
        ]
        .into_iter()
        .collect();
        let config = DataSourceConfig::default()
            .with_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.default_page_size, 15);
        assert!(config.consistent_pagination);
        assert!(!config.strict_update);
        assert_eq!(config.identifier_policy, IdentifierPolicy::Validate);
    }

    #[test]
    fn test_env_override_invalid() {
        let err = DataSourceConfig::default()
            .with_overrides(|k| (k == "DATAPIPE_STRICT_UPDATE").then(|| "yes".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Env { ref key, .. } if key == "DATAPIPE_STRICT_UPDATE"));
    }
}
