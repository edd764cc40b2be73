//! Provider configuration
//!
//! Values come from the provider block (deserialized with serde) or from
//! the environment, then go through [`Config::validate`].

use std::fmt;

use selectel_core::retry::{DEFAULT_MAX_RETRIES, RetryPolicy};
use serde::Deserialize;
use thiserror::Error;

/// Identity endpoint of the VPC reseller API, version 2
pub const DEFAULT_AUTH_URL: &str = "https://api.selectel.ru/vpc/resell/v2";

/// Regions accepted in the provider configuration
pub const REGIONS: &[&str] = &["ru-1", "ru-2", "ru-3", "ru-7", "ru-8", "ru-9", "uz-1"];

/// Errors that can occur while loading or validating configuration
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("token must be specified")]
    MissingToken,

    #[error("region is invalid: {0}")]
    InvalidRegion(String),

    /// A setting required by resource import is not set
    #[error("{0} must be set for the resource import")]
    MissingForImport(&'static str),

    #[error("invalid provider configuration: {0}")]
    Parse(String),
}

/// Provider configuration
#[derive(Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Token to authorize with the Selectel API
    pub token: String,
    /// Identity endpoint; empty means [`DEFAULT_AUTH_URL`]
    pub auth_url: String,
    pub region: Option<String>,
    pub project_id: Option<String>,
    /// How many times a failed request is repeated
    pub max_retries: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            token: String::new(),
            auth_url: String::new(),
            region: None,
            project_id: None,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("token", &"<redacted>")
            .field("auth_url", &self.auth_url)
            .field("region", &self.region)
            .field("project_id", &self.project_id)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

impl Config {
    /// Load configuration from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable lookup
    ///
    /// Where several variables feed one setting, the first non-empty one wins.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let first = |keys: &[&str]| {
            keys.iter()
                .find_map(|key| lookup(key).filter(|value| !value.is_empty()))
        };

        Self {
            token: first(&["SEL_TOKEN"]).unwrap_or_default(),
            auth_url: first(&["OS_AUTH_URL"]).unwrap_or_default(),
            region: first(&["SEL_REGION", "OS_REGION_NAME"]),
            project_id: first(&["SEL_PROJECT_ID", "OS_PROJECT_ID", "OS_TENANT_ID"]),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Parse the provider block as JSON
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Check required settings and fill in defaults
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        if self.token.is_empty() {
            return Err(ConfigError::MissingToken);
        }
        if self.auth_url.is_empty() {
            self.auth_url = DEFAULT_AUTH_URL.to_string();
        }
        if let Some(region) = &self.region {
            validate_region(region)?;
        }
        Ok(())
    }

    /// Project and region that imported resources are placed in
    pub fn import_scope(&self) -> Result<(&str, &str), ConfigError> {
        let project_id = self
            .project_id
            .as_deref()
            .ok_or(ConfigError::MissingForImport("SEL_PROJECT_ID"))?;
        let region = self
            .region
            .as_deref()
            .ok_or(ConfigError::MissingForImport("SEL_REGION"))?;
        Ok((project_id, region))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new().with_max_retries(self.max_retries)
    }
}

/// Check that `region` is one of [`REGIONS`]
pub fn validate_region(region: &str) -> Result<(), ConfigError> {
    if REGIONS.contains(&region) {
        Ok(())
    } else {
        Err(ConfigError::InvalidRegion(region.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_validate() {
        let mut config = Config {
            token: "secret".to_string(),
            region: Some("ru-3".to_string()),
            ..Default::default()
        };

        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.auth_url, DEFAULT_AUTH_URL);
    }

    #[test]
    fn test_validate_no_token() {
        let mut config = Config::default();
        let err = config.validate().unwrap_err();
        assert_eq!(err.to_string(), "token must be specified");
    }

    #[test]
    fn test_validate_err_region() {
        let mut config = Config {
            token: "secret".to_string(),
            region: Some("unknown region".to_string()),
            ..Default::default()
        };

        let err = config.validate().unwrap_err();
        assert_eq!(err.to_string(), "region is invalid: unknown region");
    }

    #[test]
    fn test_validate_keeps_custom_auth_url() {
        let mut config = Config {
            token: "secret".to_string(),
            auth_url: "https://example.test/v2".to_string(),
            ..Default::default()
        };

        config.validate().unwrap();
        assert_eq!(config.auth_url, "https://example.test/v2");
    }

    #[test]
    fn test_from_lookup_prefers_first_non_empty() {
        let config = Config::from_lookup(lookup(&[
            ("SEL_TOKEN", "secret"),
            ("SEL_REGION", ""),
            ("OS_REGION_NAME", "ru-1"),
            ("OS_TENANT_ID", "tenant"),
            ("OS_PROJECT_ID", "project"),
        ]));

        assert_eq!(config.token, "secret");
        assert_eq!(config.region.as_deref(), Some("ru-1"));
        assert_eq!(config.project_id.as_deref(), Some("project"));
        assert_eq!(config.max_retries, DEFAULT_MAX_RETRIES);
    }

    #[test]
    fn test_from_json_defaults() {
        let config = Config::from_json(r#"{"token": "secret", "region": "ru-9"}"#).unwrap();
        assert_eq!(config.token, "secret");
        assert_eq!(config.region.as_deref(), Some("ru-9"));
        assert_eq!(config.project_id, None);
        assert_eq!(config.max_retries, DEFAULT_MAX_RETRIES);
    }

    #[test]
    fn test_from_json_rejects_bad_types() {
        let err = Config::from_json(r#"{"max_retries": "three"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_import_scope() {
        let mut config = Config::default();
        assert_eq!(
            config.import_scope().unwrap_err().to_string(),
            "SEL_PROJECT_ID must be set for the resource import"
        );

        config.project_id = Some("project".to_string());
        assert_eq!(
            config.import_scope().unwrap_err(),
            ConfigError::MissingForImport("SEL_REGION")
        );

        config.region = Some("ru-2".to_string());
        assert_eq!(config.import_scope(), Ok(("project", "ru-2")));
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = Config {
            token: "secret".to_string(),
            ..Default::default()
        };
        let debug = format!("{:?}", config);
        assert!(!debug.contains("secret"));
        assert!(debug.contains("<redacted>"));
    }
}
