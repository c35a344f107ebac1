//! Client configuration.
//!
//! # Design
//! `ClientConfig` is read once when a client is built. Every field has a
//! default so an empty document is a valid configuration pointing at the
//! production service. The names of the credential slots are configured
//! here; the secrets themselves never are.

use std::time::Duration;

use serde::Deserialize;

use crate::error::ApiError;
use crate::retry::RetryPolicy;

pub const DEFAULT_BASE_URL: &str = "https://stellaruserapiprod.azurewebsites.net/api/";
pub const DEFAULT_USERNAME_ENV_KEY: &str = "APPSETTING_API_USERNAME_STELLAR_USER_API";
pub const DEFAULT_PASSWORD_ENV_KEY: &str = "APPSETTING_API_PASSWORD_STELLAR_USER_API";

/// What to do when the credential slots do not both resolve.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingCredentials {
    /// Send the request without an `Authorization` header.
    #[default]
    Proceed,
    /// Refuse to send the request.
    Fail,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    #[serde(alias = "username_env")]
    pub username_env_key: String,
    #[serde(alias = "password_env")]
    pub password_env_key: String,
    pub missing_credentials: MissingCredentials,
    /// Total attempts per request, including the first.
    pub retry_attempts: u32,
    pub retry_delay_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            username_env_key: DEFAULT_USERNAME_ENV_KEY.to_string(),
            password_env_key: DEFAULT_PASSWORD_ENV_KEY.to_string(),
            missing_credentials: MissingCredentials::default(),
            retry_attempts: 3,
            retry_delay_ms: 200,
        }
    }
}

impl ClientConfig {
    pub fn from_json(raw: &str) -> Result<Self, ApiError> {
        serde_json::from_str(raw).map_err(|e| ApiError::Configuration(e.to_string()))
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }

    pub fn with_missing_credentials(mut self, policy: MissingCredentials) -> Self {
        self.missing_credentials = policy;
        self
    }

    /// Retry policy derived from `retry_attempts` and `retry_delay_ms`.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry_attempts,
            delay: Duration::from_millis(self.retry_delay_ms),
            ..RetryPolicy::default()
        }
    }
}

/// Strip trailing separators and append exactly one.
///
/// Fails for an empty value or anything that is not an absolute
/// `http`/`https` URL.
pub fn normalize_base_url(raw: &str) -> Result<String, ApiError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(ApiError::Configuration("base_url must not be empty".to_string()));
    }
    let parsed = url::Url::parse(trimmed)
        .map_err(|e| ApiError::Configuration(format!("base_url `{trimmed}`: {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ApiError::Configuration(format!(
            "base_url `{trimmed}` must use http or https"
        )));
    }
    Ok(format!("{trimmed}/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_production() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.username_env_key, DEFAULT_USERNAME_ENV_KEY);
        assert_eq!(config.password_env_key, DEFAULT_PASSWORD_ENV_KEY);
        assert_eq!(config.missing_credentials, MissingCredentials::Proceed);
        let policy = config.retry_policy();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.delay, Duration::from_millis(200));
    }

    #[test]
    fn empty_document_uses_defaults() {
        assert_eq!(ClientConfig::from_json("{}").unwrap(), ClientConfig::default());
    }

    #[test]
    fn key_aliases_are_accepted() {
        let config = ClientConfig::from_json(
            r#"{"username_env":"MY_USER","password_env":"MY_PASS","missing_credentials":"fail"}"#,
        )
        .unwrap();
        assert_eq!(config.username_env_key, "MY_USER");
        assert_eq!(config.password_env_key, "MY_PASS");
        assert_eq!(config.missing_credentials, MissingCredentials::Fail);
    }

    #[test]
    fn malformed_document_is_configuration_error() {
        let err = ClientConfig::from_json(r#"{"retry_attempts":"many"}"#).unwrap_err();
        assert!(matches!(err, ApiError::Configuration(_)));
    }

    #[test]
    fn normalize_appends_single_separator() {
        assert_eq!(normalize_base_url("http://host/api").unwrap(), "http://host/api/");
        assert_eq!(normalize_base_url("http://host/api/").unwrap(), "http://host/api/");
        assert_eq!(normalize_base_url("http://host/api///").unwrap(), "http://host/api/");
        assert_eq!(normalize_base_url(" http://host ").unwrap(), "http://host/");
    }

    #[test]
    fn normalize_rejects_empty_and_relative() {
        assert!(matches!(normalize_base_url(""), Err(ApiError::Configuration(_))));
        assert!(matches!(normalize_base_url("///"), Err(ApiError::Configuration(_))));
        assert!(matches!(normalize_base_url("not a url"), Err(ApiError::Configuration(_))));
        assert!(matches!(normalize_base_url("ftp://host/api"), Err(ApiError::Configuration(_))));
    }
}
