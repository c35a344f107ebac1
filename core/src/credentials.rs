//! Credential resolution for HTTP Basic Authentication.
//!
//! # Design
//! Credentials are resolved on every request and never cached, so a rotated
//! secret is picked up without restarting the process. `EnvCredentials` reads
//! two named slots through a lookup function; the default lookup is the
//! process environment, and tests inject their own.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use secrecy::{ExposeSecret, SecretString};

/// Username and password resolved for a single request.
#[derive(Debug, Default)]
pub struct Credentials {
    pub username: Option<String>,
    pub password: Option<SecretString>,
}

impl Credentials {
    pub fn new(username: Option<String>, password: Option<String>) -> Self {
        Self {
            username: username.filter(|u| !u.is_empty()),
            password: password.filter(|p| !p.is_empty()).map(SecretString::from),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.username.is_some() && self.password.is_some()
    }

    /// `Authorization` header value, or `None` unless both parts are present.
    pub fn basic_auth_header(&self) -> Option<String> {
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => {
                let pair = format!("{username}:{}", password.expose_secret());
                Some(format!("Basic {}", STANDARD.encode(pair)))
            }
            _ => None,
        }
    }
}

/// Source of credentials, consulted once per request.
pub trait CredentialProvider: Send + Sync {
    fn resolve(&self) -> Credentials;
}

type Lookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Reads the username and password from two named slots.
pub struct EnvCredentials {
    username_key: String,
    password_key: String,
    lookup: Lookup,
}

impl EnvCredentials {
    /// Slots resolved against the process environment.
    pub fn new(username_key: &str, password_key: &str) -> Self {
        Self::with_lookup(username_key, password_key, |key| std::env::var(key).ok())
    }

    /// Slots resolved through a caller-supplied lookup.
    pub fn with_lookup<F>(username_key: &str, password_key: &str, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            username_key: username_key.to_string(),
            password_key: password_key.to_string(),
            lookup: Box::new(lookup),
        }
    }

    pub fn username_key(&self) -> &str {
        &self.username_key
    }

    pub fn password_key(&self) -> &str {
        &self.password_key
    }

    fn read(&self, key: &str) -> Option<String> {
        if key.is_empty() {
            return None;
        }
        (self.lookup)(key)
    }
}

impl CredentialProvider for EnvCredentials {
    fn resolve(&self) -> Credentials {
        Credentials::new(self.read(&self.username_key), self.read(&self.password_key))
    }
}

impl fmt::Debug for EnvCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvCredentials")
            .field("username_key", &self.username_key)
            .field("password_key", &self.password_key)
            .finish_non_exhaustive()
    }
}

/// Fixed credentials supplied by the caller.
#[derive(Clone, Default)]
pub struct StaticCredentials {
    username: Option<String>,
    password: Option<String>,
}

impl StaticCredentials {
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            username: Some(username.to_string()),
            password: Some(password.to_string()),
        }
    }

    /// No credentials at all; requests go out unauthenticated.
    pub fn none() -> Self {
        Self::default()
    }
}

impl CredentialProvider for StaticCredentials {
    fn resolve(&self) -> Credentials {
        Credentials::new(self.username.clone(), self.password.clone())
    }
}

impl fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticCredentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}
