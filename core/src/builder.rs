//! Stateless request construction for the user API.
//!
//! # Design
//! `RequestBuilder` holds only the normalized base URL. Each operation has a
//! `build_*` method that produces an `HttpRequest` without touching the
//! network or credentials. Payload shapes are not validated; the upstream
//! service owns that contract.

use serde_json::Value;

use crate::config::normalize_base_url;
use crate::error::ApiError;
use crate::http::{HttpRequest, Payload};
use crate::operation::Operation;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestBuilder {
    base_url: String,
}

impl RequestBuilder {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        Ok(Self {
            base_url: normalize_base_url(base_url)?,
        })
    }

    /// The base URL, always ending in exactly one `/`.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_create_user(&self, payload: &Payload) -> Result<HttpRequest, ApiError> {
        self.with_body(Operation::CreateUser, payload)
    }

    pub fn build_send_reset_password_link(
        &self,
        email: &str,
        confirmation_code: &str,
    ) -> Result<HttpRequest, ApiError> {
        let payload = fields(&[("email", email), ("confirmation_code", confirmation_code)]);
        self.with_body(Operation::SendResetPasswordLink, &payload)
    }

    pub fn build_verify_reset_password_code(
        &self,
        email: &str,
        confirmation_code: &str,
        new_password: &str,
    ) -> Result<HttpRequest, ApiError> {
        let payload = fields(&[
            ("email", email),
            ("confirmation_code", confirmation_code),
            ("new_password", new_password),
        ]);
        self.with_body(Operation::VerifyResetPasswordCode, &payload)
    }

    pub fn build_patch_user(&self, payload: &Payload) -> Result<HttpRequest, ApiError> {
        self.with_body(Operation::PatchUser, payload)
    }

    pub fn build_authenticate(&self, payload: &Payload) -> Result<HttpRequest, ApiError> {
        self.with_body(Operation::Authenticate, payload)
    }

    /// The id is appended to the path as given.
    pub fn build_get_user_by_id(&self, id: &str) -> Result<HttpRequest, ApiError> {
        self.with_path_param(Operation::GetUserById, "id", id)
    }

    /// The token is appended to the path as given.
    pub fn build_get_token(&self, token: &str) -> Result<HttpRequest, ApiError> {
        self.with_path_param(Operation::GetToken, "token", token)
    }

    fn url(&self, operation: Operation) -> String {
        format!("{}{}", self.base_url, operation.path())
    }

    fn with_body(&self, operation: Operation, payload: &Payload) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_string(payload).map_err(|e| ApiError::Serialization(e.to_string()))?;
        Ok(HttpRequest {
            method: operation.method(),
            url: self.url(operation),
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: Some(body),
        })
    }

    fn with_path_param(
        &self,
        operation: Operation,
        name: &'static str,
        value: &str,
    ) -> Result<HttpRequest, ApiError> {
        if value.is_empty() {
            return Err(ApiError::InvalidParameter { name });
        }
        Ok(HttpRequest {
            method: operation.method(),
            url: format!("{}{value}", self.url(operation)),
            headers: Vec::new(),
            body: None,
        })
    }
}

fn fields(pairs: &[(&str, &str)]) -> Payload {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), Value::String(value.to_string())))
        .collect()
}
