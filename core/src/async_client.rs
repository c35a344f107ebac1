//! Future-returning facade over `UserApiClient`.
//!
//! Every call runs the blocking client on tokio's blocking pool, so retries,
//! delays and credential handling are exactly those of the blocking client.
//! Must be called from within a tokio runtime.

use std::sync::Arc;

use crate::client::UserApiClient;
use crate::credentials::{CredentialProvider, EnvCredentials};
use crate::error::ApiError;
use crate::http::{HttpResponse, Payload};
use crate::transport::{Transport, UreqTransport};

#[derive(Debug)]
pub struct AsyncUserApiClient<T = UreqTransport, C = EnvCredentials> {
    inner: Arc<UserApiClient<T, C>>,
}

impl<T, C> Clone for AsyncUserApiClient<T, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, C> From<UserApiClient<T, C>> for AsyncUserApiClient<T, C> {
    fn from(client: UserApiClient<T, C>) -> Self {
        Self {
            inner: Arc::new(client),
        }
    }
}

impl<T, C> AsyncUserApiClient<T, C>
where
    T: Transport + 'static,
    C: CredentialProvider + 'static,
{
    pub fn blocking(&self) -> &UserApiClient<T, C> {
        &self.inner
    }

    pub async fn create_user(&self, payload: Payload) -> Result<HttpResponse, ApiError> {
        self.run(move |client| client.create_user(&payload)).await
    }

    pub async fn send_reset_password_link(
        &self,
        email: String,
        confirmation_code: String,
    ) -> Result<HttpResponse, ApiError> {
        self.run(move |client| client.send_reset_password_link(&email, &confirmation_code))
            .await
    }

    pub async fn verify_reset_password_code(
        &self,
        email: String,
        confirmation_code: String,
        new_password: String,
    ) -> Result<HttpResponse, ApiError> {
        self.run(move |client| {
            client.verify_reset_password_code(&email, &confirmation_code, &new_password)
        })
        .await
    }

    pub async fn patch_user(&self, payload: Payload) -> Result<HttpResponse, ApiError> {
        self.run(move |client| client.patch_user(&payload)).await
    }

    pub async fn authenticate(&self, payload: Payload) -> Result<HttpResponse, ApiError> {
        self.run(move |client| client.authenticate(&payload)).await
    }

    pub async fn get_user_by_id(&self, id: String) -> Result<HttpResponse, ApiError> {
        self.run(move |client| client.get_user_by_id(&id)).await
    }

    pub async fn get_token(&self, token: String) -> Result<HttpResponse, ApiError> {
        self.run(move |client| client.get_token(&token)).await
    }

    async fn run<F>(&self, call: F) -> Result<HttpResponse, ApiError>
    where
        F: FnOnce(&UserApiClient<T, C>) -> Result<HttpResponse, ApiError> + Send + 'static,
    {
        let client = Arc::clone(&self.inner);
        match tokio::task::spawn_blocking(move || call(&client)).await {
            Ok(result) => result,
            Err(e) => Err(ApiError::TaskFailed(e.to_string())),
        }
    }
}
