//! Blocking client for the Stellar user API.
//!
//! # Design
//! `UserApiClient` composes a `RequestBuilder`, a `CredentialProvider`, a
//! `Transport` and a `RetryPolicy`. Its only state is the configuration
//! captured at construction, so one instance can serve concurrent callers.
//! Credentials are resolved on every call and attached as a Basic
//! `authorization` header just before the request enters the retry loop.

use tracing::{debug, warn};

use crate::builder::RequestBuilder;
use crate::config::{ClientConfig, MissingCredentials};
use crate::credentials::{CredentialProvider, EnvCredentials};
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse, Payload};
use crate::operation::Operation;
use crate::retry::RetryPolicy;
use crate::transport::{Transport, UreqTransport};

#[derive(Debug)]
pub struct UserApiClient<T = UreqTransport, C = EnvCredentials> {
    builder: RequestBuilder,
    transport: T,
    credentials: C,
    retry: RetryPolicy,
    missing_credentials: MissingCredentials,
}

impl UserApiClient<UreqTransport, EnvCredentials> {
    /// Client using `ureq` and the credential slots named in `config`.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ApiError> {
        let credentials = EnvCredentials::new(&config.username_env_key, &config.password_env_key);
        Self::new(config, UreqTransport::new(), credentials)
    }
}

impl<T, C> UserApiClient<T, C>
where
    T: Transport,
    C: CredentialProvider,
{
    pub fn new(config: &ClientConfig, transport: T, credentials: C) -> Result<Self, ApiError> {
        Ok(Self {
            builder: RequestBuilder::new(&config.base_url)?,
            transport,
            credentials,
            retry: config.retry_policy(),
            missing_credentials: config.missing_credentials,
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn requests(&self) -> &RequestBuilder {
        &self.builder
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// POST `v1/usercontroller/createuser`.
    pub fn create_user(&self, payload: &Payload) -> Result<HttpResponse, ApiError> {
        let request = self.builder.build_create_user(payload)?;
        self.send(Operation::CreateUser, request)
    }

    /// POST `v1/usercontroller/sendresetpasswordlink`.
    pub fn send_reset_password_link(
        &self,
        email: &str,
        confirmation_code: &str,
    ) -> Result<HttpResponse, ApiError> {
        let request = self.builder.build_send_reset_password_link(email, confirmation_code)?;
        self.send(Operation::SendResetPasswordLink, request)
    }

    /// POST `v1/usercontroller/verifyresetpasswordconfirmationcode`.
    pub fn verify_reset_password_code(
        &self,
        email: &str,
        confirmation_code: &str,
        new_password: &str,
    ) -> Result<HttpResponse, ApiError> {
        let request =
            self.builder
                .build_verify_reset_password_code(email, confirmation_code, new_password)?;
        self.send(Operation::VerifyResetPasswordCode, request)
    }

    /// PATCH `v1/usercontroller/patch`.
    pub fn patch_user(&self, payload: &Payload) -> Result<HttpResponse, ApiError> {
        let request = self.builder.build_patch_user(payload)?;
        self.send(Operation::PatchUser, request)
    }

    /// POST `v1/usercontroller/login`, typically with `email` and `password`.
    pub fn authenticate(&self, payload: &Payload) -> Result<HttpResponse, ApiError> {
        let request = self.builder.build_authenticate(payload)?;
        self.send(Operation::Authenticate, request)
    }

    /// GET `v1/usercontroller/user/{id}`.
    pub fn get_user_by_id(&self, id: &str) -> Result<HttpResponse, ApiError> {
        let request = self.builder.build_get_user_by_id(id)?;
        self.send(Operation::GetUserById, request)
    }

    /// GET `v1/personaltokencontroller/{token}`.
    pub fn get_token(&self, token: &str) -> Result<HttpResponse, ApiError> {
        let request = self.builder.build_get_token(token)?;
        self.send(Operation::GetToken, request)
    }

    fn send(&self, operation: Operation, mut request: HttpRequest) -> Result<HttpResponse, ApiError> {
        self.authorize(operation, &mut request)?;
        let response = self.retry.execute(&self.transport, operation, &request)?;
        debug!(%operation, status = response.status, "request completed");
        Ok(response)
    }

    fn authorize(&self, operation: Operation, request: &mut HttpRequest) -> Result<(), ApiError> {
        if let Some(header) = self.credentials.resolve().basic_auth_header() {
            request.set_header("authorization", header);
            return Ok(());
        }
        match self.missing_credentials {
            MissingCredentials::Proceed => {
                warn!(%operation, "credentials unavailable, sending request without basic auth");
                Ok(())
            }
            MissingCredentials::Fail => Err(ApiError::MissingCredentials),
        }
    }
}
