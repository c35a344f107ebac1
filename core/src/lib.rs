//! Client core for the Stellar user service.
//!
//! # Overview
//! Wraps seven REST operations of the upstream user API behind a typed
//! client that adds HTTP Basic Authentication and a bounded retry policy.
//!
//! # Design
//! - `RequestBuilder` turns an operation and its parameters into an
//!   `HttpRequest` without touching the network.
//! - `CredentialProvider` supplies the Basic-auth pair on every call; the
//!   default reads two environment slots named in `ClientConfig`.
//! - `RetryPolicy` drives a `Transport`. Non-idempotent operations are
//!   only repeated after a failed connect or a 429.
//! - `UserApiClient` is the blocking surface, `AsyncUserApiClient` the
//!   future-returning one; both share the same pipeline.
//! - Responses are returned unmodified, including non-2xx statuses.

pub mod async_client;
pub mod builder;
pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod http;
pub mod operation;
pub mod retry;
pub mod transport;

pub use async_client::AsyncUserApiClient;
pub use builder::RequestBuilder;
pub use client::UserApiClient;
pub use config::{ClientConfig, MissingCredentials};
pub use credentials::{CredentialProvider, Credentials, EnvCredentials, StaticCredentials};
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse, Payload};
pub use operation::Operation;
pub use retry::{RetryPolicy, RetryTrigger};
pub use transport::{FailureKind, Transport, TransportFailure, UreqTransport};
