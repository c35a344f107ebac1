//! Error types for the user API client.
//!
//! # Design
//! A non-2xx response is not an error at this layer: operations return it as
//! `Ok(HttpResponse)` and the caller decides. `Upstream` only appears when the
//! caller opts in through `HttpResponse::error_for_status`. Network failures
//! surface as `Transport` once the retry budget is spent or the failure is not
//! eligible for a retry.

use thiserror::Error;

use crate::operation::Operation;
use crate::transport::TransportFailure;

#[derive(Debug, Error)]
pub enum ApiError {
    /// The request could not be completed over the network.
    #[error("{operation} failed after {attempts} attempt(s): {source}")]
    Transport {
        operation: Operation,
        attempts: u32,
        #[source]
        source: TransportFailure,
    },

    /// The service answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Upstream { status: u16, body: String },

    /// The client configuration is unusable.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// Credentials are required by configuration but could not be resolved.
    #[error("API credentials are not available")]
    MissingCredentials,

    /// A path parameter was empty.
    #[error("`{name}` must not be empty")]
    InvalidParameter { name: &'static str },

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The background task running a deferred call did not complete.
    #[error("background request task failed: {0}")]
    TaskFailed(String),
}
