//! Executing `HttpRequest` values over the network.

use std::io;

use thiserror::Error;

use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::retry::RetryTrigger;

/// Performs a single HTTP exchange. Retries are the caller's concern.
pub trait Transport: Send + Sync {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportFailure>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// No connection was established, so the request never left the client.
    Connect,
    Timeout,
    /// The connection broke during the exchange.
    Io,
    /// The request itself could not be constructed (bad URL or header).
    Request,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::Connect => "connection failed",
            FailureKind::Timeout => "timed out",
            FailureKind::Io => "i/o error",
            FailureKind::Request => "invalid request",
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("{}: {message}", .kind.as_str())]
pub struct TransportFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl TransportFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn trigger(&self) -> RetryTrigger {
        match self.kind {
            FailureKind::Connect => RetryTrigger::Connect,
            FailureKind::Timeout => RetryTrigger::Timeout,
            FailureKind::Io => RetryTrigger::Io,
            FailureKind::Request => RetryTrigger::NonRetryable,
        }
    }
}

/// Blocking transport backed by a `ureq` agent.
///
/// Status-as-error is disabled so 4xx/5xx come back as responses and the
/// retry policy can decide what to do with them.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new() -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { agent }
    }

    /// Use a preconfigured agent. It must have status-as-error disabled.
    pub fn with_agent(agent: ureq::Agent) -> Self {
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportFailure> {
        let url = request.url.as_str();
        let result = match request.method {
            HttpMethod::Get => {
                let mut builder = self.agent.get(url);
                for (name, value) in &request.headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                builder.call()
            }
            HttpMethod::Post | HttpMethod::Patch => {
                let mut builder = if request.method == HttpMethod::Post {
                    self.agent.post(url)
                } else {
                    self.agent.patch(url)
                };
                for (name, value) in &request.headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                match &request.body {
                    Some(body) => builder.send(body.as_bytes()),
                    None => builder.send_empty(),
                }
            }
        };

        let mut response = result.map_err(|e| TransportFailure::new(classify(&e), e.to_string()))?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
                (name.as_str().to_string(), value)
            })
            .collect();
        let body = response
            .body_mut()
            .read_to_vec()
            .map_err(|e| TransportFailure::new(FailureKind::Io, e.to_string()))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn classify(err: &ureq::Error) -> FailureKind {
    match err {
        ureq::Error::HostNotFound | ureq::Error::ConnectionFailed => FailureKind::Connect,
        ureq::Error::Timeout(ureq::Timeout::Resolve | ureq::Timeout::Connect) => FailureKind::Connect,
        ureq::Error::Timeout(_) => FailureKind::Timeout,
        ureq::Error::Io(io_err) => match io_err.kind() {
            io::ErrorKind::ConnectionRefused
            | io::ErrorKind::AddrNotAvailable
            | io::ErrorKind::NotConnected => FailureKind::Connect,
            io::ErrorKind::TimedOut => FailureKind::Timeout,
            _ => FailureKind::Io,
        },
        ureq::Error::BadUri(_) | ureq::Error::Http(_) => FailureKind::Request,
        _ => FailureKind::Io,
    }
}
