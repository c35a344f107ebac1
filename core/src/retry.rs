//! Bounded retry around a `Transport`.
//!
//! # Design
//! Each attempt's outcome is reduced to a `RetryTrigger`. Triggers in
//! `always_retry` repeat any operation; triggers in `idempotent_retry` only
//! repeat operations that have no side effects.
//!
//! The delay between attempts is fixed. When the budget runs out the last
//! outcome is returned as-is: a response (whatever its status) stays a
//! response, a failure becomes `ApiError::Transport`.

use std::collections::HashSet;
use std::thread;
use std::time::Duration;

use tracing::{debug, error, warn};

use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::operation::Operation;
use crate::transport::{Transport, TransportFailure};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RetryTrigger {
    /// The connection could not be established; nothing was sent.
    Connect,
    /// No response arrived in time.
    Timeout,
    /// The exchange broke after the request may have been sent.
    Io,
    /// The service answered with this non-2xx status.
    Status(u16),
    /// Never retried, whatever the policy says.
    NonRetryable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per request, including the first. Zero behaves as one.
    pub max_attempts: u32,
    pub delay: Duration,
    pub always_retry: HashSet<RetryTrigger>,
    pub idempotent_retry: HashSet<RetryTrigger>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_millis(200),
            always_retry: HashSet::from([RetryTrigger::Connect, RetryTrigger::Status(429)]),
            idempotent_retry: HashSet::from([
                RetryTrigger::Timeout,
                RetryTrigger::Io,
                RetryTrigger::Status(408),
                RetryTrigger::Status(500),
                RetryTrigger::Status(502),
                RetryTrigger::Status(503),
                RetryTrigger::Status(504),
            ]),
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no retries.
    pub fn disabled() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Retry every trigger for every operation, including POST and PATCH.
    ///
    /// Repeating a non-idempotent request after it reached the server can
    /// duplicate its effect upstream.
    pub fn uniform() -> Self {
        let base = Self::default();
        let always_retry = base.always_retry.union(&base.idempotent_retry).copied().collect();
        Self {
            always_retry,
            idempotent_retry: HashSet::new(),
            ..base
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn should_retry(&self, trigger: RetryTrigger, operation: Operation) -> bool {
        if trigger == RetryTrigger::NonRetryable {
            return false;
        }
        self.always_retry.contains(&trigger)
            || (operation.is_idempotent() && self.idempotent_retry.contains(&trigger))
    }

    /// Run `request` through `transport` until it succeeds, a non-retryable
    /// outcome occurs, or the attempt budget is spent.
    pub fn execute<T>(
        &self,
        transport: &T,
        operation: Operation,
        request: &HttpRequest,
    ) -> Result<HttpResponse, ApiError>
    where
        T: Transport + ?Sized,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            debug!(%operation, method = %request.method, attempt, "sending request");
            let outcome = transport.execute(request);
            let trigger = match &outcome {
                Ok(response) if response.is_success() => None,
                Ok(response) => Some(RetryTrigger::Status(response.status)),
                Err(failure) => Some(failure.trigger()),
            };

            let Some(trigger) = trigger else {
                return outcome.map_err(|source| exhausted(operation, attempt, source));
            };
            if attempt >= max_attempts || !self.should_retry(trigger, operation) {
                if attempt > 1 || outcome.is_err() {
                    error!(%operation, attempt, ?trigger, "giving up on request");
                }
                return outcome.map_err(|source| exhausted(operation, attempt, source));
            }

            warn!(
                %operation,
                attempt,
                ?trigger,
                delay_ms = self.delay.as_millis() as u64,
                "retrying request"
            );
            if !self.delay.is_zero() {
                thread::sleep(self.delay);
            }
            attempt += 1;
        }
    }
}

fn exhausted(operation: Operation, attempts: u32, source: TransportFailure) -> ApiError {
    ApiError::Transport {
        operation,
        attempts,
        source,
    }
}
