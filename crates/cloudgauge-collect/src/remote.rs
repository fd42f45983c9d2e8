//! The remote client boundary.
//!
//! The production API client is outside this crate: anything that can hand
//! out service handles by name and invoke named operations implements these
//! traits. The crate ships [`crate::replay::ReplayClient`] for tests and
//! local runs.

use std::future::Future;

use serde_json::{Map, Value};
use thiserror::Error;

/// Result type alias for remote calls.
pub type FetchResult<T> = Result<T, FetchError>;

/// Errors crossing the remote client boundary.
///
/// Every variant names the service/operation so per-metric failure logs are
/// actionable. Throttling is a distinct variant as a back-off signal to
/// outer layers; this crate itself applies no retry policy.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("unknown service '{0}'")]
    UnknownService(String),

    #[error("service '{service}' has no operation '{operation}'")]
    UnknownOperation { service: String, operation: String },

    #[error("call to {service}.{operation} failed: {message}")]
    Transport {
        service: String,
        operation: String,
        message: String,
    },

    #[error("call to {service}.{operation} was throttled: {message}")]
    Throttled {
        service: String,
        operation: String,
        message: String,
    },
}

impl FetchError {
    /// Whether the remote side asked the caller to back off.
    pub fn is_throttled(&self) -> bool {
        matches!(self, FetchError::Throttled { .. })
    }
}

/// A remote API client: hands out service handles by name.
pub trait RemoteClient: Send + Sync {
    type Service: RemoteService;

    fn service(&self, name: &str) -> FetchResult<Self::Service>;
}

/// One remote service: invokes named operations with a JSON argument map.
pub trait RemoteService: Send + Sync {
    type Paginator: Paginator;

    /// Invoke an operation once, returning the raw response document.
    fn call(
        &self,
        operation: &str,
        args: &Map<String, Value>,
    ) -> impl Future<Output = FetchResult<Value>> + Send;

    /// Obtain a paginator bound to a listing operation. The paginator owns
    /// all cursor bookkeeping; callers only see a sequence of pages.
    fn paginator(&self, operation: &str) -> FetchResult<Self::Paginator>;
}

/// Yields response pages until the remote side signals completion.
pub trait Paginator: Send {
    /// The next page, or `None` once the listing is exhausted.
    fn next_page(
        &mut self,
        args: &Map<String, Value>,
    ) -> impl Future<Output = FetchResult<Option<Value>>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn throttled_is_distinguishable() {
        let throttled = FetchError::Throttled {
            service: "ec2".into(),
            operation: "describe_instances".into(),
            message: "Rate exceeded".into(),
        };
        let transport = FetchError::Transport {
            service: "ec2".into(),
            operation: "describe_instances".into(),
            message: "connection reset".into(),
        };
        assert!(throttled.is_throttled());
        assert!(!transport.is_throttled());
    }

    #[test]
    fn errors_name_service_and_operation() {
        let err = FetchError::Transport {
            service: "sqs".into(),
            operation: "list_queues".into(),
            message: "timeout".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("sqs"));
        assert!(msg.contains("list_queues"));
    }
}
