//! Registry Client
//!
//! Boundary to a single upstream Schema Registry instance. Only the
//! normalized `ClientError` kinds cross into the gateway's control flow;
//! the dispatcher maps them onto the gateway error taxonomy.

mod http;
#[cfg(test)]
pub(crate) mod mock;

pub use http::HttpRegistryClient;

use crate::policy::OperationKind;
use async_trait::async_trait;
use serde_json::Value;

/// Outcome classes a registry call can produce, as seen by the gateway.
#[derive(Debug, Clone)]
pub enum ClientError {
    /// Connection failure, DNS failure, or any transport-level breakage.
    /// Reads may be retried on this class.
    Transport(String),
    /// The upstream answered with a non-success HTTP status. Never retried.
    Http { status: u16, body: String },
    /// The operation payload is missing or malforming a required field.
    /// Detected before any network call.
    BadPayload(String),
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::Transport(cause) => write!(f, "transport error: {}", cause),
            ClientError::Http { status, body } => write!(f, "HTTP {}: {}", status, body),
            ClientError::BadPayload(cause) => write!(f, "bad payload: {}", cause),
        }
    }
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;

/// One instance per configured upstream registry. Implementations carry no
/// per-call state and are shared across concurrent invocations.
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// Execute a single schema-registry operation against this upstream
    /// within the given schema context.
    async fn perform(
        &self,
        kind: OperationKind,
        context: &str,
        payload: &Value,
    ) -> ClientResult<Value>;

    /// Cheap reachability probe, used by the health endpoint.
    async fn ping(&self) -> ClientResult<()>;
}

/// Extract a required string field from an operation payload.
pub(crate) fn required_str<'a>(payload: &'a Value, field: &str) -> ClientResult<&'a str> {
    payload
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| ClientError::BadPayload(format!("missing required field '{}'", field)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_required_str() {
        let payload = json!({"subject": "orders-value"});
        assert_eq!(required_str(&payload, "subject").unwrap(), "orders-value");

        let err = required_str(&payload, "schema").unwrap_err();
        assert!(matches!(err, ClientError::BadPayload(_)));

        let payload = json!({"subject": 42});
        assert!(required_str(&payload, "subject").is_err());
    }
}
