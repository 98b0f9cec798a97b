//! Dispatcher
//!
//! Executes a single resolved, authorized operation against a registry
//! client, applying the per-call timeout and retry policy and mapping
//! client-level outcomes onto the gateway error taxonomy. Stateless across
//! calls; concurrent invocations share one dispatcher.

use crate::client::{ClientError, RegistryClient};
use crate::error::{GatewayError, Result};
use crate::policy::OperationKind;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

const DEFAULT_BACKOFF_BASE: Duration = Duration::from_millis(250);

enum AttemptError {
    /// Transport failure or timeout. Eligible for retry on read kinds.
    Retryable(String),
    /// Everything else surfaces immediately.
    Terminal(GatewayError),
}

pub struct Dispatcher {
    request_timeout: Duration,
    retry_count: u32,
    backoff_base: Duration,
}

impl Dispatcher {
    pub fn new(request_timeout: Duration, retry_count: u32) -> Self {
        Self {
            request_timeout,
            retry_count,
            backoff_base: DEFAULT_BACKOFF_BASE,
        }
    }

    pub fn with_backoff_base(mut self, backoff_base: Duration) -> Self {
        self.backoff_base = backoff_base;
        self
    }

    /// Execute one operation. Read kinds retry transport failures up to the
    /// configured bound with exponential backoff; mutating kinds surface
    /// the first failure so a registration is never applied twice.
    pub async fn execute(
        &self,
        client: Arc<dyn RegistryClient>,
        registry: &str,
        kind: OperationKind,
        context: &str,
        payload: &Value,
    ) -> Result<Value> {
        let attempts = if kind.is_mutating() {
            1
        } else {
            self.retry_count + 1
        };

        let mut backoff = self.backoff_base;
        let mut last_cause = String::new();

        for attempt in 1..=attempts {
            match self.attempt(client.clone(), registry, kind, context, payload).await {
                Ok(value) => return Ok(value),
                Err(AttemptError::Terminal(err)) => return Err(err),
                Err(AttemptError::Retryable(cause)) => {
                    last_cause = cause;
                    if attempt < attempts {
                        debug!(
                            "Registry '{}': {} attempt {}/{} failed ({}), retrying in {:?}",
                            registry, kind, attempt, attempts, last_cause, backoff
                        );
                        sleep(backoff).await;
                        backoff *= 2;
                    }
                }
            }
        }

        warn!(
            "Registry '{}': {} failed after {} attempt(s): {}",
            registry, kind, attempts, last_cause
        );
        Err(GatewayError::UpstreamUnavailable {
            registry: registry.to_string(),
            cause: last_cause,
        })
    }

    async fn attempt(
        &self,
        client: Arc<dyn RegistryClient>,
        registry: &str,
        kind: OperationKind,
        context: &str,
        payload: &Value,
    ) -> std::result::Result<Value, AttemptError> {
        // Run the upstream call on its own task so a panic inside client
        // I/O is contained here instead of tearing down the invocation path.
        let mut handle = {
            let context = context.to_string();
            let payload = payload.clone();
            tokio::spawn(async move { client.perform(kind, &context, &payload).await })
        };

        let joined = match timeout(self.request_timeout, &mut handle).await {
            Ok(joined) => joined,
            Err(_) => {
                handle.abort();
                return Err(AttemptError::Retryable(format!(
                    "timed out after {:?}",
                    self.request_timeout
                )));
            }
        };

        match joined {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(ClientError::Transport(cause))) => Err(AttemptError::Retryable(cause)),
            Ok(Err(ClientError::Http { status, body })) => {
                Err(AttemptError::Terminal(upstream_error(registry, status, &body)))
            }
            Ok(Err(ClientError::BadPayload(cause))) => {
                Err(AttemptError::Terminal(GatewayError::InvalidRequest {
                    message: cause,
                }))
            }
            Err(join_err) => Err(AttemptError::Terminal(GatewayError::UpstreamUnavailable {
                registry: registry.to_string(),
                cause: format!("upstream call crashed: {}", join_err),
            })),
        }
    }
}

/// Map a non-success upstream status to the taxonomy: 4xx-class semantic
/// errors become UpstreamRejected with the upstream reason preserved,
/// anything else counts as unavailable.
fn upstream_error(registry: &str, status: u16, body: &str) -> GatewayError {
    let reason = upstream_reason(status, body);
    if (400..500).contains(&status) {
        GatewayError::UpstreamRejected {
            registry: registry.to_string(),
            reason,
        }
    } else {
        GatewayError::UpstreamUnavailable {
            registry: registry.to_string(),
            cause: reason,
        }
    }
}

/// Schema Registry error bodies carry {"error_code", "message"}; fall back
/// to the raw body when the shape differs.
fn upstream_reason(status: u16, body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<Value>(body) {
        if let Some(message) = parsed.get("message").and_then(Value::as_str) {
            return message.to_string();
        }
    }
    if body.is_empty() {
        format!("HTTP {}", status)
    } else {
        format!("HTTP {}: {}", status, body)
    }
}
