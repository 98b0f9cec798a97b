//! Gateway facade
//!
//! Wires resolution, policy enforcement and dispatch into the single entry
//! point the inbound surface calls. One instance per process; all contained
//! components are read-only after construction, so concurrent invocations
//! share it freely.

use crate::client::{HttpRegistryClient, RegistryClient};
use crate::config::Config;
use crate::directory::RegistryDirectory;
use crate::dispatch::Dispatcher;
use crate::error::{GatewayError, Result};
use crate::policy::{Decision, DenyReason, OperationKind, PolicyEnforcer, Scope};
use crate::resolve::ContextResolver;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// A single inbound operation, owned by its call path and discarded after
/// completion.
#[derive(Debug, Clone, Deserialize)]
pub struct OperationRequest {
    pub operation: OperationKind,
    #[serde(default)]
    pub registry: Option<String>,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub payload: Value,
}

impl OperationRequest {
    pub fn new(operation: OperationKind, registry: Option<&str>, context: Option<&str>, payload: Value) -> Self {
        Self {
            operation,
            registry: registry.map(str::to_string),
            context: context.map(str::to_string),
            payload,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationStatus {
    Success,
    Failure,
}

#[derive(Debug, Clone, Serialize)]
pub struct OperationError {
    pub kind: String,
    pub message: String,
}

/// Normalized result shape returned for every operation, successful or not.
#[derive(Debug, Clone, Serialize)]
pub struct OperationResult {
    pub status: OperationStatus,
    pub operation: OperationKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registry: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<OperationError>,
}

impl OperationResult {
    pub fn success(operation: OperationKind, registry: &str, payload: Value) -> Self {
        Self {
            status: OperationStatus::Success,
            operation,
            registry: Some(registry.to_string()),
            payload: Some(payload),
            error: None,
        }
    }

    pub fn failure(operation: OperationKind, registry: Option<&str>, err: &GatewayError) -> Self {
        Self {
            status: OperationStatus::Failure,
            operation,
            registry: err.registry().or(registry).map(str::to_string),
            payload: None,
            error: Some(OperationError {
                kind: err.kind().to_string(),
                message: err.to_string(),
            }),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == OperationStatus::Success
    }
}

pub struct Gateway {
    directory: RegistryDirectory,
    policy: PolicyEnforcer,
    dispatcher: Dispatcher,
    clients: HashMap<String, Arc<dyn RegistryClient>>,
}

impl Gateway {
    /// Build the gateway from startup configuration, with one HTTP client
    /// per configured registry.
    pub fn new(config: &Config, directory: RegistryDirectory) -> Self {
        let clients = directory
            .descriptors()
            .map(|d| {
                let client: Arc<dyn RegistryClient> = Arc::new(HttpRegistryClient::new(d));
                (d.name.clone(), client)
            })
            .collect();

        Self {
            policy: PolicyEnforcer::new(config.global_read_only),
            dispatcher: Dispatcher::new(config.request_timeout, config.retry_count),
            directory,
            clients,
        }
    }

    /// Assemble a gateway from pre-built parts. Used when the registry
    /// clients are provided by the embedder (and by tests).
    pub fn with_clients(
        directory: RegistryDirectory,
        policy: PolicyEnforcer,
        dispatcher: Dispatcher,
        clients: HashMap<String, Arc<dyn RegistryClient>>,
    ) -> Self {
        Self {
            directory,
            policy,
            dispatcher,
            clients,
        }
    }

    pub fn directory(&self) -> &RegistryDirectory {
        &self.directory
    }

    /// Handle one operation: resolve the target, enforce policy, dispatch.
    /// Policy denials and resolution failures return before any upstream
    /// contact.
    pub async fn handle(
        &self,
        request: &OperationRequest,
        scopes: &[Scope],
    ) -> Result<OperationResult> {
        let resolver = ContextResolver::new(&self.directory);
        let (descriptor, context) =
            resolver.resolve(request.registry.as_deref(), request.context.as_deref())?;

        match self.policy.authorize(request.operation, descriptor, scopes) {
            Decision::Allow => {}
            Decision::Deny(DenyReason::ReadOnlyRegistry) => {
                return Err(GatewayError::ReadOnlyRegistry {
                    registry: descriptor.name.clone(),
                    operation: request.operation.to_string(),
                });
            }
            Decision::Deny(DenyReason::ReadOnlyMode) => {
                return Err(GatewayError::ReadOnlyMode {
                    operation: request.operation.to_string(),
                });
            }
            Decision::Deny(DenyReason::InsufficientScope { required }) => {
                return Err(GatewayError::InsufficientScope {
                    operation: request.operation.to_string(),
                    required: required.as_str().to_string(),
                });
            }
        }

        let client = self
            .clients
            .get(&descriptor.name)
            .cloned()
            .ok_or_else(|| GatewayError::UnknownRegistry {
                name: descriptor.name.clone(),
            })?;

        debug!(
            "Dispatching {} to registry '{}' (context '{}')",
            request.operation, descriptor.name, context
        );

        let payload = self
            .dispatcher
            .execute(
                client,
                &descriptor.name,
                request.operation,
                &context,
                &request.payload,
            )
            .await?;

        Ok(OperationResult::success(
            request.operation,
            &descriptor.name,
            payload,
        ))
    }

    /// Reachability of every configured registry, for the health endpoint.
    pub async fn probe_registries(&self) -> Vec<(String, bool)> {
        let mut results = Vec::with_capacity(self.clients.len());
        for (name, client) in &self.clients {
            results.push((name.clone(), client.ping().await.is_ok()));
        }
        results.sort_by(|a, b| a.0.cmp(&b.0));
        results
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::client::mock::MockRegistryClient;
    use crate::config::RegistryConfig;
    use serde_json::json;
    use std::time::Duration;

    pub(crate) fn test_config(registries: Vec<RegistryConfig>, default: &str) -> Config {
        Config {
            registries,
            default_registry: default.to_string(),
            global_read_only: false,
            request_timeout: Duration::from_millis(100),
            retry_count: 2,
            gateway_host: "127.0.0.1".to_string(),
            gateway_port: 9000,
            allowed_networks: Vec::new(),
        }
    }

    pub(crate) fn registry_config(name: &str, read_only: bool) -> RegistryConfig {
        RegistryConfig {
            name: name.to_string(),
            url: format!("http://{}:8081", name),
            user: None,
            password: None,
            read_only,
        }
    }

    /// Two registries: writable "default" and read-only "staging", each
    /// backed by a scripted mock client.
    pub(crate) fn test_gateway() -> (Gateway, Arc<MockRegistryClient>, Arc<MockRegistryClient>) {
        let config = test_config(
            vec![
                registry_config("default", false),
                registry_config("staging", true),
            ],
            "default",
        );
        let directory = RegistryDirectory::from_config(&config).unwrap();

        let default_client = Arc::new(MockRegistryClient::new());
        let staging_client = Arc::new(MockRegistryClient::new());

        let mut clients: HashMap<String, Arc<dyn RegistryClient>> = HashMap::new();
        clients.insert("default".to_string(), default_client.clone());
        clients.insert("staging".to_string(), staging_client.clone());

        let gateway = Gateway::with_clients(
            directory,
            PolicyEnforcer::new(false),
            Dispatcher::new(Duration::from_millis(100), 2)
                .with_backoff_base(Duration::from_millis(1)),
            clients,
        );

        (gateway, default_client, staging_client)
    }

    #[tokio::test]
    async fn test_successful_dispatch_to_default() {
        let (gateway, default_client, _) = test_gateway();
        default_client.push_ok(json!({"id": 5}));

        let request = OperationRequest::new(
            OperationKind::GetSchema,
            None,
            None,
            json!({"subject": "orders-value"}),
        );
        let result = gateway.handle(&request, &[Scope::Read]).await.unwrap();

        assert!(result.is_success());
        assert_eq!(result.registry.as_deref(), Some("default"));
        assert_eq!(result.payload, Some(json!({"id": 5})));
        // Omitted context dispatches against the root context.
        assert_eq!(default_client.calls()[0].1, ".");
    }

    #[tokio::test]
    async fn test_read_only_registry_denied_before_network() {
        let (gateway, _, staging_client) = test_gateway();

        let request = OperationRequest::new(
            OperationKind::RegisterSchema,
            Some("staging"),
            None,
            json!({"subject": "orders-value", "schema": "{}"}),
        );
        let err = gateway
            .handle(&request, &[Scope::Read, Scope::Write, Scope::Admin])
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "read_only_registry");
        // The upstream never observed the write attempt.
        assert_eq!(staging_client.call_count(), 0);
    }

    #[tokio::test]
    async fn test_insufficient_scope_denied_before_network() {
        let (gateway, default_client, _) = test_gateway();

        let request = OperationRequest::new(
            OperationKind::DeleteSubject,
            None,
            None,
            json!({"subject": "orders-value"}),
        );
        let err = gateway.handle(&request, &[Scope::Read]).await.unwrap_err();

        assert_eq!(err.kind(), "insufficient_scope");
        assert_eq!(default_client.call_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_registry() {
        let (gateway, _, _) = test_gateway();

        let request =
            OperationRequest::new(OperationKind::ListSubjects, Some("production"), None, json!({}));
        let err = gateway.handle(&request, &[Scope::Read]).await.unwrap_err();

        assert_eq!(err.kind(), "unknown_registry");
    }

    #[tokio::test]
    async fn test_context_passed_through() {
        let (gateway, default_client, _) = test_gateway();
        default_client.push_ok(json!([]));

        let request =
            OperationRequest::new(OperationKind::ListSubjects, None, Some("orders"), json!({}));
        gateway.handle(&request, &[Scope::Read]).await.unwrap();

        assert_eq!(default_client.calls()[0].1, "orders");
    }

    #[tokio::test]
    async fn test_repeated_get_is_idempotent() {
        let (gateway, default_client, _) = test_gateway();
        default_client.push_ok(json!({"id": 5, "version": 3}));
        default_client.push_ok(json!({"id": 5, "version": 3}));

        let request = OperationRequest::new(
            OperationKind::GetSchema,
            None,
            None,
            json!({"subject": "orders-value"}),
        );
        let first = gateway.handle(&request, &[Scope::Read]).await.unwrap();
        let second = gateway.handle(&request, &[Scope::Read]).await.unwrap();

        assert_eq!(first.payload, second.payload);
    }

    #[tokio::test]
    async fn test_global_read_only_mode() {
        let config = test_config(vec![registry_config("default", false)], "default");
        let directory = RegistryDirectory::from_config(&config).unwrap();
        let client = Arc::new(MockRegistryClient::new());
        let mut clients: HashMap<String, Arc<dyn RegistryClient>> = HashMap::new();
        clients.insert("default".to_string(), client.clone());

        let gateway = Gateway::with_clients(
            directory,
            PolicyEnforcer::new(true),
            Dispatcher::new(Duration::from_millis(100), 2),
            clients,
        );

        let request = OperationRequest::new(
            OperationKind::RegisterSchema,
            None,
            None,
            json!({"subject": "orders-value", "schema": "{}"}),
        );
        let err = gateway.handle(&request, &[Scope::Write]).await.unwrap_err();

        assert_eq!(err.kind(), "read_only_mode");
        assert_eq!(client.call_count(), 0);
    }
}
