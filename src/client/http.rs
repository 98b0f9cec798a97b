//! HTTP client for the Confluent Schema Registry REST API.
//!
//! Subjects, versions, compatibility and config endpoints, addressed
//! through the `/contexts/{context}` prefix for non-root contexts.

use super::{required_str, ClientError, ClientResult, RegistryClient};
use crate::directory::RegistryDescriptor;
use crate::policy::OperationKind;
use crate::resolve::ROOT_CONTEXT;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use tracing::debug;

pub struct HttpRegistryClient {
    name: String,
    base_url: String,
    user: Option<String>,
    password: Option<String>,
    http: reqwest::Client,
}

impl HttpRegistryClient {
    pub fn new(descriptor: &RegistryDescriptor) -> Self {
        Self {
            name: descriptor.name.clone(),
            base_url: descriptor.base_url.clone(),
            user: descriptor.user.clone(),
            password: descriptor.password.clone(),
            http: reqwest::Client::new(),
        }
    }

    /// URL prefix for a schema context. The root context addresses the
    /// registry's top-level endpoints directly.
    fn context_prefix(&self, context: &str) -> String {
        if context == ROOT_CONTEXT {
            self.base_url.clone()
        } else {
            format!("{}/contexts/{}", self.base_url, urlencoding::encode(context))
        }
    }

    fn request(&self, method: reqwest::Method, url: String) -> reqwest::RequestBuilder {
        let mut builder = self.http.request(method, url);
        if let Some(user) = &self.user {
            builder = builder.basic_auth(user, self.password.as_deref());
        }
        builder
    }

    async fn send(&self, builder: reqwest::RequestBuilder) -> ClientResult<Value> {
        let response = builder
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(ClientError::Http {
                status: status.as_u16(),
                body,
            });
        }

        if body.is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&body)
            .map_err(|e| ClientError::Transport(format!("invalid JSON from upstream: {}", e)))
    }

    async fn get(&self, url: String) -> ClientResult<Value> {
        self.send(self.request(reqwest::Method::GET, url)).await
    }

    async fn get_schema(&self, context: &str, payload: &Value) -> ClientResult<Value> {
        let subject = required_str(payload, "subject")?;
        let version = payload
            .get("version")
            .and_then(Value::as_str)
            .unwrap_or("latest");
        let url = format!(
            "{}/subjects/{}/versions/{}",
            self.context_prefix(context),
            urlencoding::encode(subject),
            urlencoding::encode(version)
        );
        self.get(url).await
    }

    async fn list_subjects(&self, context: &str) -> ClientResult<Value> {
        self.get(format!("{}/subjects", self.context_prefix(context)))
            .await
    }

    async fn list_versions(&self, context: &str, payload: &Value) -> ClientResult<Value> {
        let subject = required_str(payload, "subject")?;
        let url = format!(
            "{}/subjects/{}/versions",
            self.context_prefix(context),
            urlencoding::encode(subject)
        );
        self.get(url).await
    }

    async fn get_compatibility(&self, context: &str, payload: &Value) -> ClientResult<Value> {
        let url = match payload.get("subject").and_then(Value::as_str) {
            Some(subject) => format!(
                "{}/config/{}?defaultToGlobal=true",
                self.context_prefix(context),
                urlencoding::encode(subject)
            ),
            None => format!("{}/config", self.context_prefix(context)),
        };
        self.get(url).await
    }

    async fn check_compatibility(&self, context: &str, payload: &Value) -> ClientResult<Value> {
        let subject = required_str(payload, "subject")?;
        let version = payload
            .get("version")
            .and_then(Value::as_str)
            .unwrap_or("latest");
        let url = format!(
            "{}/compatibility/subjects/{}/versions/{}",
            self.context_prefix(context),
            urlencoding::encode(subject),
            urlencoding::encode(version)
        );
        self.send(
            self.request(reqwest::Method::POST, url)
                .json(&schema_body(payload)?),
        )
        .await
    }

    async fn register_schema(&self, context: &str, payload: &Value) -> ClientResult<Value> {
        let subject = required_str(payload, "subject")?;
        let url = format!(
            "{}/subjects/{}/versions",
            self.context_prefix(context),
            urlencoding::encode(subject)
        );
        self.send(
            self.request(reqwest::Method::POST, url)
                .json(&schema_body(payload)?),
        )
        .await
    }

    async fn delete_subject(&self, context: &str, payload: &Value) -> ClientResult<Value> {
        let subject = required_str(payload, "subject")?;
        let permanent = payload
            .get("permanent")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let mut url = format!(
            "{}/subjects/{}",
            self.context_prefix(context),
            urlencoding::encode(subject)
        );
        if permanent {
            url.push_str("?permanent=true");
        }
        self.send(self.request(reqwest::Method::DELETE, url)).await
    }

    async fn update_compatibility(&self, context: &str, payload: &Value) -> ClientResult<Value> {
        let level = required_str(payload, "compatibility")?;
        let url = match payload.get("subject").and_then(Value::as_str) {
            Some(subject) => format!(
                "{}/config/{}",
                self.context_prefix(context),
                urlencoding::encode(subject)
            ),
            None => format!("{}/config", self.context_prefix(context)),
        };
        self.send(
            self.request(reqwest::Method::PUT, url)
                .json(&json!({ "compatibility": level })),
        )
        .await
    }

    /// Import registers a provided schema under a subject and, when the
    /// payload carries a compatibility level, applies it afterwards.
    async fn import_subject(&self, context: &str, payload: &Value) -> ClientResult<Value> {
        let registered = self.register_schema(context, payload).await?;

        if payload.get("compatibility").and_then(Value::as_str).is_some() {
            self.update_compatibility(context, payload).await?;
        }

        Ok(registered)
    }

    async fn delete_context(&self, context: &str) -> ClientResult<Value> {
        let url = format!(
            "{}/contexts/{}",
            self.base_url,
            urlencoding::encode(context)
        );
        self.send(self.request(reqwest::Method::DELETE, url)).await
    }

    /// Fetch a subject's latest schema plus its effective compatibility
    /// level and wrap both with export metadata. A subject without a
    /// per-subject compatibility override exports with `compatibility: null`.
    async fn export_subject(&self, context: &str, payload: &Value) -> ClientResult<Value> {
        let subject = required_str(payload, "subject")?;
        let schema = self.get_schema(context, payload).await?;

        let compatibility = match self.get_compatibility(context, payload).await {
            Ok(config) => config.get("compatibilityLevel").cloned().unwrap_or(Value::Null),
            Err(ClientError::Http { status: 404, .. }) => Value::Null,
            Err(e) => return Err(e),
        };

        Ok(json!({
            "subject": subject,
            "context": context,
            "registry": self.name,
            "exported_at": Utc::now().to_rfc3339(),
            "schema": schema,
            "compatibility": compatibility,
        }))
    }
}

/// Body for register/compatibility endpoints: the schema itself plus its
/// optional type and references, taken verbatim from the caller payload.
fn schema_body(payload: &Value) -> ClientResult<Value> {
    let schema = payload
        .get("schema")
        .ok_or_else(|| ClientError::BadPayload("missing required field 'schema'".to_string()))?;

    let mut body = json!({ "schema": schema_as_string(schema)? });
    if let Some(schema_type) = payload.get("schemaType").or_else(|| payload.get("schema_type")) {
        body["schemaType"] = schema_type.clone();
    }
    if let Some(references) = payload.get("references") {
        body["references"] = references.clone();
    }
    Ok(body)
}

/// The registry wire format carries the schema document as a string; accept
/// either an already-encoded string or an inline JSON document.
fn schema_as_string(schema: &Value) -> ClientResult<String> {
    match schema {
        Value::String(s) => Ok(s.clone()),
        other => serde_json::to_string(other)
            .map_err(|e| ClientError::BadPayload(format!("unserializable schema: {}", e))),
    }
}

#[async_trait]
impl RegistryClient for HttpRegistryClient {
    async fn perform(
        &self,
        kind: OperationKind,
        context: &str,
        payload: &Value,
    ) -> ClientResult<Value> {
        debug!(
            "Registry '{}': {} in context '{}'",
            self.name, kind, context
        );

        match kind {
            OperationKind::GetSchema => self.get_schema(context, payload).await,
            OperationKind::ListSubjects => self.list_subjects(context).await,
            OperationKind::ListVersions => self.list_versions(context, payload).await,
            OperationKind::ListContexts => self.get(format!("{}/contexts", self.base_url)).await,
            OperationKind::GetCompatibility => self.get_compatibility(context, payload).await,
            OperationKind::CheckCompatibility => self.check_compatibility(context, payload).await,
            OperationKind::ExportSubject => self.export_subject(context, payload).await,
            OperationKind::RegisterSchema => self.register_schema(context, payload).await,
            OperationKind::DeleteSubject => self.delete_subject(context, payload).await,
            OperationKind::UpdateCompatibility => self.update_compatibility(context, payload).await,
            OperationKind::ImportSubject => self.import_subject(context, payload).await,
            OperationKind::DeleteContext => self.delete_context(context).await,
        }
    }

    async fn ping(&self) -> ClientResult<()> {
        self.get(format!("{}/subjects", self.base_url)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client() -> HttpRegistryClient {
        HttpRegistryClient::new(&RegistryDescriptor {
            name: "default".to_string(),
            base_url: "http://localhost:8081".to_string(),
            user: None,
            password: None,
            read_only: false,
        })
    }

    #[test]
    fn test_context_prefix() {
        let client = client();
        assert_eq!(client.context_prefix("."), "http://localhost:8081");
        assert_eq!(
            client.context_prefix("orders"),
            "http://localhost:8081/contexts/orders"
        );
        // Context names are percent-encoded in the path.
        assert_eq!(
            client.context_prefix(".prod"),
            "http://localhost:8081/contexts/.prod"
        );
    }

    #[test]
    fn test_schema_body_with_string_schema() {
        let body = schema_body(&json!({
            "schema": "{\"type\":\"string\"}",
            "schemaType": "AVRO",
        }))
        .unwrap();

        assert_eq!(body["schema"], "{\"type\":\"string\"}");
        assert_eq!(body["schemaType"], "AVRO");
        assert!(body.get("references").is_none());
    }

    #[test]
    fn test_schema_body_with_inline_schema() {
        let body = schema_body(&json!({
            "schema": {"type": "record", "name": "Order", "fields": []},
        }))
        .unwrap();

        // Inline documents are serialized to the registry's string format.
        let encoded = body["schema"].as_str().unwrap();
        let decoded: Value = serde_json::from_str(encoded).unwrap();
        assert_eq!(decoded["name"], "Order");
    }

    #[test]
    fn test_schema_body_requires_schema() {
        let err = schema_body(&json!({"subject": "orders-value"})).unwrap_err();
        assert!(matches!(err, ClientError::BadPayload(_)));
    }
}
