use crate::api::GatewayState;
use crate::batch::{BatchJob, BatchOrchestrator};
use crate::error::{GatewayError, Result};
use crate::policy::Scope;
use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    #[serde(default)]
    pub registry: Option<String>,
    #[serde(default)]
    pub context: Option<String>,
    /// One entry per subject: {subject, schema, schemaType?, compatibility?}.
    pub subjects: Vec<Value>,
    #[serde(default)]
    pub scopes: Vec<Scope>,
    #[serde(default)]
    pub stop_on_first_failure: bool,
}

/// Import a set of subjects into a context, registering each provided
/// schema in order.
pub async fn import_context(
    State(state): State<Arc<GatewayState>>,
    Json(request): Json<ImportRequest>,
) -> Result<Json<BatchJob>> {
    if request.subjects.is_empty() {
        return Err(GatewayError::InvalidRequest {
            message: "import contains no subjects".to_string(),
        });
    }

    info!(
        "Import requested: {} subject(s) (registry: {:?}, context: {:?})",
        request.subjects.len(),
        request.registry,
        request.context
    );

    let job = BatchOrchestrator::new(&state.gateway)
        .import_context(
            request.registry.as_deref(),
            request.context.as_deref(),
            request.subjects,
            &request.scopes,
            request.stop_on_first_failure,
        )
        .await;

    Ok(Json(job))
}
