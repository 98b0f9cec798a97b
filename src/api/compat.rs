use crate::api::GatewayState;
use crate::batch::{BatchJob, BatchOrchestrator};
use crate::error::{GatewayError, Result};
use crate::policy::Scope;
use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Deserialize)]
pub struct CompatCheckRequest {
    #[serde(default)]
    pub registry: Option<String>,
    #[serde(default)]
    pub context: Option<String>,
    /// One entry per subject: {subject, schema, schemaType?, version?}.
    pub subjects: Vec<Value>,
    #[serde(default)]
    pub scopes: Vec<Scope>,
}

/// Check a set of candidate schemas against a target registry, one
/// compatibility verdict per subject.
pub async fn compat_check(
    State(state): State<Arc<GatewayState>>,
    Json(request): Json<CompatCheckRequest>,
) -> Result<Json<BatchJob>> {
    if request.subjects.is_empty() {
        return Err(GatewayError::InvalidRequest {
            message: "compatibility check contains no subjects".to_string(),
        });
    }

    debug!(
        "Compatibility sweep: {} subject(s) against registry {:?}",
        request.subjects.len(),
        request.registry
    );

    let job = BatchOrchestrator::new(&state.gateway)
        .compatibility_sweep(
            request.registry.as_deref(),
            request.context.as_deref(),
            request.subjects,
            &request.scopes,
        )
        .await;

    Ok(Json(job))
}
