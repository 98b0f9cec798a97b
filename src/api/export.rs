use crate::api::GatewayState;
use crate::batch::{BatchJob, BatchOrchestrator};
use crate::error::Result;
use crate::policy::Scope;
use axum::{extract::State, Json};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct ExportRequest {
    #[serde(default)]
    pub registry: Option<String>,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub scopes: Vec<Scope>,
}

/// Export every subject of a context: latest schema plus compatibility
/// level per subject, wrapped with export metadata.
pub async fn export_context(
    State(state): State<Arc<GatewayState>>,
    Json(request): Json<ExportRequest>,
) -> Result<Json<BatchJob>> {
    info!(
        "Export requested (registry: {:?}, context: {:?})",
        request.registry, request.context
    );

    let job = BatchOrchestrator::new(&state.gateway)
        .export_context(
            request.registry.as_deref(),
            request.context.as_deref(),
            &request.scopes,
        )
        .await?;

    Ok(Json(job))
}
