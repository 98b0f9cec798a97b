use crate::api::GatewayState;
use crate::batch::{BatchJob, BatchOrchestrator};
use crate::error::{GatewayError, Result};
use crate::gateway::OperationRequest;
use crate::policy::Scope;
use axum::{extract::State, Json};
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub items: Vec<OperationRequest>,
    #[serde(default)]
    pub scopes: Vec<Scope>,
    #[serde(default)]
    pub stop_on_first_failure: bool,
}

pub async fn run_batch(
    State(state): State<Arc<GatewayState>>,
    Json(request): Json<BatchRequest>,
) -> Result<Json<BatchJob>> {
    if request.items.is_empty() {
        return Err(GatewayError::InvalidRequest {
            message: "batch contains no items".to_string(),
        });
    }

    debug!(
        "Batch: {} item(s), stop_on_first_failure={}",
        request.items.len(),
        request.stop_on_first_failure
    );

    let job = BatchOrchestrator::new(&state.gateway)
        .run(request.items, &request.scopes, request.stop_on_first_failure)
        .await;

    Ok(Json(job))
}
