use crate::api::GatewayState;
use crate::error::Result;
use crate::gateway::{OperationRequest, OperationResult};
use crate::policy::Scope;
use axum::{extract::State, Json};
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Deserialize)]
pub struct InvokeRequest {
    #[serde(flatten)]
    pub request: OperationRequest,
    /// Validated caller scopes; identity validation happens upstream of
    /// the gateway.
    #[serde(default)]
    pub scopes: Vec<Scope>,
}

pub async fn invoke(
    State(state): State<Arc<GatewayState>>,
    Json(request): Json<InvokeRequest>,
) -> Result<Json<OperationResult>> {
    debug!(
        "Invoke: {} (registry: {:?}, context: {:?})",
        request.request.operation, request.request.registry, request.request.context
    );

    let result = state.gateway.handle(&request.request, &request.scopes).await?;
    Ok(Json(result))
}
