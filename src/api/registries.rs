use crate::api::GatewayState;
use crate::directory::RegistrySummary;
use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize)]
pub struct RegistriesResponse {
    pub default: String,
    pub registries: Vec<RegistrySummary>,
}

/// List the configured registries. Credentials are never exposed.
pub async fn list_registries(State(state): State<Arc<GatewayState>>) -> Json<RegistriesResponse> {
    let directory = state.gateway.directory();
    Json(RegistriesResponse {
        default: directory.default_name().to_string(),
        registries: directory.summaries(),
    })
}
