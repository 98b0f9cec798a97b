use crate::api::GatewayState;
use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize)]
pub struct RegistryHealth {
    name: String,
    reachable: bool,
}

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    configured_registries: usize,
    registries: Vec<RegistryHealth>,
    uptime_seconds: u64,
}

pub async fn health_check(State(state): State<Arc<GatewayState>>) -> Json<HealthResponse> {
    let probes = state.gateway.probe_registries().await;
    let all_reachable = probes.iter().all(|(_, ok)| *ok);

    Json(HealthResponse {
        status: if all_reachable {
            "healthy".to_string()
        } else {
            "degraded".to_string()
        },
        configured_registries: state.gateway.directory().len(),
        registries: probes
            .into_iter()
            .map(|(name, reachable)| RegistryHealth { name, reachable })
            .collect(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })
}
