mod batch;
mod compat;
mod export;
mod health;
mod import;
mod invoke;
mod registries;

pub use batch::run_batch;
pub use compat::compat_check;
pub use export::export_context;
pub use health::health_check;
pub use import::import_context;
pub use invoke::invoke;
pub use registries::list_registries;

use crate::gateway::Gateway;
use std::time::Instant;

/// Shared state for all gateway endpoints.
pub struct GatewayState {
    pub gateway: Gateway,
    pub start_time: Instant,
}

impl GatewayState {
    pub fn new(gateway: Gateway) -> Self {
        Self {
            gateway,
            start_time: Instant::now(),
        }
    }
}
