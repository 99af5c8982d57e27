//! Health check endpoint

use std::sync::Arc;

use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;
use tenantpool_core::{PoolFactory, PoolRegistry};

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub tenant: String,
    /// Pools currently held by the registry
    pub pools: usize,
}

/// GET /health
async fn health<F: PoolFactory>(
    State(registry): State<Arc<PoolRegistry<F>>>,
) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        tenant: registry.tenant().to_string(),
        pools: registry.len(),
    })
}

/// Health routes
pub fn router<F: PoolFactory>() -> Router<Arc<PoolRegistry<F>>> {
    Router::new().route("/health", get(health::<F>))
}
