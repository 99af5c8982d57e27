//! Pool management endpoints
//!
//! - `GET /pools` lists live pools
//! - `POST /pools/clear` closes every pool (forces reconnection, e.g. after
//!   a credential rotation)
//! - `POST /pools/{role}` builds the pool for `primary` or `read-only` now
//!   instead of on first use

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use tenantpool_core::{ClearReport, PoolFactory, PoolKey, PoolRegistry, PoolSummary};

use crate::http::error::ApiError;
use crate::http::extractors::Role;

/// GET /pools
async fn list_pools<F: PoolFactory>(
    State(registry): State<Arc<PoolRegistry<F>>>,
) -> Json<Vec<PoolSummary>> {
    Json(registry.describe())
}

/// POST /pools/clear
async fn clear_pools<F: PoolFactory>(
    State(registry): State<Arc<PoolRegistry<F>>>,
) -> Json<ClearReport> {
    tracing::info!("Pool clear requested via management API");
    Json(registry.clear_all().await)
}

/// POST /pools/{role}
async fn warm_pool<F: PoolFactory>(
    State(registry): State<Arc<PoolRegistry<F>>>,
    role: Role,
) -> Result<Json<PoolSummary>, ApiError> {
    let key = PoolKey::new(registry.tenant(), role.read_only);
    registry.get_for(&key).await?;

    let summary = registry.summary(&key).ok_or_else(|| ApiError::Conflict {
        message: "pools were cleared while this request was running".into(),
    })?;
    Ok(Json(summary))
}

/// Pool routes
pub fn router<F: PoolFactory>() -> Router<Arc<PoolRegistry<F>>> {
    Router::new()
        .route("/pools", get(list_pools::<F>))
        .route("/pools/clear", post(clear_pools::<F>))
        .route("/pools/{role}", post(warm_pool::<F>))
}
