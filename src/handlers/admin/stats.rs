// handlers/admin/stats.rs - GET /api/admin/stats

use axum::extract::State;
use serde::Serialize;

use crate::database::{CatalogStats, Store};
use crate::middleware::{ApiResponse, ApiResult};
use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct StatsBody {
    pub data: CatalogStats,
}

pub async fn stats(State(state): State<AppState>) -> ApiResult<StatsBody> {
    let data = state.store.stats().await?;
    Ok(ApiResponse::success(StatsBody { data }))
}
