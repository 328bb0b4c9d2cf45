// handlers/public/health.rs - GET /api/health, GET /api/test-db

use axum::extract::State;
use serde::Serialize;

use crate::database::Store;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct HealthBody {
    pub status: &'static str,
    pub message: &'static str,
    pub database: &'static str,
    pub backend: &'static str,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize)]
pub struct Message {
    pub message: &'static str,
}

/// Liveness. Always 200; storage reachability is reported, not enforced.
pub async fn health(State(state): State<AppState>) -> ApiResponse<HealthBody> {
    let database = match state.store.ping().await {
        Ok(()) => "ok",
        Err(e) => {
            tracing::warn!("Health check could not reach storage: {}", e);
            "unavailable"
        }
    };

    ApiResponse::success(HealthBody {
        status: "OK",
        message: "Server is running",
        database,
        backend: state.store.backend_name(),
        timestamp: chrono::Utc::now(),
    })
}

pub async fn test_db(State(state): State<AppState>) -> ApiResult<Message> {
    match state.store.ping().await {
        Ok(()) => Ok(ApiResponse::success(Message {
            message: "Database connection successful",
        })),
        Err(e) => {
            tracing::error!("Database connection test failed: {}", e);
            Err(ApiError::internal_server_error("Database connection failed"))
        }
    }
}
