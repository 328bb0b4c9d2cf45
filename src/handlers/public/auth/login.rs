// handlers/public/auth/login.rs - POST /api/login

use axum::extract::State;

use crate::api::ApiJson;
use crate::middleware::{ApiResponse, ApiResult};
use crate::server::AppState;
use crate::services::{LoginRequest, LoginSuccess};

/// POST /api/login - exchange username-or-email and password for a token
///
/// Input: `{ "username": "alice", "password": "secret1" }` (username may be an email)
///
/// Output: `{ "success": true, "message", "user": {id, username, email, role, isAdmin}, "token" }`
///
/// Errors: 400 missing fields, 401 invalid credentials, 403 inactive account.
pub async fn login_post(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> ApiResult<LoginSuccess> {
    let success = state.auth.login(payload).await?;
    Ok(ApiResponse::success(success))
}
