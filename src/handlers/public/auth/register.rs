// handlers/public/auth/register.rs - POST /api/register

use axum::extract::State;

use crate::api::ApiJson;
use crate::middleware::{ApiResponse, ApiResult};
use crate::server::AppState;
use crate::services::{RegisterRequest, Registered};

/// POST /api/register - create a regular user account
///
/// Input: `{ "username", "email", "password", "confirmPassword" }`
///
/// Output: 201 `{ "success": true, "message", "id" }`; 400 on invalid input,
/// 409 when the username or email is taken.
pub async fn register_post(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> ApiResult<Registered> {
    let registered = state.auth.register(payload).await?;
    Ok(ApiResponse::created(registered))
}
