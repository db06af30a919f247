use axum::extract::State;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::auth::CurrentUser;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::models::User;
use crate::services::{Family, ServiceError};

/// POST /auth/logout - terminate the caller's session
///
/// Logout is idempotent: a session that is already gone still answers 200.
pub async fn logout(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Value> {
    match state.auth.logout(user.user_id).await {
        Ok(()) | Err(ServiceError::NotFound(Family::Session)) => {
            Ok(ApiResponse::success(json!({ "logged_out": true })))
        }
        Err(ServiceError::Internal { action: _, source }) => {
            Err(ServiceError::internal("logout", source).into())
        }
        Err(other) => Err(other.into()),
    }
}

/// GET /auth/me - profile of the authenticated caller
pub async fn me(State(state): State<AppState>, CurrentUser(user): CurrentUser) -> ApiResult<User> {
    let profile = state
        .users
        .find_by_id(user.user_id)
        .await?
        .ok_or(ApiError::not_found(Family::User))?;
    Ok(ApiResponse::success(profile))
}
