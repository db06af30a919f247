use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::app::AppState;
use crate::error::ApiError;
use crate::extract::Json;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::models::User;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub redirect_uri: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: User,
}

/// POST /auth/login - exchange an identity-provider code for a token pair
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> ApiResult<LoginResponse> {
    if body.code.is_empty() {
        return Err(ApiError::validation("code is required"));
    }
    if body.redirect_uri.is_empty() {
        return Err(ApiError::validation("redirect_uri is required"));
    }

    let outcome = state.auth.login(&body.code, &body.redirect_uri).await?;
    tracing::debug!(user = %outcome.user.username, "login succeeded");

    Ok(ApiResponse::success(LoginResponse {
        access_token: outcome.tokens.access_token,
        refresh_token: outcome.tokens.refresh_token,
        user: outcome.user,
    }))
}
