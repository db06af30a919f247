use axum::extract::State;
use serde::Deserialize;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extract::Json;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::services::TokenPair;

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh_token: String,
}

/// POST /auth/refresh - trade a refresh token for a new pair
pub async fn refresh(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> ApiResult<TokenPair> {
    if body.refresh_token.is_empty() {
        return Err(ApiError::validation("refresh_token is required"));
    }

    let pair = state.auth.refresh_token(&body.refresh_token).await?;
    Ok(ApiResponse::success(pair))
}
