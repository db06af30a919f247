use axum::extract::State;
use serde::Deserialize;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extract::{Json, Path};
use crate::middleware::auth::CurrentUser;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::models::{Chat, ChatRole};

#[derive(Debug, Deserialize)]
pub struct AddParticipantRequest {
    pub user_id: Uuid,
    #[serde(default)]
    pub role: String,
}

/// POST /chats/:id/participants - add a participant, chat admin only
pub async fn add_participant(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(body): Json<AddParticipantRequest>,
) -> ApiResult<Chat> {
    let role = if body.role.is_empty() {
        ChatRole::Member
    } else {
        body.role
            .parse::<ChatRole>()
            .map_err(|_| ApiError::invalid_field("role", format!("unrecognized role '{}'", body.role)))?
    };

    let chat = state.chats.get(id, user.user_id).await?;
    if !chat.is_chat_admin(user.user_id) {
        return Err(ApiError::insufficient_privilege("chat admin role required"));
    }

    let updated = state.chats.add_participant(id, body.user_id, role).await?;
    Ok(ApiResponse::created(updated))
}

/// DELETE /chats/:id/participants/:user_id - chat admin, or the participant
/// leaving on their own; the creator can never be removed
pub async fn remove_participant(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((id, participant_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<()> {
    let chat = state.chats.get(id, user.user_id).await?;
    let leaving_self = participant_id == user.user_id;
    if !leaving_self && !chat.is_chat_admin(user.user_id) {
        return Err(ApiError::insufficient_privilege("chat admin role required"));
    }

    state.chats.remove_participant(id, participant_id).await?;
    Ok(ApiResponse::<()>::no_content())
}
