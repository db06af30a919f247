use axum::extract::State;
use serde::Deserialize;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extract::{Json, Path};
use crate::middleware::auth::CurrentUser;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::models::{Message, MAX_MESSAGE_CHARS};
use crate::pagination::Pagination;

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    #[serde(default)]
    pub content: String,
    pub reply_to_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct EditMessageRequest {
    #[serde(default)]
    pub content: String,
}

fn validate_content(content: &str) -> Result<(), ApiError> {
    let chars = content.chars().count();
    if chars == 0 {
        return Err(ApiError::invalid_field("content", "content is required"));
    }
    if chars > MAX_MESSAGE_CHARS {
        return Err(ApiError::invalid_field(
            "content",
            format!("content must be at most {MAX_MESSAGE_CHARS} characters"),
        ));
    }
    Ok(())
}

/// POST /chats/:cid/messages - append a message; participants only, reply
/// targets must live in the same chat
pub async fn send_message(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(chat_id): Path<Uuid>,
    Json(body): Json<SendMessageRequest>,
) -> ApiResult<Message> {
    validate_content(&body.content)?;
    let message =
        state.messages.send(chat_id, user.user_id, &body.content, body.reply_to_id).await?;
    Ok(ApiResponse::created(message))
}

/// GET /chats/:cid/messages - newest first; tombstoned envelopes included
pub async fn list_messages(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(chat_id): Path<Uuid>,
    pagination: Pagination,
) -> ApiResult<Vec<Message>> {
    // visibility check rides on the chat fetch
    state.chats.get(chat_id, user.user_id).await?;
    let messages = state.messages.list(chat_id, pagination.limit, pagination.offset).await?;
    Ok(ApiResponse::success(messages))
}

/// PUT /messages/:id - edit, author only
pub async fn edit_message(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(body): Json<EditMessageRequest>,
) -> ApiResult<Message> {
    validate_content(&body.content)?;
    let message = state.messages.edit(id, user.user_id, &body.content).await?;
    Ok(ApiResponse::success(message))
}

/// DELETE /messages/:id - tombstone, author only
pub async fn delete_message(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    state.messages.delete(id, user.user_id).await?;
    Ok(ApiResponse::<()>::no_content())
}
