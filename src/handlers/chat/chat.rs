use axum::extract::State;
use serde::Deserialize;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extract::{Json, Path, Query};
use crate::middleware::auth::{AuthUser, CurrentUser};
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::models::{Chat, ChatType};
use crate::pagination::Pagination;
use crate::services::{ChatUpdate, NewChat};

pub const TITLE_MAX_CHARS: usize = 100;

#[derive(Debug, Deserialize)]
pub struct CreateChatRequest {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub chat_type: String,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub participant_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateChatRequest {
    #[serde(default)]
    pub name: String,
    /// Present only on the one-way discussion conversion path.
    #[serde(rename = "type")]
    pub chat_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListChatsQuery {
    #[serde(rename = "type")]
    pub chat_type: Option<String>,
}

fn validate_title(name: &str) -> Result<(), ApiError> {
    let chars = name.chars().count();
    if chars == 0 {
        return Err(ApiError::invalid_field("name", "name is required"));
    }
    if chars > TITLE_MAX_CHARS {
        return Err(ApiError::invalid_field(
            "name",
            format!("name must be at most {TITLE_MAX_CHARS} characters"),
        ));
    }
    Ok(())
}

async fn require_workspace_member(
    state: &AppState,
    user: &AuthUser,
    workspace_id: Uuid,
) -> Result<(), ApiError> {
    if !user.is_system_admin
        && state.members.get_role(workspace_id, user.user_id).await?.is_none()
    {
        return Err(ApiError::access_denied("not a member of this workspace"));
    }
    Ok(())
}

/// POST /workspaces/:wid/chats - open a discussion or a task-family chat
pub async fn create_chat(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(workspace_id): Path<Uuid>,
    Json(body): Json<CreateChatRequest>,
) -> ApiResult<Chat> {
    let chat_type: ChatType = body
        .chat_type
        .parse()
        .map_err(|_| ApiError::invalid_field("type", format!("unrecognized chat type '{}'", body.chat_type)))?;
    if chat_type.is_task_family() {
        validate_title(&body.name)?;
    } else if body.name.chars().count() > TITLE_MAX_CHARS {
        return Err(ApiError::invalid_field(
            "name",
            format!("name must be at most {TITLE_MAX_CHARS} characters"),
        ));
    }
    require_workspace_member(&state, &user, workspace_id).await?;

    let chat = state
        .chats
        .create(
            workspace_id,
            user.user_id,
            NewChat {
                chat_type,
                title: (!body.name.is_empty()).then(|| body.name.clone()),
                is_public: body.is_public,
                participant_ids: body.participant_ids,
            },
        )
        .await?;
    tracing::debug!(chat = %chat.id, %chat_type, "chat created");
    Ok(ApiResponse::created(chat))
}

/// GET /workspaces/:wid/chats - workspace chat list, filterable by type
pub async fn list_chats(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(workspace_id): Path<Uuid>,
    Query(query): Query<ListChatsQuery>,
    pagination: Pagination,
) -> ApiResult<Vec<Chat>> {
    let chat_type = match query.chat_type.as_deref() {
        Some(raw) => Some(raw.parse::<ChatType>().map_err(|_| {
            ApiError::invalid_field("type", format!("unrecognized chat type '{raw}'"))
        })?),
        None => None,
    };
    require_workspace_member(&state, &user, workspace_id).await?;

    let chats = state
        .chats
        .list(workspace_id, chat_type, pagination.limit, pagination.offset)
        .await?;
    Ok(ApiResponse::success(chats))
}

/// GET /chats/:id - single chat; participants, or any workspace member when
/// the chat is public
pub async fn get_chat(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Chat> {
    let chat = state.chats.get(id, user.user_id).await?;
    Ok(ApiResponse::success(chat))
}

/// PUT /chats/:id - rename a task-family chat, or convert a discussion into
/// the task family (one-way, acquires a title and `todo` status)
pub async fn update_chat(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateChatRequest>,
) -> ApiResult<Chat> {
    validate_title(&body.name)?;
    let convert_to = match body.chat_type.as_deref() {
        Some(raw) => Some(raw.parse::<ChatType>().map_err(|_| {
            ApiError::invalid_field("type", format!("unrecognized chat type '{raw}'"))
        })?),
        None => None,
    };

    let chat = state.chats.get(id, user.user_id).await?;
    if !chat.is_chat_admin(user.user_id) {
        return Err(ApiError::insufficient_privilege("chat admin role required"));
    }

    let updated =
        state.chats.update(id, ChatUpdate { title: body.name, convert_to }).await?;
    Ok(ApiResponse::success(updated))
}

/// DELETE /chats/:id - chat admins only
pub async fn delete_chat(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    let chat = state.chats.get(id, user.user_id).await?;
    if !chat.is_chat_admin(user.user_id) {
        return Err(ApiError::insufficient_privilege("chat admin role required"));
    }
    state.chats.delete(id).await?;
    Ok(ApiResponse::<()>::no_content())
}
