use axum::extract::State;
use serde::Deserialize;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extract::{Json, Path};
use crate::middleware::auth::{AuthUser, CurrentUser};
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::models::Workspace;
use crate::pagination::Pagination;

pub const NAME_MAX_CHARS: usize = 100;
pub const DESCRIPTION_MAX_CHARS: usize = 500;

#[derive(Debug, Deserialize)]
pub struct WorkspaceRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Shared create/update field validation: name 1..100, description 0..500.
fn validate_fields(body: &WorkspaceRequest) -> Result<(), ApiError> {
    let name_chars = body.name.chars().count();
    if name_chars == 0 {
        return Err(ApiError::invalid_field("name", "name is required"));
    }
    if name_chars > NAME_MAX_CHARS {
        return Err(ApiError::invalid_field(
            "name",
            format!("name must be at most {NAME_MAX_CHARS} characters"),
        ));
    }
    if body.description.chars().count() > DESCRIPTION_MAX_CHARS {
        return Err(ApiError::invalid_field(
            "description",
            format!("description must be at most {DESCRIPTION_MAX_CHARS} characters"),
        ));
    }
    Ok(())
}

/// Role check shared by the mutating endpoints.
async fn require_manage(state: &AppState, user: &AuthUser, workspace_id: Uuid) -> Result<(), ApiError> {
    if user.is_system_admin {
        return Ok(());
    }
    match state.members.get_role(workspace_id, user.user_id).await? {
        Some(role) if role.can_manage() => Ok(()),
        Some(_) => Err(ApiError::insufficient_privilege("workspace admin role required")),
        None => Err(ApiError::access_denied("not a member of this workspace")),
    }
}

/// POST /workspaces - create a workspace, caller becomes owner
pub async fn create_workspace(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<WorkspaceRequest>,
) -> ApiResult<Workspace> {
    validate_fields(&body)?;
    let workspace = state.workspaces.create(user.user_id, &body.name, &body.description).await?;
    tracing::debug!(workspace = %workspace.id, owner = %user.user_id, "workspace created");
    Ok(ApiResponse::created(workspace))
}

/// GET /workspaces - workspaces the caller belongs to; system admins see all
pub async fn list_workspaces(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    pagination: Pagination,
) -> ApiResult<Vec<Workspace>> {
    let workspaces = if user.is_system_admin {
        state.workspaces.list_all(pagination.limit, pagination.offset).await?
    } else {
        state.workspaces.list_for_user(user.user_id, pagination.limit, pagination.offset).await?
    };
    Ok(ApiResponse::success(workspaces))
}

/// GET /workspaces/:id - single workspace, members only
pub async fn get_workspace(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Workspace> {
    let workspace = state.workspaces.get(id).await?;
    if !user.is_system_admin && state.members.get_role(id, user.user_id).await?.is_none() {
        return Err(ApiError::access_denied("not a member of this workspace"));
    }
    Ok(ApiResponse::success(workspace))
}

/// PUT /workspaces/:id - rename/describe, admin or owner
pub async fn update_workspace(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(body): Json<WorkspaceRequest>,
) -> ApiResult<Workspace> {
    validate_fields(&body)?;
    require_manage(&state, &user, id).await?;
    let workspace = state.workspaces.update(id, &body.name, &body.description).await?;
    Ok(ApiResponse::success(workspace))
}

/// DELETE /workspaces/:id - owner or system admin only
pub async fn delete_workspace(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    if !user.is_system_admin && !state.members.is_owner(id, user.user_id).await? {
        return Err(ApiError::insufficient_privilege("only the owner can delete a workspace"));
    }
    state.workspaces.delete(id).await?;
    Ok(ApiResponse::<()>::no_content())
}
