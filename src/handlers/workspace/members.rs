use axum::extract::State;
use serde::Deserialize;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extract::{Json, Path};
use crate::middleware::auth::CurrentUser;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::models::{WorkspaceMember, WorkspaceRole};
use crate::pagination::Pagination;

#[derive(Debug, Deserialize)]
pub struct AddMemberRequest {
    pub user_id: Uuid,
    #[serde(default)]
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    #[serde(default)]
    pub role: String,
}

/// Parse a member-API role. The owner role is never accepted here, not even
/// from system admins.
fn parse_assignable_role(raw: &str) -> Result<WorkspaceRole, ApiError> {
    let role: WorkspaceRole = raw
        .parse()
        .map_err(|_| ApiError::invalid_field("role", format!("unrecognized role '{raw}'")))?;
    if role == WorkspaceRole::Owner {
        return Err(ApiError::invalid_field("role", "the owner role cannot be assigned"));
    }
    Ok(role)
}

/// GET /workspaces/:id/members - member list with roles
pub async fn list_members(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    pagination: Pagination,
) -> ApiResult<Vec<WorkspaceMember>> {
    if !user.is_system_admin && state.members.get_role(id, user.user_id).await?.is_none() {
        return Err(ApiError::access_denied("not a member of this workspace"));
    }
    let members = state.members.list_members(id, pagination.limit, pagination.offset).await?;
    Ok(ApiResponse::success(members))
}

/// POST /workspaces/:id/members - add a member, admin or owner only
pub async fn add_member(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(body): Json<AddMemberRequest>,
) -> ApiResult<WorkspaceMember> {
    let role = parse_assignable_role(&body.role)?;
    if !user.is_system_admin {
        match state.members.get_role(id, user.user_id).await? {
            Some(caller_role) if caller_role.can_manage() => {}
            Some(_) => {
                return Err(ApiError::insufficient_privilege("workspace admin role required"))
            }
            None => return Err(ApiError::access_denied("not a member of this workspace")),
        }
    }
    let member = state.members.add_member(id, body.user_id, role).await?;
    Ok(ApiResponse::created(member))
}

/// DELETE /workspaces/:id/members/:user_id - admin, or the member themselves
pub async fn remove_member(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((id, member_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<()> {
    let removing_self = member_id == user.user_id;
    if !removing_self && !user.is_system_admin {
        match state.members.get_role(id, user.user_id).await? {
            Some(caller_role) if caller_role.can_manage() => {}
            Some(_) => {
                return Err(ApiError::insufficient_privilege("workspace admin role required"))
            }
            None => return Err(ApiError::access_denied("not a member of this workspace")),
        }
    }
    // The owner is immutable through this API; the service refuses with 400.
    state.members.remove_member(id, member_id).await?;
    Ok(ApiResponse::<()>::no_content())
}

/// PUT /workspaces/:id/members/:user_id/role - owner only; never touches the
/// owner role in either direction
pub async fn update_member_role(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((id, member_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<UpdateRoleRequest>,
) -> ApiResult<WorkspaceMember> {
    let role = parse_assignable_role(&body.role)?;
    if !user.is_system_admin && !state.members.is_owner(id, user.user_id).await? {
        return Err(ApiError::insufficient_privilege("only the owner can change member roles"));
    }
    if state.members.is_owner(id, member_id).await? {
        return Err(ApiError::invalid_field("role", "the owner role cannot be changed"));
    }
    let member = state.members.update_role(id, member_id, role).await?;
    Ok(ApiResponse::success(member))
}
