// Board action commands. Each one delegates to the action service, then
// answers with the refreshed task card fragment and an `Hx-Trigger` so the
// client can refresh dependent fragments.
use axum::{
    extract::State,
    response::{Html, IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extract::{Json, Path};
use crate::middleware::auth::CurrentUser;
use crate::models::{Task, TaskPriority, TaskStatus};
use crate::render::{fragments, TaskCardView};

#[derive(Debug, Default, Deserialize)]
pub struct ActionRequest {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub assignee_id: Option<Uuid>,
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub title: String,
}

fn required<T>(value: Option<T>, field: &str) -> Result<T, ApiError> {
    value.ok_or_else(|| ApiError::invalid_field(field, format!("{field} is required")))
}

/// POST /partials/tasks/:id/actions/:action - run one board command
///
/// Known actions: change-status, set-priority, assign-user, set-due-date,
/// close, reopen, rename.
pub async fn run_action(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((id, action)): Path<(Uuid, String)>,
    Json(body): Json<ActionRequest>,
) -> Result<Response, ApiError> {
    let detail = state.task_detail.get_detail(id).await?;
    if !user.is_system_admin
        && state.members.get_role(detail.workspace_id, user.user_id).await?.is_none()
    {
        return Err(ApiError::access_denied("not a member of this workspace"));
    }

    let actor = user.user_id;
    let task: Task = match action.as_str() {
        "change-status" => {
            let raw = required(body.status, "status")?;
            let status: TaskStatus = raw.parse().map_err(|_| {
                ApiError::invalid_field("status", format!("unrecognized status '{raw}'"))
            })?;
            state.actions.change_status(id, actor, status).await?
        }
        "set-priority" => {
            let raw = required(body.priority, "priority")?;
            let priority: TaskPriority = raw.parse().map_err(|_| {
                ApiError::invalid_field("priority", format!("unrecognized priority '{raw}'"))
            })?;
            state.actions.set_priority(id, actor, priority).await?
        }
        "assign-user" => state.actions.assign_user(id, actor, body.assignee_id).await?,
        "set-due-date" => state.actions.set_due_date(id, actor, body.due_date).await?,
        "close" => state.actions.close(id, actor).await?,
        "reopen" => state.actions.reopen(id, actor).await?,
        "rename" => {
            if body.title.is_empty() {
                return Err(ApiError::invalid_field("title", "title is required"));
            }
            state.actions.rename(id, actor, &body.title).await?
        }
        other => {
            return Err(ApiError::invalid_field(
                "action",
                format!("unrecognized action '{other}'"),
            ))
        }
    };

    let view = TaskCardView::from_task(&task, Utc::now());
    let data = serde_json::to_value(&view).map_err(|e| {
        tracing::error!("failed to serialize task card: {}", e);
        ApiError::internal("render")
    })?;
    let html = state.renderer.render(fragments::TASK_CARD, &data)?;

    Ok(([("Hx-Trigger", "chatUpdated")], Html(html)).into_response())
}
