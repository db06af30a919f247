// HTML fragment endpoints for the hypermedia client. Each handler assembles
// typed view data, hands it to the fragment renderer and answers
// `text/html; charset=utf-8`.
use axum::{extract::State, response::Html};
use chrono::Utc;
use futures::try_join;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extract::{Path, Query};
use crate::middleware::auth::{AuthUser, CurrentUser};
use crate::models::{TaskStatus, TaskPriority};
use crate::pagination::Pagination;
use crate::render::{
    fragments, BoardColumnView, BoardView, EditFormView, TaskCardView, TaskSidebarView,
    TimelineView, TIMELINE_LIMIT,
};
use crate::services::BoardFilter;

/// Tasks fetched per column on the initial grid load.
pub const COLUMN_PAGE_SIZE: i64 = 20;

#[derive(Debug, Default, Deserialize)]
pub struct BoardQuery {
    pub filter: Option<String>,
    pub assignee: Option<String>,
    pub priority: Option<String>,
    pub search: Option<String>,
}

impl BoardQuery {
    /// Translate the stable query names into the service-side filter.
    fn to_filter(&self, caller: &AuthUser) -> Result<BoardFilter, ApiError> {
        let mut filter = BoardFilter::default();

        match self.filter.as_deref() {
            None | Some("all") => {}
            Some("unassigned") => filter.unassigned = true,
            Some("overdue") => filter.overdue_only = true,
            Some(other) => {
                return Err(ApiError::invalid_field(
                    "filter",
                    format!("unrecognized filter '{other}'"),
                ))
            }
        }

        match self.assignee.as_deref() {
            None => {}
            Some("me") => filter.assignee_id = Some(caller.user_id),
            Some(raw) => {
                let id = Uuid::parse_str(raw).map_err(|_| {
                    ApiError::invalid_field("assignee", format!("invalid assignee id '{raw}'"))
                })?;
                filter.assignee_id = Some(id);
            }
        }

        if let Some(raw) = self.priority.as_deref() {
            let priority: TaskPriority = raw.parse().map_err(|_| {
                ApiError::invalid_field("priority", format!("unrecognized priority '{raw}'"))
            })?;
            filter.priority = Some(priority);
        }

        filter.search = self.search.clone().filter(|s| !s.is_empty());
        Ok(filter)
    }
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

fn render<V: Serialize>(state: &AppState, name: &str, view: &V) -> Result<Html<String>, ApiError> {
    let data = serde_json::to_value(view).map_err(|e| {
        tracing::error!("failed to serialize view data for '{}': {}", name, e);
        ApiError::internal("render")
    })?;
    Ok(Html(state.renderer.render(name, &data)?))
}

async fn load_column(
    state: &AppState,
    workspace_id: Uuid,
    status: TaskStatus,
    filter: &BoardFilter,
    limit: i64,
    offset: i64,
) -> Result<BoardColumnView, ApiError> {
    let (tasks, total) = try_join!(
        state.board_tasks.list_column(workspace_id, status, filter, limit, offset),
        state.board_tasks.count_column(workspace_id, status, filter),
    )?;
    Ok(BoardColumnView::build(status, &tasks, total, offset, Utc::now()))
}

/// GET /partials/workspaces/:wid/board - the full grid, four fixed columns
pub async fn board_grid(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(workspace_id): Path<Uuid>,
    Query(query): Query<BoardQuery>,
) -> Result<Html<String>, ApiError> {
    let filter = query.to_filter(&user)?;
    require_workspace_member(&state, &user, workspace_id).await?;

    let [todo, in_progress, in_review, done] = TaskStatus::board_columns();
    let (todo, in_progress, in_review, done) = try_join!(
        load_column(&state, workspace_id, todo, &filter, COLUMN_PAGE_SIZE, 0),
        load_column(&state, workspace_id, in_progress, &filter, COLUMN_PAGE_SIZE, 0),
        load_column(&state, workspace_id, in_review, &filter, COLUMN_PAGE_SIZE, 0),
        load_column(&state, workspace_id, done, &filter, COLUMN_PAGE_SIZE, 0),
    )?;

    let view = BoardView { workspace_id, columns: vec![todo, in_progress, in_review, done] };
    render(&state, fragments::BOARD_GRID, &view)
}

/// GET /partials/workspaces/:wid/board/:status - one column page ("load more")
pub async fn board_column(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((workspace_id, status)): Path<(Uuid, String)>,
    Query(query): Query<BoardQuery>,
    pagination: Pagination,
) -> Result<Html<String>, ApiError> {
    let status: TaskStatus = status
        .parse()
        .map_err(|_| ApiError::invalid_field("status", format!("unrecognized status '{status}'")))?;
    let filter = query.to_filter(&user)?;
    require_workspace_member(&state, &user, workspace_id).await?;

    let view =
        load_column(&state, workspace_id, status, &filter, pagination.limit, pagination.offset)
            .await?;
    render(&state, fragments::BOARD_COLUMN, &view)
}

/// GET /partials/tasks/:id/card
pub async fn task_card(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Html<String>, ApiError> {
    let detail = state.task_detail.get_detail(id).await?;
    require_workspace_member(&state, &user, detail.workspace_id).await?;
    let view = TaskCardView::from_task(&detail.task, Utc::now());
    render(&state, fragments::TASK_CARD, &view)
}

/// GET /partials/tasks/:id/sidebar
pub async fn task_sidebar(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Html<String>, ApiError> {
    let detail = state.task_detail.get_detail(id).await?;
    require_workspace_member(&state, &user, detail.workspace_id).await?;
    let chat = state.chat_info.get_basic_info(detail.task.chat_id).await?;
    let view = TaskSidebarView::build(&detail, &chat, Utc::now());
    render(&state, fragments::TASK_SIDEBAR, &view)
}

/// GET /partials/tasks/:id/timeline - most recent 50 events, newest first
pub async fn task_timeline(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Html<String>, ApiError> {
    let detail = state.task_detail.get_detail(id).await?;
    require_workspace_member(&state, &user, detail.workspace_id).await?;

    let events = state.task_events.list_recent(id, TIMELINE_LIMIT as i64).await?;
    let view = TimelineView::build(id, &events);
    render(&state, fragments::TASK_TIMELINE, &view)
}

/// GET /partials/tasks/:id/edit/:field - inline edit form for one field
pub async fn task_edit_form(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((id, field)): Path<(Uuid, String)>,
) -> Result<Html<String>, ApiError> {
    let detail = state.task_detail.get_detail(id).await?;
    require_workspace_member(&state, &user, detail.workspace_id).await?;

    let value = match field.as_str() {
        "title" => detail.task.title.clone(),
        "due_date" => detail.task.due_date.map(|d| d.to_rfc3339()).unwrap_or_default(),
        other => {
            return Err(ApiError::invalid_field(
                "field",
                format!("field '{other}' is not editable inline"),
            ))
        }
    };

    let view = EditFormView { task_id: id, field, value, version: detail.task.version };
    render(&state, fragments::TASK_EDIT_FORM, &view)
}
