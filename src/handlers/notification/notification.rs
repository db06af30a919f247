use axum::extract::State;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::app::AppState;
use crate::extract::{Path, Query};
use crate::middleware::auth::CurrentUser;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::models::NotificationDto;
use crate::pagination::Pagination;

#[derive(Debug, Deserialize)]
pub struct ListNotificationsQuery {
    #[serde(default)]
    pub unread_only: bool,
}

/// GET /notifications - the caller's notifications, newest first
pub async fn list_notifications(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<ListNotificationsQuery>,
    pagination: Pagination,
) -> ApiResult<Vec<NotificationDto>> {
    let notifications = state
        .notifications
        .list(user.user_id, query.unread_only, pagination.limit, pagination.offset)
        .await?;
    Ok(ApiResponse::success(notifications.into_iter().map(NotificationDto::from).collect()))
}

/// GET /notifications/unread/count
pub async fn unread_count(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Value> {
    let count = state.notifications.count_unread(user.user_id).await?;
    Ok(ApiResponse::success(json!({ "count": count })))
}

/// PUT /notifications/:id/read - monotonic; repeats answer 409 ALREADY_READ
pub async fn mark_read(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<NotificationDto> {
    let notification = state.notifications.mark_as_read(id, user.user_id).await?;
    Ok(ApiResponse::success(NotificationDto::from(notification)))
}

/// PUT /notifications/mark-all-read
pub async fn mark_all_read(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Value> {
    let marked = state.notifications.mark_all_as_read(user.user_id).await?;
    Ok(ApiResponse::success(json!({ "marked_count": marked })))
}

/// DELETE /notifications/:id
pub async fn delete_notification(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    state.notifications.delete(id, user.user_id).await?;
    Ok(ApiResponse::<()>::no_content())
}
