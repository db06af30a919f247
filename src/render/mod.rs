// Fragment rendering seam for the hypermedia client. Handlers build typed
// view data, serialize it to a JSON bag and hand it to a renderer; the
// default renderer below emits plain HTML so the binary works without an
// external template engine.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::models::{ChatBasicInfo, Task, TaskDetail, TaskEvent, TaskEventKind, TaskStatus, User};

/// Most recent events shown on the activity timeline.
pub const TIMELINE_LIMIT: usize = 50;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("unknown fragment '{0}'")]
    UnknownFragment(String),
    #[error("fragment '{name}' render failed: {message}")]
    Failed { name: String, message: String },
}

/// The single rendering contract this layer depends on. `data` is the
/// serialized view struct for the named fragment.
pub trait FragmentRenderer: Send + Sync {
    fn render(&self, name: &str, data: &Value) -> Result<String, RenderError>;
}

/// Task card as one board tile. The overdue/due-soon flags are derived
/// against the caller's clock when the view is built, never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskCardView {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub title: String,
    pub entity_type: String,
    pub status: TaskStatus,
    pub priority: String,
    pub assignee_id: Option<Uuid>,
    pub due_date: Option<DateTime<Utc>>,
    pub is_overdue: bool,
    pub is_due_soon: bool,
    pub version: i64,
}

impl TaskCardView {
    pub fn from_task(task: &Task, now: DateTime<Utc>) -> Self {
        Self {
            id: task.id,
            chat_id: task.chat_id,
            title: task.title.clone(),
            entity_type: task.entity_type.to_string(),
            status: task.status,
            priority: task.priority.to_string(),
            assignee_id: task.assignee_id,
            due_date: task.due_date,
            is_overdue: task.is_overdue(now),
            is_due_soon: task.is_due_soon(now),
            version: task.version,
        }
    }
}

/// One board column plus its paging state for the "load more" fragment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardColumnView {
    pub status: TaskStatus,
    pub title: String,
    pub tasks: Vec<TaskCardView>,
    pub total: u64,
    pub has_more: bool,
    pub next_offset: i64,
}

impl BoardColumnView {
    pub fn build(
        status: TaskStatus,
        tasks: &[Task],
        total: u64,
        offset: i64,
        now: DateTime<Utc>,
    ) -> Self {
        let cards: Vec<TaskCardView> =
            tasks.iter().map(|t| TaskCardView::from_task(t, now)).collect();
        let next_offset = offset + cards.len() as i64;
        Self {
            status,
            title: status.column_title().to_string(),
            tasks: cards,
            total,
            has_more: (next_offset as u64) < total,
            next_offset,
        }
    }
}

/// The whole board grid: the four fixed columns in display order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardView {
    pub workspace_id: Uuid,
    pub columns: Vec<BoardColumnView>,
}

/// Chat header the sidebar links back to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatHeaderView {
    pub id: Uuid,
    pub title: String,
    #[serde(rename = "type")]
    pub chat_type: String,
}

impl From<&ChatBasicInfo> for ChatHeaderView {
    fn from(chat: &ChatBasicInfo) -> Self {
        Self {
            id: chat.id,
            title: chat.title.clone().unwrap_or_default(),
            chat_type: chat.chat_type.to_string(),
        }
    }
}

/// Task sidebar with full description, the resolved assignee profile and the
/// header of the chat the task belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSidebarView {
    pub task: TaskCardView,
    pub description: String,
    pub workspace_id: Uuid,
    pub assignee: Option<User>,
    pub chat: ChatHeaderView,
}

impl TaskSidebarView {
    pub fn build(detail: &TaskDetail, chat: &ChatBasicInfo, now: DateTime<Utc>) -> Self {
        Self {
            task: TaskCardView::from_task(&detail.task, now),
            description: detail.task.description.clone(),
            workspace_id: detail.workspace_id,
            assignee: detail.assignee.clone(),
            chat: ChatHeaderView::from(chat),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEntryView {
    pub id: Uuid,
    pub kind: TaskEventKind,
    pub actor_id: Uuid,
    pub data: Value,
    pub created_at: DateTime<Utc>,
}

/// Activity timeline: reverse chronological, capped, unknown event kinds
/// silently skipped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineView {
    pub task_id: Uuid,
    pub entries: Vec<TimelineEntryView>,
}

impl TimelineView {
    pub fn build(task_id: Uuid, events: &[TaskEvent]) -> Self {
        let mut entries: Vec<TimelineEntryView> = events
            .iter()
            .filter_map(|event| {
                let kind: TaskEventKind = event.kind.parse().ok()?;
                Some(TimelineEntryView {
                    id: event.id,
                    kind,
                    actor_id: event.actor_id,
                    data: event.data.clone(),
                    created_at: event.created_at,
                })
            })
            .collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        entries.truncate(TIMELINE_LIMIT);
        Self { task_id, entries }
    }
}

/// Inline edit form for one task field (title, due date, ...). `version` is
/// echoed so the action endpoint can detect stale submissions server-side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditFormView {
    pub task_id: Uuid,
    pub field: String,
    pub value: String,
    pub version: i64,
}

/// Fragment names the board surface renders.
pub mod fragments {
    pub const BOARD_GRID: &str = "board/grid";
    pub const BOARD_COLUMN: &str = "board/column";
    pub const TASK_CARD: &str = "board/card";
    pub const TASK_SIDEBAR: &str = "task/sidebar";
    pub const TASK_TIMELINE: &str = "task/timeline";
    pub const TASK_EDIT_FORM: &str = "task/edit-form";
}

/// Minimal built-in renderer. Emits structural HTML with stable ids and
/// classes; a deployment can swap in a template-backed implementation
/// through the same trait.
#[derive(Debug, Default, Clone)]
pub struct HtmlRenderer;

impl FragmentRenderer for HtmlRenderer {
    fn render(&self, name: &str, data: &Value) -> Result<String, RenderError> {
        match name {
            fragments::BOARD_GRID => render_board(data),
            fragments::BOARD_COLUMN => render_column(data),
            fragments::TASK_CARD => render_card(data),
            fragments::TASK_SIDEBAR => render_sidebar(data),
            fragments::TASK_TIMELINE => render_timeline(data),
            fragments::TASK_EDIT_FORM => render_edit_form(data),
            other => Err(RenderError::UnknownFragment(other.to_string())),
        }
    }
}

fn escape(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn str_field<'a>(data: &'a Value, key: &str) -> &'a str {
    data.get(key).and_then(Value::as_str).unwrap_or("")
}

fn render_board(data: &Value) -> Result<String, RenderError> {
    let columns = data.get("columns").and_then(Value::as_array).ok_or_else(|| {
        RenderError::Failed {
            name: fragments::BOARD_GRID.to_string(),
            message: "missing columns".to_string(),
        }
    })?;

    let mut html = format!(r#"<div class="board" data-workspace="{}">"#, str_field(data, "workspace_id"));
    for column in columns {
        html.push_str(&render_column(column)?);
    }
    html.push_str("</div>");
    Ok(html)
}

fn render_column(data: &Value) -> Result<String, RenderError> {
    let status = str_field(data, "status");
    let mut html = format!(
        r#"<section class="board-column" data-status="{}"><h2>{}</h2>"#,
        status,
        escape(str_field(data, "title"))
    );
    if let Some(tasks) = data.get("tasks").and_then(Value::as_array) {
        for task in tasks {
            html.push_str(&render_card(task)?);
        }
    }
    if data.get("has_more").and_then(Value::as_bool).unwrap_or(false) {
        let next_offset = data.get("next_offset").and_then(Value::as_i64).unwrap_or(0);
        html.push_str(&format!(
            r#"<button class="load-more" data-status="{}" data-offset="{}">Load more</button>"#,
            status, next_offset
        ));
    }
    html.push_str("</section>");
    Ok(html)
}

fn render_card(data: &Value) -> Result<String, RenderError> {
    let mut classes = vec!["task-card"];
    if data.get("is_overdue").and_then(Value::as_bool).unwrap_or(false) {
        classes.push("overdue");
    }
    if data.get("is_due_soon").and_then(Value::as_bool).unwrap_or(false) {
        classes.push("due-soon");
    }
    Ok(format!(
        r#"<article class="{}" data-task="{}" data-version="{}"><span class="badge {}">{}</span><h3>{}</h3></article>"#,
        classes.join(" "),
        str_field(data, "id"),
        data.get("version").and_then(Value::as_i64).unwrap_or(0),
        str_field(data, "priority"),
        str_field(data, "entity_type"),
        escape(str_field(data, "title")),
    ))
}

fn render_sidebar(data: &Value) -> Result<String, RenderError> {
    let task = data.get("task").cloned().unwrap_or(Value::Null);
    let chat = data.get("chat").cloned().unwrap_or(Value::Null);
    let assignee = data
        .get("assignee")
        .and_then(|a| a.get("display_name"))
        .and_then(Value::as_str)
        .unwrap_or("Unassigned");
    Ok(format!(
        r#"<aside class="task-sidebar" data-task="{}"><a class="chat-link" href="/chats/{}" data-type="{}">{}</a>{}<p class="description">{}</p><p class="assignee">{}</p></aside>"#,
        str_field(&task, "id"),
        str_field(&chat, "id"),
        str_field(&chat, "type"),
        escape(str_field(&chat, "title")),
        render_card(&task)?,
        escape(str_field(data, "description")),
        escape(assignee),
    ))
}

fn render_timeline(data: &Value) -> Result<String, RenderError> {
    let mut html = format!(r#"<ol class="timeline" data-task="{}">"#, str_field(data, "task_id"));
    if let Some(entries) = data.get("entries").and_then(Value::as_array) {
        for entry in entries {
            html.push_str(&format!(
                r#"<li class="event" data-kind="{}" data-actor="{}"><time>{}</time></li>"#,
                str_field(entry, "kind"),
                str_field(entry, "actor_id"),
                str_field(entry, "created_at"),
            ));
        }
    }
    html.push_str("</ol>");
    Ok(html)
}

fn render_edit_form(data: &Value) -> Result<String, RenderError> {
    let field = str_field(data, "field");
    Ok(format!(
        r#"<form class="inline-edit" data-task="{}" data-field="{}"><input name="{}" value="{}"><input type="hidden" name="version" value="{}"></form>"#,
        str_field(data, "task_id"),
        field,
        field,
        escape(str_field(data, "value")),
        data.get("version").and_then(Value::as_i64).unwrap_or(0),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EntityType, TaskPriority};
    use chrono::Duration;

    fn task(status: TaskStatus, due: Option<DateTime<Utc>>) -> Task {
        Task {
            id: Uuid::new_v4(),
            chat_id: Uuid::new_v4(),
            title: "Fix <login>".into(),
            description: "details".into(),
            entity_type: EntityType::Bug,
            status,
            priority: TaskPriority::High,
            assignee_id: None,
            due_date: due,
            created_at: Utc::now(),
            version: 3,
        }
    }

    fn event(kind: &str, at: DateTime<Utc>) -> TaskEvent {
        TaskEvent {
            id: Uuid::new_v4(),
            task_id: Uuid::new_v4(),
            kind: kind.to_string(),
            actor_id: Uuid::new_v4(),
            data: serde_json::json!({}),
            created_at: at,
        }
    }

    #[test]
    fn card_view_derives_flags_per_request() {
        let now = Utc::now();
        let overdue = TaskCardView::from_task(&task(TaskStatus::Todo, Some(now - Duration::days(1))), now);
        assert!(overdue.is_overdue);
        assert!(!overdue.is_due_soon);

        let soon = TaskCardView::from_task(&task(TaskStatus::Todo, Some(now + Duration::days(2))), now);
        assert!(soon.is_due_soon);
        assert!(!soon.is_overdue);
    }

    #[test]
    fn timeline_caps_orders_and_skips_unknown_kinds() {
        let now = Utc::now();
        let mut events: Vec<TaskEvent> =
            (0..60).map(|i| event("status-changed", now - Duration::minutes(i))).collect();
        events.push(event("sprint-shuffled", now + Duration::minutes(1)));

        let view = TimelineView::build(Uuid::new_v4(), &events);
        assert_eq!(view.entries.len(), TIMELINE_LIMIT);
        // unknown kind dropped even though it is the newest event
        assert!(view.entries.iter().all(|e| e.kind == TaskEventKind::StatusChanged));
        // reverse chronological
        assert!(view.entries.windows(2).all(|w| w[0].created_at >= w[1].created_at));
    }

    #[test]
    fn column_paging_state_tracks_totals() {
        let now = Utc::now();
        let tasks = vec![task(TaskStatus::Todo, None), task(TaskStatus::Todo, None)];
        let column = BoardColumnView::build(TaskStatus::Todo, &tasks, 5, 0, now);
        assert!(column.has_more);
        assert_eq!(column.next_offset, 2);

        let last = BoardColumnView::build(TaskStatus::Todo, &tasks, 2, 0, now);
        assert!(!last.has_more);
    }

    #[test]
    fn sidebar_links_back_to_the_chat() {
        let now = Utc::now();
        let task = task(TaskStatus::Todo, None);
        let chat = ChatBasicInfo {
            id: task.chat_id,
            workspace_id: Uuid::new_v4(),
            chat_type: crate::models::ChatType::Bug,
            title: Some("Fix <login>".into()),
            status: Some(TaskStatus::Todo),
        };
        let detail = TaskDetail { workspace_id: chat.workspace_id, assignee: None, task };
        let view = TaskSidebarView::build(&detail, &chat, now);
        let html = HtmlRenderer
            .render(fragments::TASK_SIDEBAR, &serde_json::to_value(&view).unwrap())
            .unwrap();
        assert!(html.contains(&format!(r#"href="/chats/{}""#, chat.id)));
        assert!(html.contains(r#"data-type="bug""#));
        assert!(html.contains("Unassigned"));
    }

    #[test]
    fn html_renderer_escapes_titles() {
        let now = Utc::now();
        let card = TaskCardView::from_task(&task(TaskStatus::Todo, None), now);
        let html = HtmlRenderer
            .render(fragments::TASK_CARD, &serde_json::to_value(&card).unwrap())
            .unwrap();
        assert!(html.contains("Fix &lt;login&gt;"));
        assert!(!html.contains("<login>"));
    }

    #[test]
    fn unknown_fragment_is_an_error() {
        let err = HtmlRenderer.render("board/unknown", &Value::Null).unwrap_err();
        assert!(matches!(err, RenderError::UnknownFragment(_)));
    }
}
