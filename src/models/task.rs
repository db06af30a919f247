use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::chat::ChatType;
use super::user::User;
use super::InvalidEnumValue;

/// Window ahead of `now` inside which a due date counts as "due soon".
pub const DUE_SOON_WINDOW_DAYS: i64 = 3;

/// Board status of a task-family chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    InReview,
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::InReview => "in-review",
            TaskStatus::Done => "done",
        }
    }

    /// The four board columns, in display order. Fixed by contract.
    pub fn board_columns() -> [TaskStatus; 4] {
        [TaskStatus::Todo, TaskStatus::InProgress, TaskStatus::InReview, TaskStatus::Done]
    }

    /// Column heading shown on the board; `in-review` renders as "Review".
    pub fn column_title(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "To Do",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::InReview => "Review",
            TaskStatus::Done => "Done",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = InvalidEnumValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "todo" => Ok(TaskStatus::Todo),
            "in-progress" => Ok(TaskStatus::InProgress),
            "in-review" => Ok(TaskStatus::InReview),
            "done" => Ok(TaskStatus::Done),
            other => Err(InvalidEnumValue::new("task status", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
    Critical,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
            TaskPriority::Critical => "critical",
        }
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskPriority {
    type Err = InvalidEnumValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(TaskPriority::Low),
            "medium" => Ok(TaskPriority::Medium),
            "high" => Ok(TaskPriority::High),
            "critical" => Ok(TaskPriority::Critical),
            other => Err(InvalidEnumValue::new("task priority", other)),
        }
    }
}

/// Board entity kind, i.e. the task-family subset of [`ChatType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Task,
    Bug,
    Epic,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Task => "task",
            EntityType::Bug => "bug",
            EntityType::Epic => "epic",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = InvalidEnumValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "task" => Ok(EntityType::Task),
            "bug" => Ok(EntityType::Bug),
            "epic" => Ok(EntityType::Epic),
            other => Err(InvalidEnumValue::new("entity type", other)),
        }
    }
}

impl TryFrom<ChatType> for EntityType {
    type Error = InvalidEnumValue;

    fn try_from(chat_type: ChatType) -> Result<Self, Self::Error> {
        match chat_type {
            ChatType::Task => Ok(EntityType::Task),
            ChatType::Bug => Ok(EntityType::Bug),
            ChatType::Epic => Ok(EntityType::Epic),
            ChatType::Discussion => Err(InvalidEnumValue::new("entity type", "discussion")),
        }
    }
}

/// Read model of a task-family chat as the board sees it. Owned by the board
/// services; this layer only shapes it into fragments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub title: String,
    pub description: String,
    pub entity_type: EntityType,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub assignee_id: Option<Uuid>,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub version: i64,
}

impl Task {
    /// Past its due date and not done, judged against the caller's clock.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        match self.due_date {
            Some(due) => due < now && self.status != TaskStatus::Done,
            None => false,
        }
    }

    /// Due within the next three days. Overdue tasks and done tasks are not
    /// "due soon"; the two flags never hold at once.
    pub fn is_due_soon(&self, now: DateTime<Utc>) -> bool {
        match self.due_date {
            Some(due) => {
                self.status != TaskStatus::Done
                    && due >= now
                    && due <= now + Duration::days(DUE_SOON_WINDOW_DAYS)
            }
            None => false,
        }
    }
}

/// Composite returned by the task detail service for the sidebar fragment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDetail {
    pub task: Task,
    pub workspace_id: Uuid,
    pub assignee: Option<User>,
}

/// Domain event on a task. `kind` stays a raw string on the wire; unknown
/// kinds are skipped when the timeline is built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskEvent {
    pub id: Uuid,
    pub task_id: Uuid,
    pub kind: String,
    pub actor_id: Uuid,
    pub data: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Event kinds the activity timeline understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskEventKind {
    Created,
    Renamed,
    StatusChanged,
    PriorityChanged,
    AssigneeChanged,
    DueDateChanged,
    Closed,
    Reopened,
}

impl TaskEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskEventKind::Created => "created",
            TaskEventKind::Renamed => "renamed",
            TaskEventKind::StatusChanged => "status-changed",
            TaskEventKind::PriorityChanged => "priority-changed",
            TaskEventKind::AssigneeChanged => "assignee-changed",
            TaskEventKind::DueDateChanged => "due-date-changed",
            TaskEventKind::Closed => "closed",
            TaskEventKind::Reopened => "reopened",
        }
    }
}

impl fmt::Display for TaskEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskEventKind {
    type Err = InvalidEnumValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(TaskEventKind::Created),
            "renamed" => Ok(TaskEventKind::Renamed),
            "status-changed" => Ok(TaskEventKind::StatusChanged),
            "priority-changed" => Ok(TaskEventKind::PriorityChanged),
            "assignee-changed" => Ok(TaskEventKind::AssigneeChanged),
            "due-date-changed" => Ok(TaskEventKind::DueDateChanged),
            "closed" => Ok(TaskEventKind::Closed),
            "reopened" => Ok(TaskEventKind::Reopened),
            other => Err(InvalidEnumValue::new("task event kind", other)),
        }
    }
}
