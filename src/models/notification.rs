use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::InvalidEnumValue;

/// Notification kinds. The kind decides which resource the notification
/// links to, see [`Notification::link`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationKind {
    TaskAssigned,
    TaskCreated,
    TaskStatusChanged,
    ChatMention,
    ChatMessage,
    WorkspaceInvite,
    System,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::TaskAssigned => "task-assigned",
            NotificationKind::TaskCreated => "task-created",
            NotificationKind::TaskStatusChanged => "task-status-changed",
            NotificationKind::ChatMention => "chat-mention",
            NotificationKind::ChatMessage => "chat-message",
            NotificationKind::WorkspaceInvite => "workspace-invite",
            NotificationKind::System => "system",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationKind {
    type Err = InvalidEnumValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "task-assigned" => Ok(NotificationKind::TaskAssigned),
            "task-created" => Ok(NotificationKind::TaskCreated),
            "task-status-changed" => Ok(NotificationKind::TaskStatusChanged),
            "chat-mention" => Ok(NotificationKind::ChatMention),
            "chat-message" => Ok(NotificationKind::ChatMessage),
            "workspace-invite" => Ok(NotificationKind::WorkspaceInvite),
            "system" => Ok(NotificationKind::System),
            other => Err(InvalidEnumValue::new("notification kind", other)),
        }
    }
}

/// Per-user notification. Invariant: `is_read ⇔ read_at.is_some()`, and the
/// read transition is monotonic (unread to read only).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub resource_id: Uuid,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}

impl Notification {
    /// Frontend path the notification points at, derived from its kind and
    /// opaque resource id.
    pub fn link(&self) -> String {
        match self.kind {
            NotificationKind::TaskAssigned
            | NotificationKind::TaskCreated
            | NotificationKind::TaskStatusChanged => format!("/tasks/{}", self.resource_id),
            NotificationKind::ChatMention | NotificationKind::ChatMessage => {
                format!("/chats/{}", self.resource_id)
            }
            NotificationKind::WorkspaceInvite => format!("/workspaces/{}", self.resource_id),
            NotificationKind::System => format!("/notifications/{}", self.resource_id),
        }
    }
}

/// Wire shape for notification responses: the notification plus its derived
/// link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationDto {
    #[serde(flatten)]
    pub notification: Notification,
    pub link: String,
}

impl From<Notification> for NotificationDto {
    fn from(notification: Notification) -> Self {
        let link = notification.link();
        Self { notification, link }
    }
}
