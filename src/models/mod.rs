pub mod chat;
pub mod message;
pub mod notification;
pub mod task;
pub mod user;
pub mod workspace;

pub use chat::{Chat, ChatBasicInfo, ChatParticipant, ChatRole, ChatType};
pub use message::{Message, MAX_MESSAGE_CHARS};
pub use notification::{Notification, NotificationDto, NotificationKind};
pub use task::{EntityType, Task, TaskDetail, TaskEvent, TaskEventKind, TaskPriority, TaskStatus};
pub use user::User;
pub use workspace::{Workspace, WorkspaceMember, WorkspaceRole};

/// Raised when a closed string set (role, chat type, status, ...) is fed a
/// value outside the set. Matching is case-sensitive by contract.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized {kind}: '{value}'")]
pub struct InvalidEnumValue {
    pub kind: &'static str,
    pub value: String,
}

impl InvalidEnumValue {
    pub fn new(kind: &'static str, value: impl Into<String>) -> Self {
        Self { kind, value: value.into() }
    }
}
