// Consumer-side contracts for the application services this layer calls out
// to. The HTTP layer never owns domain state; everything it serves comes
// back from one of these traits for the duration of a single request.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{
    Chat, ChatBasicInfo, ChatRole, ChatType, Message, Notification, Task, TaskDetail, TaskEvent,
    TaskPriority, TaskStatus, User, Workspace, WorkspaceMember, WorkspaceRole,
};

/// Entity families the error taxonomy distinguishes; each gets its own
/// `<FAMILY>_NOT_FOUND` code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    User,
    Session,
    Workspace,
    Member,
    Chat,
    Participant,
    Message,
    Notification,
    Task,
}

impl Family {
    pub fn as_str(&self) -> &'static str {
        match self {
            Family::User => "user",
            Family::Session => "session",
            Family::Workspace => "workspace",
            Family::Member => "member",
            Family::Chat => "chat",
            Family::Participant => "participant",
            Family::Message => "message",
            Family::Notification => "notification",
            Family::Task => "task",
        }
    }

    /// Upper-case token used when building error codes.
    pub fn code_fragment(&self) -> &'static str {
        match self {
            Family::User => "USER",
            Family::Session => "SESSION",
            Family::Workspace => "WORKSPACE",
            Family::Member => "MEMBER",
            Family::Chat => "CHAT",
            Family::Participant => "PARTICIPANT",
            Family::Message => "MESSAGE",
            Family::Notification => "NOTIFICATION",
            Family::Task => "TASK",
        }
    }
}

impl std::fmt::Display for Family {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Domain error kinds services may answer with. Classification into HTTP
/// status and code happens in one place, `crate::error`.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("invalid refresh token")]
    InvalidRefreshToken,
    #[error("{0} not found")]
    NotFound(Family),
    #[error("access denied: {0}")]
    AccessDenied(String),
    #[error("insufficient privilege: {0}")]
    InsufficientPrivilege(String),
    #[error("{0}")]
    Validation(String),
    #[error("invalid {field}: {message}")]
    InvalidField { field: &'static str, message: String },
    #[error("notification is already read")]
    AlreadyRead,
    #[error("user is already a member of this workspace")]
    MemberAlreadyExists,
    #[error("{message}")]
    Conflict { state: &'static str, message: String },
    #[error("{action} failed")]
    Internal {
        action: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ServiceError {
    pub fn access_denied(message: impl Into<String>) -> Self {
        ServiceError::AccessDenied(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::Validation(message.into())
    }

    pub fn internal(action: &'static str, source: impl Into<anyhow::Error>) -> Self {
        ServiceError::Internal { action, source: source.into() }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Access/refresh token pair as issued by the auth service. Both values are
/// opaque to this layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Result of a successful credential exchange.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user: User,
    pub tokens: TokenPair,
}

#[async_trait]
pub trait AuthService: Send + Sync {
    /// Exchange an identity-provider authorization code for a token pair.
    async fn login(&self, code: &str, redirect_uri: &str) -> ServiceResult<LoginOutcome>;
    /// Terminate the caller's session. `NotFound(Session)` means there was
    /// nothing to terminate; the handler treats that as success.
    async fn logout(&self, user_id: Uuid) -> ServiceResult<()>;
    /// Trade a refresh token for a fresh pair.
    async fn refresh_token(&self, refresh_token: &str) -> ServiceResult<TokenPair>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> ServiceResult<Option<User>>;
    async fn find_by_external_id(&self, external_id: &str) -> ServiceResult<Option<User>>;
}

#[async_trait]
pub trait WorkspaceService: Send + Sync {
    async fn create(&self, owner_id: Uuid, name: &str, description: &str)
        -> ServiceResult<Workspace>;
    /// Workspaces the user belongs to, newest first.
    async fn list_for_user(&self, user_id: Uuid, limit: i64, offset: i64)
        -> ServiceResult<Vec<Workspace>>;
    /// Every workspace; reserved for system administrators.
    async fn list_all(&self, limit: i64, offset: i64) -> ServiceResult<Vec<Workspace>>;
    async fn get(&self, id: Uuid) -> ServiceResult<Workspace>;
    async fn update(&self, id: Uuid, name: &str, description: &str) -> ServiceResult<Workspace>;
    async fn delete(&self, id: Uuid) -> ServiceResult<()>;
}

#[async_trait]
pub trait MemberService: Send + Sync {
    async fn list_members(&self, workspace_id: Uuid, limit: i64, offset: i64)
        -> ServiceResult<Vec<WorkspaceMember>>;
    async fn add_member(&self, workspace_id: Uuid, user_id: Uuid, role: WorkspaceRole)
        -> ServiceResult<WorkspaceMember>;
    async fn remove_member(&self, workspace_id: Uuid, user_id: Uuid) -> ServiceResult<()>;
    async fn update_role(&self, workspace_id: Uuid, user_id: Uuid, role: WorkspaceRole)
        -> ServiceResult<WorkspaceMember>;
    async fn is_owner(&self, workspace_id: Uuid, user_id: Uuid) -> ServiceResult<bool>;
    async fn get_role(&self, workspace_id: Uuid, user_id: Uuid)
        -> ServiceResult<Option<WorkspaceRole>>;
}

/// Fields accepted when creating a chat.
#[derive(Debug, Clone)]
pub struct NewChat {
    pub chat_type: ChatType,
    pub title: Option<String>,
    pub is_public: bool,
    pub participant_ids: Vec<Uuid>,
}

/// Fields accepted when updating a chat. `convert_to` carries the one-way
/// discussion to task-family conversion.
#[derive(Debug, Clone)]
pub struct ChatUpdate {
    pub title: String,
    pub convert_to: Option<ChatType>,
}

#[async_trait]
pub trait ChatService: Send + Sync {
    async fn create(&self, workspace_id: Uuid, created_by: Uuid, chat: NewChat)
        -> ServiceResult<Chat>;
    /// Fetch with the visibility check applied: participants always see the
    /// chat, workspace members see it when it is public.
    async fn get(&self, id: Uuid, caller_id: Uuid) -> ServiceResult<Chat>;
    async fn list(
        &self,
        workspace_id: Uuid,
        chat_type: Option<ChatType>,
        limit: i64,
        offset: i64,
    ) -> ServiceResult<Vec<Chat>>;
    async fn update(&self, id: Uuid, update: ChatUpdate) -> ServiceResult<Chat>;
    async fn delete(&self, id: Uuid) -> ServiceResult<()>;
    async fn add_participant(&self, chat_id: Uuid, user_id: Uuid, role: ChatRole)
        -> ServiceResult<Chat>;
    async fn remove_participant(&self, chat_id: Uuid, user_id: Uuid) -> ServiceResult<()>;
}

#[async_trait]
pub trait MessageService: Send + Sync {
    /// Append a message. The service validates that a `reply_to` target
    /// exists in the same chat.
    async fn send(
        &self,
        chat_id: Uuid,
        author_id: Uuid,
        content: &str,
        reply_to: Option<Uuid>,
    ) -> ServiceResult<Message>;
    /// Newest first. Tombstoned messages keep their envelopes.
    async fn list(&self, chat_id: Uuid, limit: i64, offset: i64) -> ServiceResult<Vec<Message>>;
    async fn edit(&self, id: Uuid, author_id: Uuid, content: &str) -> ServiceResult<Message>;
    async fn delete(&self, id: Uuid, author_id: Uuid) -> ServiceResult<()>;
    async fn get(&self, id: Uuid) -> ServiceResult<Message>;
}

#[async_trait]
pub trait NotificationService: Send + Sync {
    async fn list(
        &self,
        user_id: Uuid,
        unread_only: bool,
        limit: i64,
        offset: i64,
    ) -> ServiceResult<Vec<Notification>>;
    async fn count_unread(&self, user_id: Uuid) -> ServiceResult<u64>;
    /// `AlreadyRead` on repeat calls; reads are monotonic.
    async fn mark_as_read(&self, id: Uuid, user_id: Uuid) -> ServiceResult<Notification>;
    async fn mark_all_as_read(&self, user_id: Uuid) -> ServiceResult<u64>;
    async fn delete(&self, id: Uuid, user_id: Uuid) -> ServiceResult<()>;
    async fn get(&self, id: Uuid) -> ServiceResult<Notification>;
}

/// Column filters accepted by the board queries. All optional; an empty
/// filter selects the whole column.
#[derive(Debug, Clone, Default)]
pub struct BoardFilter {
    pub assignee_id: Option<Uuid>,
    pub unassigned: bool,
    pub overdue_only: bool,
    pub priority: Option<TaskPriority>,
    pub search: Option<String>,
}

#[async_trait]
pub trait BoardTaskService: Send + Sync {
    async fn list_column(
        &self,
        workspace_id: Uuid,
        status: TaskStatus,
        filter: &BoardFilter,
        limit: i64,
        offset: i64,
    ) -> ServiceResult<Vec<Task>>;
    async fn count_column(
        &self,
        workspace_id: Uuid,
        status: TaskStatus,
        filter: &BoardFilter,
    ) -> ServiceResult<u64>;
}

#[async_trait]
pub trait TaskDetailService: Send + Sync {
    async fn get_detail(&self, task_id: Uuid) -> ServiceResult<TaskDetail>;
}

#[async_trait]
pub trait TaskEventService: Send + Sync {
    /// Most recent events first.
    async fn list_recent(&self, task_id: Uuid, limit: i64) -> ServiceResult<Vec<TaskEvent>>;
}

#[async_trait]
pub trait ChatBasicInfoService: Send + Sync {
    async fn get_basic_info(&self, chat_id: Uuid) -> ServiceResult<ChatBasicInfo>;
}

/// Board action commands. Every command bumps the task version and records a
/// domain event on success.
#[async_trait]
pub trait ActionService: Send + Sync {
    async fn change_status(&self, task_id: Uuid, actor_id: Uuid, status: TaskStatus)
        -> ServiceResult<Task>;
    async fn set_priority(&self, task_id: Uuid, actor_id: Uuid, priority: TaskPriority)
        -> ServiceResult<Task>;
    async fn assign_user(&self, task_id: Uuid, actor_id: Uuid, assignee: Option<Uuid>)
        -> ServiceResult<Task>;
    async fn set_due_date(&self, task_id: Uuid, actor_id: Uuid, due: Option<DateTime<Utc>>)
        -> ServiceResult<Task>;
    async fn close(&self, task_id: Uuid, actor_id: Uuid) -> ServiceResult<Task>;
    async fn reopen(&self, task_id: Uuid, actor_id: Uuid) -> ServiceResult<Task>;
    async fn rename(&self, task_id: Uuid, actor_id: Uuid, title: &str) -> ServiceResult<Task>;
}
