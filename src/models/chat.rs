use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::task::TaskStatus;
use super::InvalidEnumValue;

/// Chat kinds. `Discussion` is a free-form thread; the other three are the
/// task family and double as the board entity kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatType {
    Discussion,
    Task,
    Bug,
    Epic,
}

impl ChatType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatType::Discussion => "discussion",
            ChatType::Task => "task",
            ChatType::Bug => "bug",
            ChatType::Epic => "epic",
        }
    }

    /// Task-family chats carry a required title and a board status.
    pub fn is_task_family(&self) -> bool {
        !matches!(self, ChatType::Discussion)
    }
}

impl fmt::Display for ChatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChatType {
    type Err = InvalidEnumValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "discussion" => Ok(ChatType::Discussion),
            "task" => Ok(ChatType::Task),
            "bug" => Ok(ChatType::Bug),
            "epic" => Ok(ChatType::Epic),
            other => Err(InvalidEnumValue::new("chat type", other)),
        }
    }
}

/// Role of a user on one chat. Distinct from workspace membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    Admin,
    Member,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::Admin => "admin",
            ChatRole::Member => "member",
        }
    }
}

impl fmt::Display for ChatRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChatRole {
    type Err = InvalidEnumValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(ChatRole::Admin),
            "member" => Ok(ChatRole::Member),
            other => Err(InvalidEnumValue::new("chat role", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatParticipant {
    pub user_id: Uuid,
    pub role: ChatRole,
    pub joined_at: DateTime<Utc>,
}

/// Chat with its participant list. The creator is always a participant with
/// the admin role; `title` and `status` are present for the task family.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    pub id: Uuid,
    pub workspace_id: Uuid,
    #[serde(rename = "type")]
    pub chat_type: ChatType,
    pub title: Option<String>,
    pub is_public: bool,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub status: Option<TaskStatus>,
    pub participants: Vec<ChatParticipant>,
}

impl Chat {
    pub fn participant(&self, user_id: Uuid) -> Option<&ChatParticipant> {
        self.participants.iter().find(|p| p.user_id == user_id)
    }

    pub fn is_participant(&self, user_id: Uuid) -> bool {
        self.participant(user_id).is_some()
    }

    pub fn is_chat_admin(&self, user_id: Uuid) -> bool {
        matches!(self.participant(user_id), Some(p) if p.role == ChatRole::Admin)
    }
}

/// Slim chat header used by the board fragments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatBasicInfo {
    pub id: Uuid,
    pub workspace_id: Uuid,
    #[serde(rename = "type")]
    pub chat_type: ChatType,
    pub title: Option<String>,
    pub status: Option<TaskStatus>,
}
