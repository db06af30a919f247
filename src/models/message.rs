use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Chat message. Deletion is a tombstone: the service clears `content` and
/// sets `is_deleted`, but the envelope stays listable so reply chains keep
/// their anchors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub reply_to_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub edited_at: Option<DateTime<Utc>>,
    pub is_deleted: bool,
}

/// Upper bound on message content length, in characters.
pub const MAX_MESSAGE_CHARS: usize = 10_000;
