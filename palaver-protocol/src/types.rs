//! Chat data types shared between client and server

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Core chat fields, as used when creating a chat
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatInfo {
    pub id: Uuid,
    pub title: String,
    pub owner_id: Uuid,
}

/// A chat as it appears in the joined-chat roster: core fields plus the
/// preview text of its latest message and the member count
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chat {
    pub id: Uuid,
    pub title: String,
    pub owner_id: Uuid,
    pub last_message_text: Option<String>,
    pub members_count: u32,
}

/// A single chat message or system notification
///
/// `id` is a numeric string assigned by the server; messages are globally
/// ordered by its numeric value within a chat. For notifications, `text`
/// holds a vocabulary code and `params` its argument; for user messages,
/// `sender_id` is set. `sender_name` is derived client-side from the user
/// directory and is never transmitted by the server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub id: String,
    pub chat_id: Uuid,
    pub dt: String,
    pub text: String,
    pub is_notification: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,
}

impl ChatMessage {
    /// The message's order key. `None` when the server sent a non-numeric id,
    /// which consumers treat as a protocol error for that message.
    pub fn numeric_id(&self) -> Option<u64> {
        self.id.parse().ok()
    }
}

/// A directory entry mapping a user id to a display name
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub name: String,
}
