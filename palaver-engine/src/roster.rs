//! Chat roster
//!
//! The ordered list of chats the current user belongs to, with each chat's
//! preview text. Consumers only ever receive copies; the engine owns the
//! list exclusively.

use palaver_protocol::Chat;
use uuid::Uuid;

/// Ordered collection of joined chats
#[derive(Debug, Default)]
pub struct ChatRoster {
    chats: Vec<Chat>,
}

impl ChatRoster {
    pub fn new() -> Self {
        Self { chats: Vec::new() }
    }

    /// Replace the whole roster with a fresh server snapshot
    pub fn replace_all(&mut self, chats: Vec<Chat>) {
        self.chats = chats;
    }

    /// Append a chat (roster-update `add` action)
    pub fn add(&mut self, chat: Chat) {
        self.chats.push(chat);
    }

    /// Update a chat's preview text
    ///
    /// Callers only invoke this with the text of a message that is newer
    /// than anything previously seen for the chat, so previews never regress
    /// to older messages. Returns whether a chat was updated.
    pub fn set_preview(&mut self, chat_id: Uuid, text: &str) -> bool {
        match self.chats.iter_mut().find(|c| c.id == chat_id) {
            Some(chat) => {
                chat.last_message_text = Some(text.to_string());
                true
            }
            None => false,
        }
    }

    /// Whether the chat is a member of the roster
    pub fn contains(&self, chat_id: Uuid) -> bool {
        self.chats.iter().any(|c| c.id == chat_id)
    }

    pub fn get(&self, chat_id: Uuid) -> Option<&Chat> {
        self.chats.iter().find(|c| c.id == chat_id)
    }

    pub fn len(&self) -> usize {
        self.chats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chats.is_empty()
    }

    /// Copy the roster out for the presentation layer
    pub fn snapshot(&self) -> Vec<Chat> {
        self.chats.clone()
    }
}
