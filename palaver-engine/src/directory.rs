//! User directory cache
//!
//! Maps user ids to display names. Populated wholesale or incrementally by
//! first-circle refresh events, and consulted when resolving message sender
//! names and system-notification text.

use std::collections::HashMap;

use palaver_protocol::{ChatMessage, User};
use uuid::Uuid;

/// Notification code: a user joined the chat; `params` holds the user's id
pub const USER_JOINED_CHAT: &str = "USER_JOINED_CHAT_MSG";

/// Cache of user display names
#[derive(Debug, Default)]
pub struct UserDirectory {
    names: HashMap<Uuid, String>,
}

impl UserDirectory {
    pub fn new() -> Self {
        Self {
            names: HashMap::new(),
        }
    }

    /// Apply a directory refresh: wholesale replace when `is_full`,
    /// merge otherwise
    pub fn apply(&mut self, users: &[User], is_full: bool) {
        if is_full {
            self.names.clear();
        }
        for user in users {
            self.names.insert(user.id, user.name.clone());
        }
    }

    pub fn name(&self, id: &Uuid) -> Option<&str> {
        self.names.get(id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Fill in a message's sender name from the cache
    ///
    /// Set at most once: a message that already carries a name is left
    /// untouched so consumers never see it change. Unknown senders stay
    /// unresolved until a later directory refresh and merge pass.
    pub fn resolve_sender_name(&self, message: &mut ChatMessage) {
        if message.sender_name.is_some() {
            return;
        }
        if let Some(sender_id) = message.sender_id {
            if let Some(name) = self.names.get(&sender_id) {
                message.sender_name = Some(name.clone());
            }
        }
    }

    /// Render a notification code and its parameter into display text
    ///
    /// The vocabulary is fixed; unknown codes render a generic string so a
    /// newer server never breaks an older client.
    pub fn notification_text(&self, code: &str, params: Option<&str>) -> String {
        match code {
            USER_JOINED_CHAT => {
                let who = params
                    .and_then(|p| Uuid::parse_str(p).ok())
                    .and_then(|id| self.names.get(&id).cloned())
                    .or_else(|| params.map(str::to_string))
                    .unwrap_or_else(|| "A user".to_string());
                format!("{} joined the chat", who)
            }
            other => {
                tracing::debug!(code = other, "unknown notification code");
                "Unknown event".to_string()
            }
        }
    }
}
