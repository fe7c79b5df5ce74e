//! Per-chat message windows
//!
//! Each chat with at least one loaded message has a window: the ordered
//! in-memory buffer of its loaded messages, bounded by the numeric ids of
//! the oldest and newest message present. Windows accept older pages at the
//! front, newer events at the back, and tolerate out-of-order delivery by
//! falling back to a full re-sort. Whether the range below `min_id` has been
//! exhausted is not tracked.

use std::collections::HashMap;

use palaver_protocol::ChatMessage;
use uuid::Uuid;

use crate::directory::UserDirectory;

/// Ordered buffer of one chat's loaded messages
#[derive(Debug)]
pub struct MessageWindow {
    /// Lowest numeric id present; `u64::MAX` while nothing is loaded
    min_id: u64,
    /// Highest numeric id present; `0` while nothing is loaded
    max_id: u64,
    /// Messages sorted ascending by numeric id, no duplicates
    messages: Vec<ChatMessage>,
}

impl MessageWindow {
    fn new() -> Self {
        Self {
            min_id: u64::MAX,
            max_id: 0,
            messages: Vec::new(),
        }
    }

    pub fn min_id(&self) -> u64 {
        self.min_id
    }

    pub fn max_id(&self) -> u64 {
        self.max_id
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Copy the window's messages out for the presentation layer
    pub fn snapshot(&self) -> Vec<ChatMessage> {
        self.messages.clone()
    }
}

/// What a merge changed
#[derive(Debug)]
pub struct MergeOutcome {
    /// The message that raised the window's `max_id`, if the batch did;
    /// its text becomes the chat's new roster preview
    pub new_preview: Option<ChatMessage>,
}

/// What applying an edit changed
#[derive(Debug, PartialEq, Eq)]
pub enum EditOutcome {
    /// The chat has a window; `is_latest` is true when the edited message is
    /// the window's newest, so the roster preview must follow
    Applied { is_latest: bool },
    /// No window is loaded for the message's chat
    NoWindow,
}

/// All message windows, keyed by chat id
#[derive(Debug, Default)]
pub struct WindowStore {
    windows: HashMap<Uuid, MessageWindow>,
}

impl WindowStore {
    pub fn new() -> Self {
        Self {
            windows: HashMap::new(),
        }
    }

    pub fn get(&self, chat_id: Uuid) -> Option<&MessageWindow> {
        self.windows.get(&chat_id)
    }

    pub fn contains(&self, chat_id: Uuid) -> bool {
        self.windows.contains_key(&chat_id)
    }

    /// Drop every window (fresh start on connect)
    pub fn clear(&mut self) {
        self.windows.clear();
    }

    /// Merge a batch of messages into a chat's window
    ///
    /// The batch must already be sorted ascending by numeric id; pagination
    /// responses arrive newest-first and are reversed by the caller. A batch
    /// strictly older than the window is prepended, a strictly newer one
    /// appended; anything overlapping falls back to append-sort-dedup, which
    /// is O(n log n) and only hit on out-of-order event delivery or
    /// duplicate pagination.
    // TODO: replace the overlap fallback with ordered insertion once windows
    // grow past a few pages in practice
    pub fn merge(
        &mut self,
        chat_id: Uuid,
        batch: Vec<ChatMessage>,
        directory: &UserDirectory,
    ) -> MergeOutcome {
        let mut batch: Vec<ChatMessage> = batch
            .into_iter()
            .filter(|m| {
                if m.numeric_id().is_none() {
                    tracing::warn!(id = %m.id, "message with non-numeric id; dropping");
                    return false;
                }
                true
            })
            .collect();

        if batch.is_empty() {
            return MergeOutcome { new_preview: None };
        }

        for message in &mut batch {
            if message.is_notification {
                message.text = directory.notification_text(&message.text, message.params.as_deref());
            }
        }

        let mut batch_min = u64::MAX;
        let mut batch_max = 0u64;
        let mut max_message: Option<&ChatMessage> = None;
        for message in &batch {
            let Some(id) = message.numeric_id() else {
                continue;
            };
            if id < batch_min {
                batch_min = id;
            }
            if id > batch_max || max_message.is_none() {
                batch_max = id;
                max_message = Some(message);
            }
        }
        let max_message = max_message.cloned();

        let window = self.windows.entry(chat_id).or_insert_with(MessageWindow::new);

        if batch_max < window.min_id {
            // Strictly older than everything loaded: prepend in batch order
            window.messages.splice(0..0, batch);
        } else if batch_min > window.max_id {
            // Strictly newer: append in batch order
            window.messages.extend(batch);
        } else {
            tracing::debug!(%chat_id, "overlapping message batch; re-sorting window");
            window.messages.extend(batch);
            window.messages.sort_by_key(|m| m.numeric_id().unwrap_or(0));
            // Stable sort keeps the previously-loaded copy first
            window.messages.dedup_by(|a, b| a.id == b.id);
        }

        let new_preview = if batch_max > window.max_id {
            max_message
        } else {
            None
        };

        if batch_max > window.max_id {
            window.max_id = batch_max;
        }
        if batch_min < window.min_id {
            window.min_id = batch_min;
        }

        for message in &mut window.messages {
            directory.resolve_sender_name(message);
        }

        MergeOutcome { new_preview }
    }

    /// Replace an edited message in its chat's window
    pub fn apply_edit(&mut self, mut message: ChatMessage, directory: &UserDirectory) -> EditOutcome {
        directory.resolve_sender_name(&mut message);

        let Some(window) = self.windows.get_mut(&message.chat_id) else {
            return EditOutcome::NoWindow;
        };

        let is_latest = message.numeric_id() == Some(window.max_id);
        if let Some(slot) = window.messages.iter_mut().find(|m| m.id == message.id) {
            *slot = message;
        }

        EditOutcome::Applied { is_latest }
    }
}
