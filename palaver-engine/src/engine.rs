//! Synchronization engine
//!
//! The orchestrator: wires the connection manager, window store, roster and
//! user directory together. Runs as one task; every mutation happens inside
//! that task in response to either a presentation-layer command or an
//! inbound connection event, so state is never touched concurrently.

use tokio::sync::mpsc;
use uuid::Uuid;

use palaver_protocol::{
    Chat, ChatEvent, ChatInfo, ChatMessage, ClientCommand, MessageDraft, ServerPacket,
    ServerPayload, User,
};
use palaver_utils::{PalaverError, Result};

use crate::config::EngineConfig;
use crate::connection::{Connection, ConnectionEvent};
use crate::directory::UserDirectory;
use crate::identity::Identity;
use crate::roster::ChatRoster;
use crate::window::{EditOutcome, WindowStore};

/// Imperative commands from the presentation layer
#[derive(Debug)]
pub enum EngineCommand {
    Connect { identity: Identity },
    Disconnect,
    SelectChat { chat: Chat },
    SendMessage { text: String, chat_id: Uuid },
    EditMessage { message_id: String, text: String },
    AddUserToChat { user_id: Uuid, chat_id: Uuid },
    CreateChat { info: ChatInfo },
    SearchUsers { filter: String },
    LoadPreviousMessages { chat_id: Uuid },
}

/// State snapshots pushed to the presentation layer
///
/// Every variant carries a full copy, never a diff and never a live
/// reference into engine state.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineUpdate {
    RosterChanged(Vec<Chat>),
    SelectedChatChanged(Option<Chat>),
    SelectedChatMessagesChanged(Vec<ChatMessage>),
    UserSearchResultsChanged(Vec<User>),
}

/// Clonable handle driving a running [`SyncEngine`]
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineCommand>,
}

impl EngineHandle {
    async fn send(&self, command: EngineCommand) -> Result<()> {
        self.tx
            .send(command)
            .await
            .map_err(|_| PalaverError::ConnectionClosed)
    }

    pub async fn connect(&self, identity: Identity) -> Result<()> {
        self.send(EngineCommand::Connect { identity }).await
    }

    pub async fn disconnect(&self) -> Result<()> {
        self.send(EngineCommand::Disconnect).await
    }

    pub async fn select_chat(&self, chat: Chat) -> Result<()> {
        self.send(EngineCommand::SelectChat { chat }).await
    }

    pub async fn send_message(&self, text: impl Into<String>, chat_id: Uuid) -> Result<()> {
        self.send(EngineCommand::SendMessage {
            text: text.into(),
            chat_id,
        })
        .await
    }

    pub async fn edit_message(
        &self,
        message_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Result<()> {
        self.send(EngineCommand::EditMessage {
            message_id: message_id.into(),
            text: text.into(),
        })
        .await
    }

    pub async fn add_user_to_chat(&self, user_id: Uuid, chat_id: Uuid) -> Result<()> {
        self.send(EngineCommand::AddUserToChat { user_id, chat_id })
            .await
    }

    pub async fn create_chat(&self, info: ChatInfo) -> Result<()> {
        self.send(EngineCommand::CreateChat { info }).await
    }

    pub async fn search_users(&self, filter: impl Into<String>) -> Result<()> {
        self.send(EngineCommand::SearchUsers {
            filter: filter.into(),
        })
        .await
    }

    pub async fn load_previous_messages(&self, chat_id: Uuid) -> Result<()> {
        self.send(EngineCommand::LoadPreviousMessages { chat_id })
            .await
    }
}

/// The synchronization engine
pub struct SyncEngine {
    config: EngineConfig,
    connection: Connection,
    roster: ChatRoster,
    windows: WindowStore,
    directory: UserDirectory,
    selected_chat: Option<Chat>,
    /// Resolved from the identity at connect time; stamped onto sent messages
    user_id: Option<Uuid>,
    /// Packet id of the most recent user search; stale responses are dropped
    last_user_search_id: Option<u64>,
    commands: mpsc::Receiver<EngineCommand>,
    conn_events_tx: mpsc::Sender<ConnectionEvent>,
    conn_events_rx: mpsc::Receiver<ConnectionEvent>,
    updates: mpsc::Sender<EngineUpdate>,
}

impl SyncEngine {
    /// Create an engine with its handle and update stream
    pub fn new(config: EngineConfig) -> (Self, EngineHandle, mpsc::Receiver<EngineUpdate>) {
        let (cmd_tx, cmd_rx) = mpsc::channel(64);
        let (update_tx, update_rx) = mpsc::channel(64);
        let (conn_events_tx, conn_events_rx) = mpsc::channel(256);

        let connection = Connection::new(
            config.endpoint.clone(),
            config.connect_delay(),
            config.reconnect_delay(),
        );

        let engine = Self {
            config,
            connection,
            roster: ChatRoster::new(),
            windows: WindowStore::new(),
            directory: UserDirectory::new(),
            selected_chat: None,
            user_id: None,
            last_user_search_id: None,
            commands: cmd_rx,
            conn_events_tx,
            conn_events_rx,
            updates: update_tx,
        };

        (engine, EngineHandle { tx: cmd_tx }, update_rx)
    }

    /// Run until every [`EngineHandle`] is dropped
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                command = self.commands.recv() => {
                    match command {
                        Some(command) => self.handle_command(command).await,
                        None => break,
                    }
                }

                Some(event) = self.conn_events_rx.recv() => {
                    self.handle_connection_event(event).await;
                }
            }
        }
        self.connection.disconnect();
    }

    async fn handle_command(&mut self, command: EngineCommand) {
        match command {
            EngineCommand::Connect { identity } => {
                let user_id = match identity.user_id() {
                    Ok(id) => id,
                    Err(e) => {
                        tracing::error!("cannot connect: {}", e);
                        return;
                    }
                };
                self.user_id = Some(user_id);
                if let Err(e) = self.connection.connect(user_id, self.conn_events_tx.clone()) {
                    tracing::error!("cannot connect: {}", e);
                }
            }

            EngineCommand::Disconnect => {
                self.connection.disconnect();
            }

            EngineCommand::SelectChat { chat } => {
                self.select_chat(chat).await;
            }

            EngineCommand::SendMessage { text, chat_id } => {
                let Some(sender_id) = self.user_id else {
                    tracing::warn!("attempt to send a message before connecting");
                    return;
                };
                self.connection.send(ClientCommand::SendMessage {
                    message: MessageDraft {
                        chat_id,
                        text,
                        sender_id,
                        is_notification: false,
                    },
                });
            }

            EngineCommand::EditMessage { message_id, text } => {
                self.connection
                    .send(ClientCommand::EditMessage { message_id, text });
            }

            EngineCommand::AddUserToChat { user_id, chat_id } => {
                self.connection
                    .send(ClientCommand::AddUserToChat { user_id, chat_id });
            }

            EngineCommand::CreateChat { info } => {
                self.connection
                    .send(ClientCommand::CreateChat { chat_data: info });
            }

            EngineCommand::SearchUsers { filter } => {
                let sent = self.connection.send(ClientCommand::GetUserList {
                    name_filter: filter,
                    limit: None,
                    offset: None,
                });
                if let Some(id) = sent {
                    self.last_user_search_id = Some(id);
                }
            }

            EngineCommand::LoadPreviousMessages { chat_id } => {
                match self.windows.get(chat_id) {
                    Some(window) => {
                        let start_id = window.min_id();
                        self.request_messages(chat_id, Some(start_id));
                    }
                    None => {
                        tracing::error!(
                            %chat_id,
                            "loadPreviousMessages called before the latest page was loaded"
                        );
                    }
                }
            }
        }
    }

    async fn select_chat(&mut self, chat: Chat) {
        if !self.roster.contains(chat.id) {
            tracing::debug!(chat_id = %chat.id, "selecting a chat outside the roster; ignoring");
            return;
        }

        self.selected_chat = Some(chat.clone());
        self.publish(EngineUpdate::SelectedChatChanged(Some(chat.clone())))
            .await;

        match self.windows.get(chat.id) {
            Some(window) => {
                self.publish(EngineUpdate::SelectedChatMessagesChanged(window.snapshot()))
                    .await;
            }
            None => {
                self.publish(EngineUpdate::SelectedChatMessagesChanged(Vec::new()))
                    .await;
                self.request_messages(chat.id, None);
            }
        }
    }

    async fn handle_connection_event(&mut self, event: ConnectionEvent) {
        match event {
            ConnectionEvent::Up => {
                self.connection.mark_connected();
                // Fresh start: drop every window, then re-fetch. This also
                // discards pagination progress for non-selected chats.
                self.windows.clear();
                self.connection.send(ClientCommand::GetJoinedChats);
                self.connection.send(ClientCommand::GetFirstCircleUpdates);
                if let Some(chat) = &self.selected_chat {
                    let chat_id = chat.id;
                    self.request_messages(chat_id, None);
                }
            }

            ConnectionEvent::Down => {
                tracing::info!("connection lost; transport is redialing");
                self.connection.mark_reconnecting();
            }

            ConnectionEvent::Packet(packet) => {
                self.handle_packet(packet).await;
            }
        }
    }

    async fn handle_packet(&mut self, packet: ServerPacket) {
        match packet.data {
            ServerPayload::JoinedChatList { chats } => {
                tracing::debug!(count = chats.len(), "joined chat list received");
                self.roster.replace_all(chats);
                self.publish(EngineUpdate::RosterChanged(self.roster.snapshot()))
                    .await;
            }

            ServerPayload::Messages { mut messages } => {
                if messages.is_empty() {
                    tracing::debug!("empty message page received");
                    return;
                }
                // Pages arrive newest-first; merge wants ascending
                messages.reverse();
                let chat_id = messages[0].chat_id;
                self.merge_and_publish(chat_id, messages).await;
            }

            ServerPayload::UserList { users } => {
                if self.last_user_search_id.is_some()
                    && packet.request_packet_id == self.last_user_search_id
                {
                    self.publish(EngineUpdate::UserSearchResultsChanged(users))
                        .await;
                } else {
                    tracing::debug!(
                        correlation_id = ?packet.request_packet_id,
                        "stale user search response; discarding"
                    );
                }
            }

            ServerPayload::SuccessNoBody => {
                tracing::debug!(correlation_id = ?packet.request_packet_id, "command confirmed");
            }

            ServerPayload::Error { error_data } => {
                tracing::warn!(
                    correlation_id = ?packet.request_packet_id,
                    error = ?error_data,
                    "server reported an error"
                );
            }

            ServerPayload::EventList { events } => {
                for event in events {
                    self.handle_event(event).await;
                }
                // Acknowledging implies every event in the batch was applied
                self.connection.send(ClientCommand::AcknowledgeEvents);
            }

            ServerPayload::Unknown => {
                tracing::warn!("unknown server packet type; ignoring");
            }
        }
    }

    async fn handle_event(&mut self, event: ChatEvent) {
        match event {
            ChatEvent::ChatListUpdate {
                action_type,
                chat_data,
            } => match action_type.as_str() {
                "add" => {
                    self.roster.add(chat_data);
                    self.publish(EngineUpdate::RosterChanged(self.roster.snapshot()))
                        .await;
                }
                other => {
                    tracing::warn!(action = other, "chat list update action not supported yet");
                }
            },

            ChatEvent::Message { message } => {
                let chat_id = message.chat_id;
                self.merge_and_publish(chat_id, vec![message]).await;
            }

            ChatEvent::MessageEdited { message } => {
                self.apply_edit(message).await;
            }

            ChatEvent::FirstCircleUserList { users, is_full } => {
                tracing::debug!(count = users.len(), is_full, "user directory refresh");
                self.directory.apply(&users, is_full);
            }

            ChatEvent::Unknown => {
                tracing::warn!("unknown chat event; ignoring");
            }
        }
    }

    /// Merge a batch into its window, then propagate preview and snapshot
    async fn merge_and_publish(&mut self, chat_id: Uuid, batch: Vec<ChatMessage>) {
        let outcome = self.windows.merge(chat_id, batch, &self.directory);

        if let Some(preview) = outcome.new_preview {
            if self.roster.set_preview(chat_id, &preview.text) {
                self.publish(EngineUpdate::RosterChanged(self.roster.snapshot()))
                    .await;
            }
        }

        if self.is_selected(chat_id) {
            if let Some(window) = self.windows.get(chat_id) {
                self.publish(EngineUpdate::SelectedChatMessagesChanged(window.snapshot()))
                    .await;
            }
        }
    }

    async fn apply_edit(&mut self, message: ChatMessage) {
        let chat_id = message.chat_id;
        let text = message.text.clone();

        match self.windows.apply_edit(message, &self.directory) {
            EditOutcome::NoWindow => {
                // Out-of-sequence edit: recover by fetching the chat instead
                tracing::warn!(%chat_id, "edit for a chat with no loaded window; requesting messages");
                self.request_messages(chat_id, None);
            }
            EditOutcome::Applied { is_latest } => {
                if self.is_selected(chat_id) {
                    if let Some(window) = self.windows.get(chat_id) {
                        self.publish(EngineUpdate::SelectedChatMessagesChanged(window.snapshot()))
                            .await;
                    }
                }
                if is_latest && self.roster.set_preview(chat_id, &text) {
                    self.publish(EngineUpdate::RosterChanged(self.roster.snapshot()))
                        .await;
                }
            }
        }
    }

    fn request_messages(&mut self, chat_id: Uuid, start_id: Option<u64>) {
        self.connection.send(ClientCommand::GetMessages {
            chat_id,
            start_id,
            limit: Some(self.config.page_size),
        });
    }

    fn is_selected(&self, chat_id: Uuid) -> bool {
        self.selected_chat.as_ref().map(|c| c.id) == Some(chat_id)
    }

    async fn publish(&self, update: EngineUpdate) {
        if self.updates.send(update).await.is_err() {
            tracing::debug!("update receiver dropped");
        }
    }
}
