//! Client-server packet types
//!
//! Outbound frames wrap a [`ClientCommand`] in a [`ClientPacket`] envelope
//! carrying a strictly increasing request id. Inbound frames are
//! [`ServerPacket`] envelopes whose `request_packet_id` echoes the id of the
//! originating command for responses, or is null for server-initiated events.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{Chat, ChatInfo, ChatMessage, User};

/// Envelope for a client command or request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientPacket {
    pub id: u64,
    pub data: ClientCommand,
}

/// Payload of a message-send command
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessageDraft {
    pub chat_id: Uuid,
    pub text: String,
    pub sender_id: Uuid,
    pub is_notification: bool,
}

/// Commands sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "packet_type")]
pub enum ClientCommand {
    /// Request the roster of chats the current user belongs to
    #[serde(rename = "CMDGetJoinedChats")]
    GetJoinedChats,

    /// Request a page of messages for one chat
    ///
    /// Without `start_id` the server returns the most recent page; with it,
    /// the page of messages strictly older than `start_id`. Pages arrive
    /// newest-first.
    #[serde(rename = "CMDGetMessages")]
    GetMessages {
        chat_id: Uuid,
        start_id: Option<u64>,
        limit: Option<u32>,
    },

    /// Post a new message to a chat
    #[serde(rename = "CMDSendMessage")]
    SendMessage { message: MessageDraft },

    /// Replace the text of an existing message
    #[serde(rename = "CMDEditMessage")]
    EditMessage { message_id: String, text: String },

    /// Add another user to a chat
    #[serde(rename = "CMDAddUserToChat")]
    AddUserToChat { user_id: Uuid, chat_id: Uuid },

    /// Create a new chat owned by the current user
    #[serde(rename = "CMDCreateChat")]
    CreateChat { chat_data: ChatInfo },

    /// Search users by display-name substring (autocomplete)
    #[serde(rename = "CMDGetUserList")]
    GetUserList {
        name_filter: String,
        limit: Option<u32>,
        offset: Option<u32>,
    },

    /// Request a snapshot of the first-circle user directory
    #[serde(rename = "CMDGetFirstCircleListUpdates")]
    GetFirstCircleUpdates,

    /// Confirm that every event of the last delivered batch was applied
    #[serde(rename = "CMDAcknowledgeEvents")]
    AcknowledgeEvents,
}

impl ClientCommand {
    /// Return the command's wire tag for logging
    pub fn type_name(&self) -> &'static str {
        match self {
            ClientCommand::GetJoinedChats => "CMDGetJoinedChats",
            ClientCommand::GetMessages { .. } => "CMDGetMessages",
            ClientCommand::SendMessage { .. } => "CMDSendMessage",
            ClientCommand::EditMessage { .. } => "CMDEditMessage",
            ClientCommand::AddUserToChat { .. } => "CMDAddUserToChat",
            ClientCommand::CreateChat { .. } => "CMDCreateChat",
            ClientCommand::GetUserList { .. } => "CMDGetUserList",
            ClientCommand::GetFirstCircleUpdates => "CMDGetFirstCircleListUpdates",
            ClientCommand::AcknowledgeEvents => "CMDAcknowledgeEvents",
        }
    }
}

/// Envelope for a server response or notification
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerPacket {
    pub request_packet_id: Option<u64>,
    pub data: ServerPayload,
}

/// Payloads sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "packet_type")]
pub enum ServerPayload {
    /// Response to GetJoinedChats
    #[serde(rename = "RespGetJoinedChatList")]
    JoinedChatList { chats: Vec<Chat> },

    /// Response to GetMessages; messages are ordered newest-first
    #[serde(rename = "RespGetMessages")]
    Messages { messages: Vec<ChatMessage> },

    /// Response to GetUserList
    #[serde(rename = "SrvRespGetUserList")]
    UserList { users: Vec<User> },

    /// Successful response without a body
    #[serde(rename = "RespSuccessNoBody")]
    SuccessNoBody,

    /// Unsuccessful response; carries the server's error description verbatim
    #[serde(rename = "RespError", alias = "SrvRespError")]
    Error {
        #[serde(default)]
        error_data: Option<serde_json::Value>,
    },

    /// Batch of server-initiated events, acknowledged as one unit
    #[serde(rename = "SrvEventList")]
    EventList { events: Vec<ChatEvent> },

    /// Any packet type this client version does not know; ignored
    #[serde(other)]
    Unknown,
}

impl ServerPayload {
    /// Return the payload's wire tag for logging
    pub fn type_name(&self) -> &'static str {
        match self {
            ServerPayload::JoinedChatList { .. } => "RespGetJoinedChatList",
            ServerPayload::Messages { .. } => "RespGetMessages",
            ServerPayload::UserList { .. } => "SrvRespGetUserList",
            ServerPayload::SuccessNoBody => "RespSuccessNoBody",
            ServerPayload::Error { .. } => "RespError",
            ServerPayload::EventList { .. } => "SrvEventList",
            ServerPayload::Unknown => "Unknown",
        }
    }
}

/// Events delivered inside a [`ServerPayload::EventList`] batch
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event_type")]
pub enum ChatEvent {
    /// The roster changed; only `action_type == "add"` is implemented,
    /// other actions are accepted and logged as unsupported
    #[serde(rename = "ChatListUpdate")]
    ChatListUpdate { action_type: String, chat_data: Chat },

    /// A new message arrived in a chat
    #[serde(rename = "ChatMessageEvent")]
    Message { message: ChatMessage },

    /// An existing message's text changed
    #[serde(rename = "ChatMessageEdited")]
    MessageEdited { message: ChatMessage },

    /// First-circle directory refresh: wholesale replace when `is_full`,
    /// merge otherwise
    #[serde(rename = "FirstCircleUserListUpdate")]
    FirstCircleUserList { users: Vec<User>, is_full: bool },

    /// Any event type this client version does not know; ignored
    #[serde(other)]
    Unknown,
}

impl ChatEvent {
    /// Return the event's wire tag for logging
    pub fn type_name(&self) -> &'static str {
        match self {
            ChatEvent::ChatListUpdate { .. } => "ChatListUpdate",
            ChatEvent::Message { .. } => "ChatMessageEvent",
            ChatEvent::MessageEdited { .. } => "ChatMessageEdited",
            ChatEvent::FirstCircleUserList { .. } => "FirstCircleUserListUpdate",
            ChatEvent::Unknown => "Unknown",
        }
    }
}
