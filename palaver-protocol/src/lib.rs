//! palaver-protocol: Wire definitions for client-server chat synchronization
//!
//! This crate defines the data types, packet envelopes, and frame codec used
//! for communication between a palaver client and the chat server over a
//! persistent connection. Frames are newline-delimited JSON text.

pub mod codec;
pub mod packets;
pub mod types;

// Re-export main types at crate root
pub use codec::{ClientCodec, CodecError, ServerCodec};
pub use packets::{ChatEvent, ClientCommand, ClientPacket, MessageDraft, ServerPacket, ServerPayload};
pub use types::{Chat, ChatInfo, ChatMessage, User};

/// Default number of messages requested per pagination page
pub const DEFAULT_MESSAGE_PAGE_SIZE: u32 = 5;
