//! palaver-engine: real-time chat client synchronization engine
//!
//! Maintains one persistent connection to a chat server and keeps a
//! consistent in-memory view of the chat roster, per-chat message windows,
//! and the user display-name directory. The engine renders nothing: a
//! presentation layer drives it through [`EngineHandle`] and receives
//! immutable state snapshots as [`EngineUpdate`] values.

pub mod config;
pub mod connection;
pub mod directory;
pub mod engine;
pub mod identity;
pub mod roster;
pub mod window;

pub use config::EngineConfig;
pub use connection::{Connection, ConnectionEvent, ConnectionState};
pub use directory::UserDirectory;
pub use engine::{EngineCommand, EngineHandle, EngineUpdate, SyncEngine};
pub use identity::Identity;
pub use roster::ChatRoster;
pub use window::{MessageWindow, WindowStore};
