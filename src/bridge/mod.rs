//! Bridge Client
//!
//! Defines the boundary to the external messaging bridge daemon. The bot
//! only ever uses two capabilities (send a message to a chat, poll for new
//! inbound messages) plus a graceful disconnect. Everything behind the
//! trait (session management, device pairing, delivery) is the daemon's
//! concern.

pub mod http;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use http::{BridgeSettings, HttpBridge};

/// Result type for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Errors that can occur talking to the bridge daemon
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("bridge prerequisites not met: {0}")]
    Prerequisites(String),

    #[error("bridge setup failed: {0}")]
    Setup(String),

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("bridge store error: {0}")]
    Store(String),

    #[error("bridge API error: {0}")]
    Api(String),

    #[error("message send failed: {0}")]
    SendFailed(String),

    #[error("bridge not connected")]
    NotConnected,
}

/// Inbound message delivered by the bridge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Bridge-assigned message ID
    pub id: String,
    /// Chat the message belongs to
    pub chat_jid: String,
    /// Sender JID (may carry a `:device` suffix)
    pub sender_jid: String,
    /// Plain text content; empty for media-only messages
    #[serde(default)]
    pub content: String,
    /// True when the message was sent from the bot's own account
    #[serde(default)]
    pub is_from_me: bool,
    /// Server receive time
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Core bridge client trait
#[async_trait]
pub trait BridgeClient: Send + Sync {
    /// Send a plain text message to a chat.
    async fn send_message(&self, chat_jid: &str, text: &str) -> BridgeResult<()>;

    /// Fetch inbound messages received since the previous poll.
    async fn poll_messages(&self) -> BridgeResult<Vec<InboundMessage>>;

    /// Disconnect gracefully.
    async fn disconnect(&self) -> BridgeResult<()>;
}

/// Type-erased bridge client for storage
pub type DynBridge = Arc<dyn BridgeClient>;

/// Whether two JIDs denote the same user. Device suffixes (`user:3@host`)
/// and the host part are ignored; `1234:7@s.whatsapp.net` matches
/// `1234@s.whatsapp.net`.
pub fn same_user(a: &str, b: &str) -> bool {
    let a = user_part(a);
    !a.is_empty() && a == user_part(b)
}

fn user_part(jid: &str) -> &str {
    let head = jid.split('@').next().unwrap_or(jid);
    head.split(':').next().unwrap_or(head)
}
