/// Shared types for the synchronization engine
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A registered user of the store service.
///
/// Server-assigned id; immutable once created. Cached client-side only to
/// render peer identity (name and color).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub avatar_color: String,
}

/// A two-party conversation thread.
///
/// The store service creates at most one conversation per unordered pair of
/// participants; requesting the same pair again returns the same id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub user_a: String,
    pub user_b: String,
    /// Denormalized preview of the most recent message text
    #[serde(default)]
    pub last_message_text: Option<String>,
}

impl Conversation {
    /// The other participant's id, if `me` is part of this conversation.
    pub fn peer_of(&self, me: &str) -> Option<&str> {
        if self.user_a == me {
            Some(&self.user_b)
        } else if self.user_b == me {
            Some(&self.user_a)
        } else {
            None
        }
    }
}

/// A message confirmed by the store service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub text: String,
    /// Server-assigned creation order, monotonic within a conversation
    pub order: u64,
    /// RFC3339 timestamp assigned by the store
    #[serde(default)]
    pub created_at: String,
}

/// Client-assigned identifier for a message that has not been confirmed yet.
///
/// Unique per session and never reused; cannot collide with server ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocalId(Uuid);

impl LocalId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for LocalId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "local-{}", self.0)
    }
}

/// Delivery status of a locally queued message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingStatus {
    InFlight,
    Failed,
}

/// A locally originated message awaiting confirmation (optimistic echo).
///
/// Owned by the reconciler's per-conversation pending set until resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingMessage {
    pub local_id: LocalId,
    pub conversation_id: String,
    pub sender_id: String,
    pub text: String,
    pub status: PendingStatus,
    /// RFC3339 timestamp of local submission
    pub queued_at: String,
}

impl PendingMessage {
    pub fn new(conversation_id: &str, sender_id: &str, text: &str) -> Self {
        Self {
            local_id: LocalId::new(),
            conversation_id: conversation_id.to_string(),
            sender_id: sender_id.to_string(),
            text: text.to_string(),
            status: PendingStatus::InFlight,
            queued_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// One entry of a reconciled conversation view.
///
/// Confirmed entries come first in server order; in-flight pending entries
/// follow. `id` is the server id for confirmed entries and the local id's
/// display form for pending ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewEntry {
    pub id: String,
    pub sender_id: String,
    pub text: String,
    pub is_mine: bool,
    pub pending: bool,
}

/// A render-ready message entry for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub id: String,
    pub text: String,
    pub is_mine: bool,
    pub author_color: String,
}

/// Events published by the session for the presentation layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    /// The conversation list was refetched (full replacement list)
    ConversationsUpdated { conversations: Vec<Conversation> },
    /// A conversation's confirmed window was refreshed from the store
    MessagesUpdated { conversation_id: String },
    /// An optimistic echo was queued and is visible in the view
    MessagePending {
        conversation_id: String,
        local_id: LocalId,
    },
    /// A sent message was confirmed by the store
    MessageConfirmed {
        conversation_id: String,
        message: Message,
    },
    /// A send attempt failed and its echo was removed
    SendFailed {
        conversation_id: String,
        local_id: LocalId,
        reason: String,
    },
}
