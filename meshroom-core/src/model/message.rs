use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Author shown on notices synthesized by the room itself.
pub const SYSTEM_AUTHOR: &str = "System";

/// Random key for rendering. Carries no ordering or dedup meaning across peers.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Hash, Eq, PartialEq)]
pub struct MessageId(pub Uuid);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Eq, PartialEq)]
pub enum MessageBody {
    Text(String),
    /// Image encoded as a data URL.
    Image(String),
}

impl MessageBody {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MessageBody::Text(text) => Some(text),
            MessageBody::Image(_) => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ChatMessage {
    pub id: MessageId,
    pub author: String,
    pub body: MessageBody,
    /// Unix time in milliseconds, taken when the message entered the local log.
    pub timestamp: u64,
    pub origin_local: bool,
    pub is_system_notice: bool,
}

impl ChatMessage {
    fn build(author: String, body: MessageBody, origin_local: bool, is_system_notice: bool) -> Self {
        Self {
            id: MessageId::new(),
            author,
            body,
            timestamp: now_millis(),
            origin_local,
            is_system_notice,
        }
    }

    /// Message typed by the local participant.
    pub fn local(author: impl Into<String>, body: MessageBody) -> Self {
        Self::build(author.into(), body, true, false)
    }

    /// Message received from another participant.
    pub fn remote(author: impl Into<String>, body: MessageBody) -> Self {
        Self::build(author.into(), body, false, false)
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::build(
            SYSTEM_AUTHOR.to_owned(),
            MessageBody::Text(text.into()),
            false,
            true,
        )
    }

    pub fn joined(display_name: &str) -> Self {
        Self::system(format!("{display_name} joined the room"))
    }

    pub fn left(display_name: &str) -> Self {
        Self::system(format!("{display_name} left the room"))
    }

    pub fn text(&self) -> Option<&str> {
        self.body.as_text()
    }
}

/// Append-only, insertion-ordered message history of one room session.
#[derive(Debug, Clone, Default)]
pub struct MessageLog {
    messages: Vec<ChatMessage>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: ChatMessage) -> &ChatMessage {
        self.messages.push(message);
        &self.messages[self.messages.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter()
    }

    pub fn to_vec(&self) -> Vec<ChatMessage> {
        self.messages.clone()
    }

    /// Only used by a full room reset.
    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
