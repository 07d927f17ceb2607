//! Chat message records and the store that holds them.
//!
//! The host owns the chat history. lorelens only ever reads a message's role
//! and writes a single key into its free-form `extra` map, so the store is
//! modelled as a small trait with an in-process [`ChatLog`] implementation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Index of a message in the chat, as reported by host events.
pub type MessageId = usize;

/// Who authored a message. Also used for the conversational role an
/// at-depth entry is anchored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The AI character
    Assistant,
    /// Narrator / system notes
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single message in the chat history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Display name of the author
    pub name: String,

    /// Who sent this message
    pub role: Role,

    /// The text content
    pub content: String,

    /// When the host recorded the message
    pub send_date: DateTime<Utc>,

    /// Free-form attachments persisted with the message
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl MessageRecord {
    fn new(name: impl Into<String>, role: Role, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role,
            content: content.into(),
            send_date: Utc::now(),
            extra: serde_json::Map::new(),
        }
    }

    /// Create a message written by the end user.
    pub fn user(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(name, Role::User, content)
    }

    /// Create a message written by the AI character.
    pub fn assistant(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(name, Role::Assistant, content)
    }

    /// Create a system/narrator message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new("System", Role::System, content)
    }

    pub fn is_assistant(&self) -> bool {
        self.role == Role::Assistant
    }

    /// Read an attachment by key.
    pub fn attachment(&self, key: &str) -> Option<&serde_json::Value> {
        self.extra.get(key)
    }

    pub fn has_attachment(&self, key: &str) -> bool {
        self.extra.contains_key(key)
    }

    /// Write an attachment once. Returns `false` and leaves the existing
    /// value alone if the key is already present.
    pub fn attach(&mut self, key: &str, value: serde_json::Value) -> bool {
        if self.extra.contains_key(key) {
            return false;
        }
        self.extra.insert(key.to_string(), value);
        true
    }
}

/// Read/write access to the host's ordered chat history.
pub trait MessageStore {
    /// Look up a message by id.
    fn message(&self, id: MessageId) -> Option<&MessageRecord>;

    /// Mutable lookup, used to write attachments.
    fn message_mut(&mut self, id: MessageId) -> Option<&mut MessageRecord>;

    /// Ids of every message currently in the store, oldest first.
    fn message_ids(&self) -> Vec<MessageId>;
}

/// An in-process chat history backed by a `Vec`. Message ids are indices,
/// matching how the host addresses its own chat array.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatLog {
    messages: Vec<MessageRecord>,
}

impl ChatLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message and return its id.
    pub fn push(&mut self, message: MessageRecord) -> MessageId {
        self.messages.push(message);
        self.messages.len() - 1
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Drop the whole history (chat cleared / switched).
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &MessageRecord> {
        self.messages.iter()
    }
}

impl MessageStore for ChatLog {
    fn message(&self, id: MessageId) -> Option<&MessageRecord> {
        self.messages.get(id)
    }

    fn message_mut(&mut self, id: MessageId) -> Option<&mut MessageRecord> {
        self.messages.get_mut(id)
    }

    fn message_ids(&self) -> Vec<MessageId> {
        (0..self.messages.len()).collect()
    }
}
