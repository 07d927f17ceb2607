//! Error types for the lorelens domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Nothing in here is fatal to a chat session: callers log and carry on.

use crate::message::MessageId;
use thiserror::Error;

/// The top-level error type for all lorelens operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Message store errors ---
    #[error("Message store error: {0}")]
    Store(#[from] StoreError),

    // --- Popup / rendering errors ---
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Message #{0} is not in the chat")]
    MessageNotFound(MessageId),

    #[error("Attachment '{key}' on message #{message_id} is unreadable: {reason}")]
    CorruptAttachment {
        message_id: MessageId,
        key: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Error)]
pub enum RenderError {
    #[error("Template rendering failed: {0}")]
    Template(String),

    #[error("Popup surface unavailable: {0}")]
    Surface(String),
}
