//! Lookup tables used to decide where a triggered entry came from.
//!
//! The host keeps these bindings in its own global state (enabled lorebooks,
//! the character card's primary and extra books, the chat's bound book). The
//! glue layer snapshots them once per activation event into a
//! [`ClassificationContext`] so classification stays a pure function.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Snapshot of the active world-info bindings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationContext {
    /// Lorebooks enabled globally for every chat.
    #[serde(default)]
    pub global_sources: BTreeSet<String>,

    /// The active character's primary lorebook.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character_primary: Option<String>,

    /// Extra lorebooks linked to the active character.
    #[serde(default)]
    pub character_additional: BTreeSet<String>,

    /// The lorebook bound to the current chat.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_source: Option<String>,

    /// Name of the active character, reported in activation logs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character_name: Option<String>,
}

impl ClassificationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_global(mut self, world: impl Into<String>) -> Self {
        self.global_sources.insert(world.into());
        self
    }

    pub fn with_character_primary(mut self, world: impl Into<String>) -> Self {
        self.character_primary = Some(world.into());
        self
    }

    pub fn with_character_additional(mut self, world: impl Into<String>) -> Self {
        self.character_additional.insert(world.into());
        self
    }

    pub fn with_chat_source(mut self, world: impl Into<String>) -> Self {
        self.chat_source = Some(world.into());
        self
    }

    pub fn with_character_name(mut self, name: impl Into<String>) -> Self {
        self.character_name = Some(name.into());
        self
    }

    /// Character name for log fields; group chats and the bare assistant
    /// have none.
    pub fn character_label(&self) -> &str {
        self.character_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or("(no character)")
    }

    /// Whether no binding at all is known.
    pub fn is_empty(&self) -> bool {
        self.global_sources.is_empty()
            && self.character_primary.is_none()
            && self.character_additional.is_empty()
            && self.chat_source.is_none()
    }
}

/// Supplies a fresh [`ClassificationContext`] when an activation arrives.
pub trait ContextProvider {
    fn snapshot(&self) -> ClassificationContext;
}

impl ContextProvider for ClassificationContext {
    fn snapshot(&self) -> ClassificationContext {
        self.clone()
    }
}

impl<F> ContextProvider for F
where
    F: Fn() -> ClassificationContext,
{
    fn snapshot(&self) -> ClassificationContext {
        self()
    }
}
