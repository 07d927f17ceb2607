//! Provenance classification: which binding pulled an entry into the prompt.

use lorelens_core::{ClassificationContext, RawEntry};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Label used for entries that match no active binding.
pub const UNCLASSIFIED_LABEL: &str = "Unclassified";

/// Where a triggered entry's lorebook is bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Bound to the current chat.
    Chat,
    /// The active character's primary lorebook.
    CharacterPrimary,
    /// One of the active character's extra lorebooks.
    CharacterAdditional,
    /// Enabled globally.
    Global,
}

impl Provenance {
    pub fn label(&self) -> &'static str {
        match self {
            Provenance::Chat => "Chat lore",
            Provenance::CharacterPrimary => "Character lore",
            Provenance::CharacterAdditional => "Character lore (additional)",
            Provenance::Global => "Global lore",
        }
    }
}

/// Label for an optional provenance, falling back to [`UNCLASSIFIED_LABEL`].
pub fn provenance_label(provenance: Option<Provenance>) -> &'static str {
    provenance.map_or(UNCLASSIFIED_LABEL, |p| p.label())
}

/// Classify an entry against the active bindings.
///
/// First match wins: chat, character primary, character additional, global.
/// A lorebook can be bound in several places at once; the most specific
/// binding is the one reported. Entries without a source lorebook, or whose
/// lorebook is not bound anywhere, get `None`.
pub fn classify(entry: &RawEntry, context: &ClassificationContext) -> Option<Provenance> {
    let Some(world) = entry.world_name() else {
        warn!(uid = entry.uid, "Activated entry has no source lorebook");
        return None;
    };

    if context.chat_source.as_deref() == Some(world) {
        Some(Provenance::Chat)
    } else if context.character_primary.as_deref() == Some(world) {
        Some(Provenance::CharacterPrimary)
    } else if context.character_additional.contains(world) {
        Some(Provenance::CharacterAdditional)
    } else if context.global_sources.contains(world) {
        Some(Provenance::Global)
    } else {
        None
    }
}
