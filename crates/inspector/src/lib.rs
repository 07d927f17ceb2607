//! World-info activation inspector.
//!
//! When a chat host assembles a prompt it activates lorebook ("world info")
//! entries by keyword, vector similarity, or because they are constant. This
//! crate captures each activation batch, classifies and orders it, and binds
//! it to the assistant message it influenced so a popup can later show which
//! entries fired, why, and where they were inserted.
//!
//! # Pipeline
//!
//! ```text
//!  RawEntry[] ──▶ classify + annotate ──▶ group & sort ──▶ Binder ──▶ message.extra
//!                  (per entry)             (whole batch)    (pending slot)
//! ```
//!
//! The host is reached only through the collaborator traits in
//! `lorelens-core`; [`KnowledgeInspector`] wires them together for a session.

pub mod annotator;
pub mod attachment;
pub mod binder;
pub mod classifier;
pub mod dispatcher;
pub mod grouper;
pub mod view;

pub use annotator::{AnnotatedEntry, TriggerStatus, annotate};
pub use attachment::{attached_knowledge, messages_with_knowledge};
pub use binder::{Binder, BinderEvent, BinderState, Effect, step};
pub use classifier::{Provenance, classify};
pub use dispatcher::{Dispatch, KnowledgeInspector};
pub use grouper::{PositionGroup, group};
pub use view::{KnowledgeView, NoticeLevel, PopupOutcome, PopupSurface, Summary, show_knowledge};

use lorelens_config::UnmatchedPolicy;
use lorelens_core::{ClassificationContext, RawEntry};
use tracing::debug;

/// Classify, annotate and group one activation batch.
///
/// Entries whose lorebook matches no active binding are kept as
/// unclassified, or left out under [`UnmatchedPolicy::Drop`].
pub fn organize(
    entries: &[RawEntry],
    context: &ClassificationContext,
    unmatched: UnmatchedPolicy,
) -> Vec<PositionGroup> {
    let annotated = entries.iter().filter_map(|entry| {
        let provenance = classify(entry, context);
        if provenance.is_none() && unmatched == UnmatchedPolicy::Drop {
            debug!(
                world = entry.world_name().unwrap_or_default(),
                uid = entry.uid,
                "Dropping entry from an unbound lorebook"
            );
            return None;
        }
        Some(annotate(entry).with_provenance(provenance))
    });
    group(annotated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lorelens_core::Position;

    fn ctx() -> ClassificationContext {
        ClassificationContext::new()
            .with_global("Common Lore")
            .with_character_primary("Seraphina")
    }

    fn batch() -> Vec<RawEntry> {
        vec![
            RawEntry {
                position: Position::BeforeCharacter,
                ..RawEntry::new("Common Lore", 1)
            },
            RawEntry::new("Seraphina", 2),
            RawEntry {
                position: Position::BeforeCharacter,
                ..RawEntry::new("Unbound", 3)
            },
            RawEntry {
                world: None,
                ..RawEntry::new("", 4)
            },
        ]
    }

    #[test]
    fn keep_policy_surfaces_unmatched_entries() {
        let groups = organize(&batch(), &ctx(), UnmatchedPolicy::Keep);
        let entries: Vec<&AnnotatedEntry> = groups.iter().flat_map(|g| &g.entries).collect();
        assert_eq!(entries.len(), 4);
        assert_eq!(entries.iter().filter(|e| !e.is_classified()).count(), 2);
    }

    #[test]
    fn drop_policy_removes_unmatched_entries() {
        let groups = organize(&batch(), &ctx(), UnmatchedPolicy::Drop);
        let uids: Vec<i64> = groups
            .iter()
            .flat_map(|g| g.entries.iter().map(|e| e.uid))
            .collect();
        assert_eq!(uids, vec![1, 2]);
        assert!(groups.iter().all(|g| !g.is_empty()));
    }

    #[test]
    fn organizing_is_deterministic() {
        let mut reversed = batch();
        reversed.reverse();
        assert_eq!(
            organize(&batch(), &ctx(), UnmatchedPolicy::Keep),
            organize(&reversed, &ctx(), UnmatchedPolicy::Keep)
        );
    }
}
