//! Grouping annotated entries by insertion position, and ordering both the
//! groups and the entries inside them.
//!
//! # Group order
//!
//! Fixed, following the order the host assembles its prompt in:
//!
//! | Rank | Position                  |
//! |------|---------------------------|
//! | 0    | before character definition |
//! | 1    | after character definition  |
//! | 2    | example messages (top)      |
//! | 3    | example messages (bottom)   |
//! | 4    | author's note (top)         |
//! | 5    | author's note (bottom)      |
//! | 6    | at depth                    |
//! | 7    | outlet                      |
//! | 8    | unknown positions, by raw value |
//!
//! # Entry order
//!
//! At depth: depth descending, then role (assistant, user, system, none),
//! then uid ascending, then lorebook name.
//!
//! Everywhere else: `order` ascending, then lorebook name, entry name and
//! uid. Depth is never consulted outside the at-depth group.

use crate::annotator::{AnnotatedEntry, position_emoji, position_label};
use lorelens_core::entry::DEFAULT_DEPTH;
use lorelens_core::{Position, Role};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// All entries inserted at one position, already sorted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionGroup {
    pub position: Position,
    pub position_label: String,
    pub position_emoji: String,
    pub entries: Vec<AnnotatedEntry>,
}

impl PositionGroup {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Sort key of a position in the group sequence.
pub fn position_rank(position: Position) -> (u8, i64) {
    match position {
        Position::BeforeCharacter => (0, 0),
        Position::AfterCharacter => (1, 0),
        Position::ExampleTop => (2, 0),
        Position::ExampleBottom => (3, 0),
        Position::AuthorNoteTop => (4, 0),
        Position::AuthorNoteBottom => (5, 0),
        Position::AtDepth => (6, 0),
        Position::Outlet => (7, 0),
        Position::Unknown(code) => (8, code),
    }
}

/// Lower ranks sort first.
fn role_rank(role: Option<Role>) -> u8 {
    match role {
        Some(Role::Assistant) => 0,
        Some(Role::User) => 1,
        Some(Role::System) => 2,
        None => 3,
    }
}

fn compare_at_depth(a: &AnnotatedEntry, b: &AnnotatedEntry) -> Ordering {
    let depth_a = a.depth.unwrap_or(DEFAULT_DEPTH);
    let depth_b = b.depth.unwrap_or(DEFAULT_DEPTH);
    depth_b
        .cmp(&depth_a)
        .then_with(|| role_rank(a.role).cmp(&role_rank(b.role)))
        .then_with(|| a.uid.cmp(&b.uid))
        .then_with(|| a.world.cmp(&b.world))
}

fn compare_by_order(a: &AnnotatedEntry, b: &AnnotatedEntry) -> Ordering {
    a.order
        .cmp(&b.order)
        .then_with(|| a.world.cmp(&b.world))
        .then_with(|| a.name.cmp(&b.name))
        .then_with(|| a.uid.cmp(&b.uid))
}

/// Comparator for entries sharing `position`.
pub fn compare_entries(position: Position, a: &AnnotatedEntry, b: &AnnotatedEntry) -> Ordering {
    if position.is_depth() {
        compare_at_depth(a, b)
    } else {
        compare_by_order(a, b)
    }
}

/// Group entries by position. Groups come back in rank order, entries inside
/// each group sorted, and no group is ever empty.
pub fn group<I>(entries: I) -> Vec<PositionGroup>
where
    I: IntoIterator<Item = AnnotatedEntry>,
{
    let mut buckets: BTreeMap<(u8, i64), Vec<AnnotatedEntry>> = BTreeMap::new();
    for entry in entries {
        buckets
            .entry(position_rank(entry.position))
            .or_default()
            .push(entry);
    }

    buckets
        .into_values()
        .filter_map(|mut entries| {
            let position = entries.first()?.position;
            entries.sort_by(|a, b| compare_entries(position, a, b));
            Some(PositionGroup {
                position,
                position_label: position_label(position),
                position_emoji: position_emoji(position).to_string(),
                entries,
            })
        })
        .collect()
}
