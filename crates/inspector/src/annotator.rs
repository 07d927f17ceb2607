//! Display-oriented annotation of a single triggered entry.
//!
//! Everything here is a pure function of the raw entry: annotating the same
//! entry twice yields identical output.

use crate::classifier::{Provenance, provenance_label};
use lorelens_core::entry::{DEFAULT_DEPTH, DEFAULT_ORDER};
use lorelens_core::{Position, RawEntry, Role, SelectiveLogic};
use serde::{Deserialize, Serialize};

/// Placeholder shown when the host did not say which lorebook an entry is from.
pub const UNKNOWN_WORLD: &str = "(unknown lorebook)";

/// Why an entry fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerStatus {
    /// Always on.
    Constant,
    /// Matched by vector similarity.
    Vector,
    /// Matched by keywords.
    Keyword,
}

impl TriggerStatus {
    pub fn label(&self) -> &'static str {
        match self {
            TriggerStatus::Constant => "constant",
            TriggerStatus::Vector => "vector",
            TriggerStatus::Keyword => "keyword",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            TriggerStatus::Constant => "🔵",
            TriggerStatus::Vector => "🧠",
            TriggerStatus::Keyword => "🟢",
        }
    }
}

/// Constant is checked before vectorized: a constant entry that is also
/// vectorized reports as constant.
pub fn trigger_status(entry: &RawEntry) -> TriggerStatus {
    if entry.constant {
        TriggerStatus::Constant
    } else if entry.vectorized {
        TriggerStatus::Vector
    } else {
        TriggerStatus::Keyword
    }
}

pub fn position_label(position: Position) -> String {
    match position {
        Position::BeforeCharacter => "before character definition".into(),
        Position::AfterCharacter => "after character definition".into(),
        Position::AuthorNoteTop => "author's note (top)".into(),
        Position::AuthorNoteBottom => "author's note (bottom)".into(),
        Position::AtDepth => "at depth".into(),
        Position::ExampleTop => "example messages (top)".into(),
        Position::ExampleBottom => "example messages (bottom)".into(),
        Position::Outlet => "outlet".into(),
        Position::Unknown(code) => format!("unknown position ({code})"),
    }
}

pub fn position_emoji(position: Position) -> &'static str {
    match position {
        Position::BeforeCharacter => "🟢",
        Position::AfterCharacter => "🔵",
        Position::AuthorNoteTop | Position::AuthorNoteBottom => "📝",
        Position::AtDepth => "🔗",
        Position::ExampleTop | Position::ExampleBottom => "💡",
        Position::Outlet => "🔌",
        Position::Unknown(_) => "❓",
    }
}

pub fn selective_logic_label(logic: SelectiveLogic) -> String {
    match logic {
        SelectiveLogic::AndAny => "AND ANY".into(),
        SelectiveLogic::NotAll => "NOT ALL".into(),
        SelectiveLogic::NotAny => "NOT ANY".into(),
        SelectiveLogic::AndAll => "AND ALL".into(),
        SelectiveLogic::Unknown(code) => format!("unknown logic ({code})"),
    }
}

/// Join keys for display. Blank keys are skipped.
pub fn format_keys(keys: &[String]) -> String {
    keys.iter()
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

/// A triggered entry with everything the popup needs precomputed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotatedEntry {
    pub world: String,
    pub uid: i64,
    /// Comment, or `Entry #<uid>`.
    pub name: String,
    pub content: String,
    pub keys: String,
    pub secondary_keys: String,
    /// Only set when there are secondary keys.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selective_logic: Option<String>,
    pub position: Position,
    pub position_label: String,
    pub position_emoji: String,
    /// Only set for at-depth entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<i64>,
    /// Only set for at-depth entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    pub order: i64,
    pub status: TriggerStatus,
    pub status_label: String,
    pub status_emoji: String,
    #[serde(default)]
    pub provenance: Option<Provenance>,
    pub provenance_label: String,
}

impl AnnotatedEntry {
    /// Attach a classification result.
    pub fn with_provenance(mut self, provenance: Option<Provenance>) -> Self {
        self.provenance = provenance;
        self.provenance_label = provenance_label(provenance).to_string();
        self
    }

    pub fn is_classified(&self) -> bool {
        self.provenance.is_some()
    }
}

/// Build the display form of an entry. Provenance starts out empty; see
/// [`AnnotatedEntry::with_provenance`].
pub fn annotate(entry: &RawEntry) -> AnnotatedEntry {
    let status = trigger_status(entry);
    let at_depth = entry.position.is_depth();
    let secondary_keys = format_keys(&entry.key_secondary);
    let selective_logic =
        (!secondary_keys.is_empty()).then(|| selective_logic_label(entry.selective_logic));

    AnnotatedEntry {
        world: entry.world_name().unwrap_or(UNKNOWN_WORLD).to_string(),
        uid: entry.uid,
        name: entry.display_name(),
        content: entry.content.clone(),
        keys: format_keys(&entry.key),
        secondary_keys,
        selective_logic,
        position: entry.position,
        position_label: position_label(entry.position),
        position_emoji: position_emoji(entry.position).to_string(),
        depth: at_depth.then(|| entry.depth.unwrap_or(DEFAULT_DEPTH)),
        role: if at_depth { entry.role } else { None },
        order: entry.order.unwrap_or(DEFAULT_ORDER),
        status,
        status_label: status.label().to_string(),
        status_emoji: status.emoji().to_string(),
        provenance: None,
        provenance_label: provenance_label(None).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> RawEntry {
        RawEntry {
            comment: Some("Silver Gate".into()),
            content: "A gate of moonlit silver.".into(),
            key: vec!["gate".into(), "silver".into()],
            ..RawEntry::new("Eldoria", 12)
        }
    }

    #[test]
    fn status_prefers_constant_over_vector() {
        let mut e = entry();
        assert_eq!(trigger_status(&e), TriggerStatus::Keyword);
        e.vectorized = true;
        assert_eq!(trigger_status(&e), TriggerStatus::Vector);
        e.constant = true;
        assert_eq!(trigger_status(&e), TriggerStatus::Constant);
        e.vectorized = false;
        assert_eq!(trigger_status(&e), TriggerStatus::Constant);
    }

    #[test]
    fn every_position_has_one_non_empty_label() {
        let mut labels: Vec<String> = Position::KNOWN.iter().map(|p| position_label(*p)).collect();
        assert!(labels.iter().all(|l| !l.is_empty()));
        labels.sort();
        labels.dedup();
        assert_eq!(labels.len(), Position::KNOWN.len());

        let unknown = position_label(Position::Unknown(11));
        assert!(unknown.contains("11"));
        assert!(!labels.contains(&unknown));
    }

    #[test]
    fn keys_are_joined_and_never_leak_placeholders() {
        let a = annotate(&entry());
        assert_eq!(a.keys, "gate, silver");
        assert_eq!(a.secondary_keys, "");
        assert!(a.selective_logic.is_none());

        let mut e = entry();
        e.key.clear();
        e.key_secondary = vec!["moon".into(), " ".into(), "night".into()];
        e.selective_logic = SelectiveLogic::NotAny;
        let a = annotate(&e);
        assert_eq!(a.keys, "");
        assert_eq!(a.secondary_keys, "moon, night");
        assert_eq!(a.selective_logic.as_deref(), Some("NOT ANY"));
    }

    #[test]
    fn depth_and_role_only_kept_at_depth() {
        let mut e = entry();
        e.position = Position::BeforeCharacter;
        e.depth = Some(9);
        e.role = Some(Role::User);
        let a = annotate(&e);
        assert!(a.depth.is_none());
        assert!(a.role.is_none());

        e.position = Position::AtDepth;
        let a = annotate(&e);
        assert_eq!(a.depth, Some(9));
        assert_eq!(a.role, Some(Role::User));

        e.depth = None;
        assert_eq!(annotate(&e).depth, Some(DEFAULT_DEPTH));
    }

    #[test]
    fn malformed_entry_gets_placeholders() {
        let e = RawEntry {
            world: None,
            ..RawEntry::default()
        };
        let a = annotate(&e);
        assert_eq!(a.world, UNKNOWN_WORLD);
        assert_eq!(a.name, "Entry #0");
        assert_eq!(a.order, DEFAULT_ORDER);
        assert_eq!(a.provenance_label, "Unclassified");
        assert_eq!(a.position_label, "at depth");
    }

    #[test]
    fn annotation_is_deterministic() {
        let mut e = entry();
        e.position = Position::Unknown(42);
        e.key_secondary = vec!["moon".into()];
        let first = serde_json::to_string(&annotate(&e)).unwrap();
        let second = serde_json::to_string(&annotate(&e)).unwrap();
        assert_eq!(first, second);
        assert_eq!(annotate(&e), annotate(&e));
    }

    #[test]
    fn provenance_can_be_attached() {
        let a = annotate(&entry()).with_provenance(Some(Provenance::CharacterPrimary));
        assert!(a.is_classified());
        assert_eq!(a.provenance_label, "Character lore");
    }
}
