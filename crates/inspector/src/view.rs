//! What the popup gets to show, and the surface that shows it.
//!
//! How the popup is drawn is the host's business. lorelens prepares a
//! [`KnowledgeView`] and hands it to a [`PopupSurface`]; the view also
//! renders itself as plain text for logs and text-only hosts.

use crate::annotator::TriggerStatus;
use crate::attachment::attached_knowledge;
use crate::classifier::Provenance;
use crate::grouper::PositionGroup;
use async_trait::async_trait;
use lorelens_core::{MessageId, MessageStore, RenderError};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, error};

/// Counts shown in the popup header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total: usize,
    pub chat: usize,
    pub character: usize,
    pub character_additional: usize,
    pub global: usize,
    pub unclassified: usize,
    pub constant: usize,
    pub vector: usize,
    pub keyword: usize,
}

impl Summary {
    pub fn from_groups(groups: &[PositionGroup]) -> Self {
        let mut summary = Self::default();
        for entry in groups.iter().flat_map(|g| g.entries.iter()) {
            summary.total += 1;
            match entry.provenance {
                Some(Provenance::Chat) => summary.chat += 1,
                Some(Provenance::CharacterPrimary) => summary.character += 1,
                Some(Provenance::CharacterAdditional) => summary.character_additional += 1,
                Some(Provenance::Global) => summary.global += 1,
                None => summary.unclassified += 1,
            }
            match entry.status {
                TriggerStatus::Constant => summary.constant += 1,
                TriggerStatus::Vector => summary.vector += 1,
                TriggerStatus::Keyword => summary.keyword += 1,
            }
        }
        summary
    }
}

/// Everything needed to draw the popup for one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeView {
    pub message_id: MessageId,
    pub summary: Summary,
    pub groups: Vec<PositionGroup>,
}

impl KnowledgeView {
    pub fn new(message_id: MessageId, groups: Vec<PositionGroup>) -> Self {
        Self {
            message_id,
            summary: Summary::from_groups(&groups),
            groups,
        }
    }
}

impl fmt::Display for KnowledgeView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = &self.summary;
        writeln!(
            f,
            "Message #{}: {} activated entries (chat {}, character {}, additional {}, global {}, unclassified {})",
            self.message_id,
            s.total,
            s.chat,
            s.character,
            s.character_additional,
            s.global,
            s.unclassified
        )?;

        for group in &self.groups {
            writeln!(
                f,
                "{} {} ({})",
                group.position_emoji,
                group.position_label,
                group.entries.len()
            )?;
            for entry in &group.entries {
                write!(
                    f,
                    "  {} {} / {} [{}, {}",
                    entry.status_emoji,
                    entry.world,
                    entry.name,
                    entry.status_label,
                    entry.provenance_label
                )?;
                match (entry.depth, entry.role) {
                    (Some(depth), Some(role)) => write!(f, ", depth {depth} as {role}")?,
                    (Some(depth), None) => write!(f, ", depth {depth}")?,
                    _ => write!(f, ", order {}", entry.order)?,
                }
                writeln!(f, "]")?;
                if !entry.keys.is_empty() {
                    writeln!(f, "    keys: {}", entry.keys)?;
                }
                if let Some(logic) = &entry.selective_logic {
                    writeln!(f, "    secondary ({logic}): {}", entry.secondary_keys)?;
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// The host's popup and toast facilities.
#[async_trait]
pub trait PopupSurface: Send + Sync {
    /// Show the popup for a message.
    async fn render(&self, view: &KnowledgeView) -> Result<(), RenderError>;

    /// Show a short non-blocking notification.
    fn notify(&self, level: NoticeLevel, message: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopupOutcome {
    Shown,
    /// The message has no recorded activations.
    NoData,
    /// The surface failed; the user was notified.
    Failed,
}

/// Open the popup for a message. Never fails: missing data and render
/// errors become notifications, and the stored attachment is left as is.
pub async fn show_knowledge<S, P>(
    store: &S,
    message_id: MessageId,
    key: &str,
    surface: &P,
) -> PopupOutcome
where
    S: MessageStore + ?Sized,
    P: PopupSurface + ?Sized,
{
    let Some(groups) = attached_knowledge(store, message_id, key) else {
        surface.notify(
            NoticeLevel::Info,
            "No world info activations were recorded for this message.",
        );
        return PopupOutcome::NoData;
    };

    let view = KnowledgeView::new(message_id, groups);
    match surface.render(&view).await {
        Ok(()) => {
            debug!(message_id, entries = view.summary.total, "Knowledge popup shown");
            PopupOutcome::Shown
        }
        Err(e) => {
            error!(message_id, error = %e, "Failed to render knowledge popup");
            surface.notify(
                NoticeLevel::Error,
                "Could not display the world info popup. Check the log for details.",
            );
            PopupOutcome::Failed
        }
    }
}
