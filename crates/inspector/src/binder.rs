//! Binds a classified activation batch to the message it influenced.
//!
//! The host reports world-info activation before the reply exists, so the
//! batch waits in a single pending slot until the next assistant message
//! arrives. The transition logic is the pure function [`step`]; [`Binder`]
//! owns the slot and applies the resulting [`Effect`] to a message store.
//!
//! ```text
//!            activated(≥1 group)              assistant message arrived
//!   ┌──────┐ ───────────────────▶ ┌─────────┐ ─────────────────────────▶ ┌──────┐
//!   │ Idle │                      │ Pending │                            │ Idle │
//!   └──────┘ ◀─────────────────── └─────────┘                            └──────┘
//!            activated(empty) / chat reset
//! ```
//!
//! Only one batch is ever pending. A new activation replaces the old one, so
//! overlapping generations are not tracked separately.

use crate::attachment::write_attachment;
use crate::grouper::PositionGroup;
use crate::organize;
use lorelens_config::{InspectorConfig, UnmatchedPolicy};
use lorelens_core::{ClassificationContext, MessageId, MessageStore, RawEntry, Result, Role};
use tracing::{debug, info};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum BinderState {
    #[default]
    Idle,
    Pending(Vec<PositionGroup>),
}

/// Inputs to [`step`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BinderEvent {
    /// A freshly classified activation batch (possibly empty).
    Activated(Vec<PositionGroup>),
    /// A message arrived. `author` is `None` when the store does not hold
    /// the message yet.
    MessageArrived {
        message_id: MessageId,
        author: Option<Role>,
        already_attached: bool,
    },
    /// Chat switched or cleared.
    ChatReset,
}

/// What the owner of the state has to do after a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Nothing,
    /// A batch is now pending.
    Staged { groups: usize, replaced: bool },
    /// A pending batch was thrown away.
    Discarded,
    /// Write the batch into the message.
    Attach {
        message_id: MessageId,
        groups: Vec<PositionGroup>,
    },
    /// The message already had data; the batch was consumed without writing.
    KeptExisting { message_id: MessageId },
}

/// The binder's transition function.
pub fn step(state: BinderState, event: BinderEvent) -> (BinderState, Effect) {
    match (state, event) {
        (state, BinderEvent::Activated(groups)) => {
            let replaced = matches!(state, BinderState::Pending(_));
            if groups.is_empty() {
                let effect = if replaced { Effect::Discarded } else { Effect::Nothing };
                (BinderState::Idle, effect)
            } else {
                let effect = Effect::Staged {
                    groups: groups.len(),
                    replaced,
                };
                (BinderState::Pending(groups), effect)
            }
        }

        (BinderState::Idle, BinderEvent::MessageArrived { .. }) => (BinderState::Idle, Effect::Nothing),

        (
            BinderState::Pending(groups),
            BinderEvent::MessageArrived {
                message_id,
                author,
                already_attached,
            },
        ) => match author {
            Some(Role::Assistant) if already_attached => {
                (BinderState::Idle, Effect::KeptExisting { message_id })
            }
            Some(Role::Assistant) => (BinderState::Idle, Effect::Attach { message_id, groups }),
            // User/system messages and messages the store does not have yet
            // leave the batch waiting.
            Some(Role::User) | Some(Role::System) | None => {
                (BinderState::Pending(groups), Effect::Nothing)
            }
        },

        (BinderState::Pending(_), BinderEvent::ChatReset) => (BinderState::Idle, Effect::Discarded),
        (BinderState::Idle, BinderEvent::ChatReset) => (BinderState::Idle, Effect::Nothing),
    }
}

/// Owns the pending slot for one chat session.
#[derive(Debug, Clone)]
pub struct Binder {
    state: BinderState,
    attachment_key: String,
    unmatched: UnmatchedPolicy,
}

impl Binder {
    pub fn new(attachment_key: impl Into<String>, unmatched: UnmatchedPolicy) -> Self {
        Self {
            state: BinderState::Idle,
            attachment_key: attachment_key.into(),
            unmatched,
        }
    }

    pub fn from_config(config: &InspectorConfig) -> Self {
        Self::new(config.attachment_key.clone(), config.unmatched)
    }

    pub fn state(&self) -> &BinderState {
        &self.state
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, BinderState::Pending(_))
    }

    pub fn attachment_key(&self) -> &str {
        &self.attachment_key
    }

    /// Classify a fresh activation batch and make it the pending one.
    pub fn on_activated(&mut self, entries: &[RawEntry], context: &ClassificationContext) -> Effect {
        let groups = organize(entries, context, self.unmatched);
        let effect = self.apply(BinderEvent::Activated(groups));
        match &effect {
            Effect::Staged { groups, replaced } => info!(
                character = context.character_label(),
                entries = entries.len(),
                groups,
                replaced,
                "World info activated, holding until the reply arrives"
            ),
            Effect::Discarded => debug!("Empty activation cleared the pending batch"),
            _ => debug!(entries = entries.len(), "Activation produced nothing to hold"),
        }
        effect
    }

    /// A message showed up in the store. Attaches the pending batch if it is
    /// an assistant message.
    pub fn on_message_arrived<S>(&mut self, store: &mut S, message_id: MessageId) -> Result<Effect>
    where
        S: MessageStore + ?Sized,
    {
        let message = store.message(message_id);
        let event = BinderEvent::MessageArrived {
            message_id,
            author: message.map(|m| m.role),
            already_attached: message.is_some_and(|m| m.has_attachment(&self.attachment_key)),
        };

        let effect = self.apply(event);
        match &effect {
            Effect::Attach { message_id, groups } => {
                write_attachment(store, *message_id, &self.attachment_key, groups)?;
                info!(
                    message_id,
                    groups = groups.len(),
                    "Attached activated world info to message"
                );
            }
            Effect::KeptExisting { message_id } => debug!(
                message_id,
                "Message already carries world info, pending batch dropped"
            ),
            _ => {}
        }
        Ok(effect)
    }

    /// Forget anything pending. Called when the chat changes or is cleared.
    pub fn on_chat_reset(&mut self) -> Effect {
        let effect = self.apply(BinderEvent::ChatReset);
        if effect == Effect::Discarded {
            debug!("Chat reset discarded a pending batch");
        }
        effect
    }

    fn apply(&mut self, event: BinderEvent) -> Effect {
        let state = std::mem::take(&mut self.state);
        let (next, effect) = step(state, event);
        self.state = next;
        effect
    }
}

impl Default for Binder {
    fn default() -> Self {
        Self::from_config(&InspectorConfig::default())
    }
}
