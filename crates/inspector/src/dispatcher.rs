//! Routes host events to the binder, one at a time, in delivery order.

use crate::attachment::{attached_knowledge, messages_with_knowledge};
use crate::binder::{Binder, Effect};
use crate::grouper::PositionGroup;
use crate::view::{PopupOutcome, PopupSurface, show_knowledge};
use lorelens_config::InspectorConfig;
use lorelens_core::{ContextProvider, HostEvent, MessageId, MessageStore};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// What handling one event amounted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// The binder transitioned (or declined to).
    Bound(Effect),
    /// The chat was reset. `annotated` lists messages in the new chat that
    /// already carry activation data, so the UI can decorate them.
    ChatReset {
        effect: Effect,
        annotated: Vec<MessageId>,
    },
    /// The event was not relevant under the current configuration.
    Ignored,
}

/// The inspector for one chat session: configuration plus the binder.
pub struct KnowledgeInspector {
    config: InspectorConfig,
    binder: Binder,
}

impl KnowledgeInspector {
    pub fn new(config: InspectorConfig) -> Self {
        let binder = Binder::from_config(&config);
        Self { config, binder }
    }

    pub fn config(&self) -> &InspectorConfig {
        &self.config
    }

    pub fn binder(&self) -> &Binder {
        &self.binder
    }

    /// Handle a single host event.
    ///
    /// Never fails: store errors are logged and the event is treated as a
    /// no-op for the rest of the session.
    pub fn handle<S, C>(&mut self, event: &HostEvent, store: &mut S, context: &C) -> Dispatch
    where
        S: MessageStore + ?Sized,
        C: ContextProvider + ?Sized,
    {
        debug!(event = event.kind(), "Handling host event");
        match event {
            HostEvent::WorldInfoActivated(entries) => {
                let snapshot = context.snapshot();
                Dispatch::Bound(self.binder.on_activated(entries, &snapshot))
            }
            HostEvent::MessageReceived(id) => self.message_arrived(store, *id),
            HostEvent::MessageRendered(id) => {
                if self.config.attach_on_render {
                    self.message_arrived(store, *id)
                } else {
                    Dispatch::Ignored
                }
            }
            HostEvent::ChatChanged | HostEvent::ChatCleared => {
                let effect = self.binder.on_chat_reset();
                let annotated = messages_with_knowledge(store, &self.config.attachment_key);
                info!(
                    event = event.kind(),
                    annotated = annotated.len(),
                    "Chat reset, pending world info cleared"
                );
                Dispatch::ChatReset { effect, annotated }
            }
        }
    }

    fn message_arrived<S>(&mut self, store: &mut S, message_id: MessageId) -> Dispatch
    where
        S: MessageStore + ?Sized,
    {
        match self.binder.on_message_arrived(store, message_id) {
            Ok(effect) => Dispatch::Bound(effect),
            Err(e) => {
                warn!(message_id, error = %e, "Could not attach world info to message");
                Dispatch::Bound(Effect::Nothing)
            }
        }
    }

    /// Drain events from the bus until it closes. Returns how many events
    /// were handled.
    pub async fn pump<S, C>(
        &mut self,
        events: &mut broadcast::Receiver<Arc<HostEvent>>,
        store: &mut S,
        context: &C,
    ) -> usize
    where
        S: MessageStore + ?Sized,
        C: ContextProvider + ?Sized,
    {
        let mut handled = 0;
        loop {
            match events.recv().await {
                Ok(event) => {
                    self.handle(&event, store, context);
                    handled += 1;
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event receiver lagged, some host events were missed");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        handled
    }

    /// The activation data attached to a message, if any.
    pub fn attached_knowledge<S>(&self, store: &S, message_id: MessageId) -> Option<Vec<PositionGroup>>
    where
        S: MessageStore + ?Sized,
    {
        attached_knowledge(store, message_id, &self.config.attachment_key)
    }

    /// Open the popup for a message.
    pub async fn show_knowledge<S, P>(&self, store: &S, message_id: MessageId, surface: &P) -> PopupOutcome
    where
        S: MessageStore + ?Sized,
        P: PopupSurface + ?Sized,
    {
        show_knowledge(store, message_id, &self.config.attachment_key, surface).await
    }
}

impl Default for KnowledgeInspector {
    fn default() -> Self {
        Self::new(InspectorConfig::default())
    }
}
