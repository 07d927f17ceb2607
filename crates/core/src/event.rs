//! Host events: the only way the outside world drives lorelens.
//!
//! The chat host fires these from its own pipeline. Delivery is sequential:
//! subscribers see events in the order they were published.

use crate::entry::RawEntry;
use crate::message::MessageId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Every host event lorelens reacts to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HostEvent {
    /// World info was evaluated for a generation. An empty list is an
    /// explicit "nothing triggered" signal. Entries that cannot be read are
    /// skipped rather than failing the event.
    WorldInfoActivated(#[serde(deserialize_with = "crate::entry::lenient_batch")] Vec<RawEntry>),

    /// A message entered the chat store.
    MessageReceived(MessageId),

    /// A message finished rendering.
    MessageRendered(MessageId),

    /// The user switched to another chat.
    ChatChanged,

    /// The current chat was wiped.
    ChatCleared,
}

impl HostEvent {
    /// Short name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            HostEvent::WorldInfoActivated(_) => "world_info_activated",
            HostEvent::MessageReceived(_) => "message_received",
            HostEvent::MessageRendered(_) => "message_rendered",
            HostEvent::ChatChanged => "chat_changed",
            HostEvent::ChatCleared => "chat_cleared",
        }
    }
}

/// A broadcast-based event bus for host events.
///
/// Uses `tokio::sync::broadcast` so several consumers can observe the same
/// stream; each receiver sees events in publish order.
pub struct EventBus {
    sender: broadcast::Sender<Arc<HostEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: HostEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<HostEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
