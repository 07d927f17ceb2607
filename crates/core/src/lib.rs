//! # lorelens core
//!
//! Domain types shared by every lorelens crate: the knowledge entries a chat
//! host reports when its world info activates, the message records those
//! activations get attached to, the lookup tables used to tell where an entry
//! came from, and the host events that drive the whole thing.
//!
//! The host itself (event dispatch, message storage, popups) is modelled as a
//! set of collaborators. Traits for them live here so the inspector crate can
//! be exercised without a live host:
//! - [`MessageStore`] for the ordered chat history
//! - [`ContextProvider`] for the active character/chat/world bindings
//! - [`EventBus`] for delivering [`HostEvent`]s in order

pub mod context;
pub mod entry;
pub mod error;
pub mod event;
pub mod message;

// Re-export key types at crate root for ergonomics
pub use context::{ClassificationContext, ContextProvider};
pub use entry::{Position, RawEntry, SelectiveLogic, decode_batch};
pub use error::{Error, RenderError, Result, StoreError};
pub use event::{EventBus, HostEvent};
pub use message::{ChatLog, MessageId, MessageRecord, MessageStore, Role};
