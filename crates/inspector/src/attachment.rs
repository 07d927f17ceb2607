//! Reading and writing the grouped activation data stored on a message.

use crate::grouper::PositionGroup;
use lorelens_core::{MessageId, MessageStore, Result, StoreError};
use tracing::warn;

/// Write `groups` into the message's `extra` map under `key`.
///
/// Write-once: returns `Ok(false)` if the message already carries the key or
/// is not in the store.
pub fn write_attachment<S>(
    store: &mut S,
    message_id: MessageId,
    key: &str,
    groups: &[PositionGroup],
) -> Result<bool>
where
    S: MessageStore + ?Sized,
{
    let Some(message) = store.message_mut(message_id) else {
        return Ok(false);
    };
    if message.has_attachment(key) {
        return Ok(false);
    }
    let value = serde_json::to_value(groups)?;
    Ok(message.attach(key, value))
}

/// Read the attachment back, reporting unreadable data as an error.
pub fn read_attachment<S>(
    store: &S,
    message_id: MessageId,
    key: &str,
) -> Result<Option<Vec<PositionGroup>>>
where
    S: MessageStore + ?Sized,
{
    let Some(value) = store
        .message(message_id)
        .and_then(|message| message.attachment(key))
    else {
        return Ok(None);
    };

    let groups = serde_json::from_value(value.clone()).map_err(|e| {
        StoreError::CorruptAttachment {
            message_id,
            key: key.to_string(),
            reason: e.to_string(),
        }
    })?;
    Ok(Some(groups))
}

/// The grouped activation data attached to a message, if any.
///
/// Unreadable attachments (written by an incompatible version, or edited by
/// hand) are logged and reported as absent.
pub fn attached_knowledge<S>(store: &S, message_id: MessageId, key: &str) -> Option<Vec<PositionGroup>>
where
    S: MessageStore + ?Sized,
{
    match read_attachment(store, message_id, key) {
        Ok(groups) => groups,
        Err(e) => {
            warn!(message_id, error = %e, "Ignoring unreadable knowledge attachment");
            None
        }
    }
}

/// Ids of every message that carries an attachment under `key`, oldest first.
pub fn messages_with_knowledge<S>(store: &S, key: &str) -> Vec<MessageId>
where
    S: MessageStore + ?Sized,
{
    store
        .message_ids()
        .into_iter()
        .filter(|id| {
            store
                .message(*id)
                .is_some_and(|message| message.has_attachment(key))
        })
        .collect()
}
