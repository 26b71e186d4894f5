//! Change event decoder.
//!
//! Turns a raw [`Notification`] into a typed [`Change`]:
//! - `exists = false` decodes to [`Change::Delete`] with the identity taken
//!   from the last key segment,
//! - `exists = true` with a valid payload decodes to [`Change::Upsert`],
//! - anything else is a [`DecodeError`]. Callers log and drop those; they
//!   never reach a collection.

use chat_types::{KeyPath, Message, MessageId, MessagePayload, Notification, Room, RoomId, TypesError};
use thiserror::Error;

use crate::Change;

/// Why a notification could not be decoded.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The entity still exists but the notification carries no data.
    #[error("no payload for existing key {key}")]
    MissingPayload {
        /// The notification key.
        key: String,
    },

    /// The last key segment is not a valid identity.
    #[error("invalid identity in key {key}: {source}")]
    InvalidKey {
        /// The notification key.
        key: String,
        /// Why the segment was rejected.
        #[source]
        source: TypesError,
    },

    /// The message payload is not JSON or lacks a required field.
    #[error("malformed message payload at {key}: {source}")]
    MalformedPayload {
        /// The notification key.
        key: String,
        /// The JSON error, naming the missing or mistyped field.
        #[source]
        source: serde_json::Error,
    },
}

fn room_id(key: &KeyPath) -> Result<RoomId, DecodeError> {
    RoomId::new(key.last_segment()).map_err(|source| DecodeError::InvalidKey {
        key: key.to_string(),
        source,
    })
}

fn message_id(key: &KeyPath) -> Result<MessageId, DecodeError> {
    MessageId::new(key.last_segment()).map_err(|source| DecodeError::InvalidKey {
        key: key.to_string(),
        source,
    })
}

/// Decode a notification from the room-list or room-detail scope.
///
/// The room name is the raw data, privacy follows the access-control tag,
/// and `allow_update` is true iff the key's creator is `session_user`.
pub fn decode_room(
    notification: &Notification,
    session_user: Option<&str>,
) -> Result<Change<Room>, DecodeError> {
    let id = room_id(&notification.key)?;
    if !notification.exists {
        return Ok(Change::Delete(id));
    }

    let name = notification
        .data
        .as_ref()
        .ok_or_else(|| DecodeError::MissingPayload {
            key: notification.key.to_string(),
        })?;

    let allow_update = match (notification.creator.as_deref(), session_user) {
        (Some(creator), Some(user)) => creator == user,
        _ => false,
    };

    Ok(Change::Upsert(Room::with_id(
        id,
        name.clone(),
        notification.is_private(),
        allow_update,
    )))
}

/// Decode a notification from a room's message scope.
pub fn decode_message(notification: &Notification) -> Result<Change<Message>, DecodeError> {
    let id = message_id(&notification.key)?;
    if !notification.exists {
        return Ok(Change::Delete(id));
    }

    let data = notification
        .data
        .as_deref()
        .ok_or_else(|| DecodeError::MissingPayload {
            key: notification.key.to_string(),
        })?;

    let payload: MessagePayload =
        serde_json::from_str(data).map_err(|source| DecodeError::MalformedPayload {
            key: notification.key.to_string(),
            source,
        })?;

    Ok(Change::Upsert(Message::from_payload(id, payload)))
}
