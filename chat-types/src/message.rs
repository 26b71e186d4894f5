//! The chat message entity and its wire payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{MessageId, UserIdentity};

/// A chat message.
///
/// Messages are immutable once created. Equality is identity-only.
#[derive(Debug, Clone)]
pub struct Message {
    /// Identity, minted at compose time.
    pub message_id: MessageId,
    /// Text body.
    pub message: String,
    /// Identity of the author.
    pub creator_id: String,
    /// Display name of the author.
    pub creator_name: String,
    /// Avatar of the author.
    pub image_url: Option<String>,
    /// Creation instant, milliseconds since the Unix epoch. The sort key.
    pub timestamp: i64,
}

/// The JSON object stored at `rooms.<roomId>.<messageId>`.
///
/// Field order is not significant. `imageUrl` is omitted when absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePayload {
    /// Text body.
    pub message: String,
    /// Identity of the author.
    pub creator_id: String,
    /// Display name of the author.
    pub creator_name: String,
    /// Avatar of the author.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl Message {
    /// Compose a message from the given identity at the given instant.
    pub fn compose(text: impl Into<String>, author: &UserIdentity, timestamp: i64) -> Self {
        Self {
            message_id: MessageId::generate(),
            message: text.into(),
            creator_id: author.user_id.clone(),
            creator_name: author.name.clone(),
            image_url: author.small_image_url.clone(),
            timestamp,
        }
    }

    /// Compose a message stamped with the current time.
    pub fn compose_now(text: impl Into<String>, author: &UserIdentity) -> Self {
        Self::compose(text, author, Utc::now().timestamp_millis())
    }

    /// Rebuild a message from its key segment and decoded payload.
    pub fn from_payload(message_id: MessageId, payload: MessagePayload) -> Self {
        Self {
            message_id,
            message: payload.message,
            creator_id: payload.creator_id,
            creator_name: payload.creator_name,
            image_url: payload.image_url,
            timestamp: payload.timestamp,
        }
    }

    /// The wire payload for this message.
    pub fn payload(&self) -> MessagePayload {
        MessagePayload {
            message: self.message.clone(),
            creator_id: self.creator_id.clone(),
            creator_name: self.creator_name.clone(),
            image_url: self.image_url.clone(),
            timestamp: self.timestamp,
        }
    }

    /// Serialize to the text stored in the store.
    pub fn to_wire(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.payload())
    }

    /// Creation instant, if the timestamp is representable.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp)
    }
}

impl PartialEq for Message {
    fn eq(&self, other: &Self) -> bool {
        self.message_id == other.message_id
    }
}

impl Eq for Message {}
