//! Identity types for rooms and messages.
//!
//! Both identities end up as the last segment of a key path, so they are
//! validated on construction: never empty, never containing `.`, never the
//! wildcard `*`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::keys::validate_segment;
use crate::TypesError;

/// Identity of a chat room.
///
/// Minted by the client (UUID v4) when a room is created locally, or taken
/// from the last segment of a `rooms.<roomId>` key path.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomId(String);

impl RoomId {
    /// Mint a fresh RoomId.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Create a RoomId from an existing identifier.
    pub fn new(id: impl Into<String>) -> Result<Self, TypesError> {
        let id = id.into();
        validate_segment(&id)?;
        Ok(Self(id))
    }

    /// Get the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RoomId({})", self.0)
    }
}

impl FromStr for RoomId {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for RoomId {
    type Error = TypesError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RoomId> for String {
    fn from(id: RoomId) -> Self {
        id.0
    }
}

/// Identity of a chat message.
///
/// Always minted by the sending client at compose time (UUID v4). Two
/// messages may share a timestamp but never a MessageId.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MessageId(String);

impl MessageId {
    /// Mint a fresh MessageId.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Create a MessageId from an existing identifier.
    pub fn new(id: impl Into<String>) -> Result<Self, TypesError> {
        let id = id.into();
        validate_segment(&id)?;
        Ok(Self(id))
    }

    /// Get the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MessageId({})", self.0)
    }
}

impl FromStr for MessageId {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for MessageId {
    type Error = TypesError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<MessageId> for String {
    fn from(id: MessageId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_room_ids_are_unique() {
        let a = RoomId::generate();
        let b = RoomId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn generated_ids_are_uuid_shaped() {
        let id = MessageId::generate();
        assert!(uuid::Uuid::parse_str(id.as_str()).is_ok());
    }

    #[test]
    fn room_id_rejects_dotted_identifier() {
        assert!(RoomId::new("a.b").is_err());
        assert!(RoomId::new("").is_err());
        assert!(RoomId::new("*").is_err());
    }

    #[test]
    fn room_id_accepts_plain_identifier() {
        let id: RoomId = "lobby".parse().unwrap();
        assert_eq!(id.as_str(), "lobby");
        assert_eq!(id.to_string(), "lobby");
    }

    #[test]
    fn message_id_debug_names_type() {
        let id = MessageId::new("m1").unwrap();
        assert_eq!(format!("{:?}", id), "MessageId(m1)");
    }

    #[test]
    fn room_id_deserialize_validates() {
        let ok: Result<RoomId, _> = serde_json::from_str("\"r1\"");
        assert!(ok.is_ok());
        let bad: Result<RoomId, _> = serde_json::from_str("\"r.1\"");
        assert!(bad.is_err());
    }
}
