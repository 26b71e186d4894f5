//! The chat room entity.

use crate::RoomId;

/// A chat room.
///
/// Equality is identity-only: two copies with the same `room_id` are equal
/// even if their names or flags differ.
#[derive(Debug, Clone)]
pub struct Room {
    /// Stable identity.
    pub room_id: RoomId,
    /// Display name, also the sort key.
    pub room_name: String,
    /// Whether the room is stored with the private access class.
    pub is_private: bool,
    /// Whether the signed-in user created the room (computed at decode time).
    pub allow_update: bool,
}

impl Room {
    /// A new public room with a freshly minted identity, owned by the caller.
    pub fn new(room_name: impl Into<String>) -> Self {
        Self {
            room_id: RoomId::generate(),
            room_name: room_name.into(),
            is_private: false,
            allow_update: true,
        }
    }

    /// A room with every attribute given.
    pub fn with_id(
        room_id: RoomId,
        room_name: impl Into<String>,
        is_private: bool,
        allow_update: bool,
    ) -> Self {
        Self {
            room_id,
            room_name: room_name.into(),
            is_private,
            allow_update,
        }
    }
}

impl PartialEq for Room {
    fn eq(&self, other: &Self) -> bool {
        self.room_id == other.room_id
    }
}

impl Eq for Room {}
