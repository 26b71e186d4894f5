//! Key paths and access-control classes of the pub/sub store.
//!
//! Key paths are dot-separated hierarchical strings. A `*` as the final
//! segment denotes "all direct children" of the parent path. The layout used
//! by the chat client is fixed:
//!
//! ```text
//! rooms.*                    every room
//! rooms.<roomId>             one room (data = room name)
//! rooms.<roomId>.*           every message in a room
//! rooms.<roomId>.<messageId> one message (data = JSON payload)
//! ```

use std::fmt;
use std::str::FromStr;

use crate::{MessageId, RoomId, TypesError};

/// Root segment under which all rooms live.
pub const ROOMS_SEGMENT: &str = "rooms";

/// Final segment matching all direct children.
pub const WILDCARD: &str = "*";

pub(crate) fn validate_segment(segment: &str) -> Result<(), TypesError> {
    if segment.is_empty() || segment.contains('.') || segment == WILDCARD {
        return Err(TypesError::InvalidSegment(segment.to_string()));
    }
    Ok(())
}

/// A hierarchical key in the store.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct KeyPath {
    segments: Vec<String>,
}

impl KeyPath {
    /// Parse a dot-separated key path.
    ///
    /// The wildcard may only appear as the final segment.
    pub fn parse(path: &str) -> Result<Self, TypesError> {
        let invalid = |reason| TypesError::InvalidKeyPath {
            path: path.to_string(),
            reason,
        };

        if path.is_empty() {
            return Err(invalid("empty path"));
        }

        let segments: Vec<String> = path.split('.').map(str::to_string).collect();
        let last = segments.len() - 1;
        for (i, segment) in segments.iter().enumerate() {
            if segment.is_empty() {
                return Err(invalid("empty segment"));
            }
            if segment == WILDCARD && i != last {
                return Err(invalid("wildcard before final segment"));
            }
        }
        Ok(Self { segments })
    }

    /// `rooms.*`
    pub fn room_list() -> Self {
        Self {
            segments: vec![ROOMS_SEGMENT.to_string(), WILDCARD.to_string()],
        }
    }

    /// `rooms.<roomId>`
    pub fn room(room_id: &RoomId) -> Self {
        Self {
            segments: vec![ROOMS_SEGMENT.to_string(), room_id.to_string()],
        }
    }

    /// `rooms.<roomId>.*`
    pub fn room_messages(room_id: &RoomId) -> Self {
        Self {
            segments: vec![
                ROOMS_SEGMENT.to_string(),
                room_id.to_string(),
                WILDCARD.to_string(),
            ],
        }
    }

    /// `rooms.<roomId>.<messageId>`
    pub fn message(room_id: &RoomId, message_id: &MessageId) -> Self {
        Self {
            segments: vec![
                ROOMS_SEGMENT.to_string(),
                room_id.to_string(),
                message_id.to_string(),
            ],
        }
    }

    /// All segments, root first.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The final segment, which names the entity stored at this key.
    pub fn last_segment(&self) -> &str {
        // parse() and the constructors never produce an empty path
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    /// Number of segments.
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// The enclosing key, or `None` for a single-segment key.
    pub fn parent(&self) -> Option<Self> {
        if self.segments.len() < 2 {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// Append one segment. Wildcard keys cannot be extended.
    pub fn child(&self, segment: &str) -> Result<Self, TypesError> {
        if self.is_wildcard() {
            return Err(TypesError::InvalidKeyPath {
                path: self.to_string(),
                reason: "cannot extend a wildcard key",
            });
        }
        let mut segments = self.segments.clone();
        if segment == WILDCARD {
            segments.push(WILDCARD.to_string());
        } else {
            validate_segment(segment)?;
            segments.push(segment.to_string());
        }
        Ok(Self { segments })
    }

    /// Whether the final segment is the wildcard.
    pub fn is_wildcard(&self) -> bool {
        self.last_segment() == WILDCARD
    }

    /// Whether a concrete key is selected by this key used as a pattern.
    ///
    /// A concrete pattern matches only itself; a wildcard pattern matches
    /// keys exactly one level below its parent.
    pub fn matches(&self, key: &KeyPath) -> bool {
        if self.segments.len() != key.segments.len() {
            return false;
        }
        self.segments
            .iter()
            .zip(&key.segments)
            .enumerate()
            .all(|(i, (pattern, segment))| {
                (i == self.segments.len() - 1 && pattern == WILDCARD) || pattern == segment
            })
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

impl fmt::Debug for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyPath({})", self)
    }
}

impl FromStr for KeyPath {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Access-control class attached to every write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessClass {
    /// Only the creator may read or write. Used for private rooms.
    Private,
    /// Anyone may read; only the creator may write. Used for messages.
    PublicRead,
    /// Anyone may read and create children. Used for public rooms.
    PublicReadCreate,
}

impl AccessClass {
    /// The tag the store uses for this class.
    pub fn id(self) -> &'static str {
        match self {
            Self::Private => "$private",
            Self::PublicRead => "$publicRead",
            Self::PublicReadCreate => "$publicReadCreate",
        }
    }

    /// Look up a class by its store tag.
    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "$private" => Some(Self::Private),
            "$publicRead" => Some(Self::PublicRead),
            "$publicReadCreate" => Some(Self::PublicReadCreate),
            _ => None,
        }
    }

    /// Class for a room with the given visibility.
    pub fn for_room(is_private: bool) -> Self {
        if is_private {
            Self::Private
        } else {
            Self::PublicReadCreate
        }
    }
}

impl fmt::Display for AccessClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}
