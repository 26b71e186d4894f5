//! Raw change notifications delivered by the store.

use crate::{AccessClass, KeyPath};

/// One change to one key, as delivered by a listen callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// The concrete key that changed.
    pub key: KeyPath,
    /// The stored value, if any.
    pub data: Option<String>,
    /// `false` when the key was deleted.
    pub exists: bool,
    /// Identity of the user who created the key.
    pub creator: Option<String>,
    /// Access-control tag of the key.
    pub acl: String,
}

impl Notification {
    /// A notification that `key` now holds `data`.
    pub fn upsert(
        key: KeyPath,
        data: impl Into<String>,
        creator: Option<String>,
        acl: AccessClass,
    ) -> Self {
        Self {
            key,
            data: Some(data.into()),
            exists: true,
            creator,
            acl: acl.id().to_string(),
        }
    }

    /// A notification that `key` was deleted.
    pub fn deletion(key: KeyPath, acl: AccessClass) -> Self {
        Self {
            key,
            data: None,
            exists: false,
            creator: None,
            acl: acl.id().to_string(),
        }
    }

    /// Whether the key carries the private access class.
    pub fn is_private(&self) -> bool {
        self.acl == AccessClass::Private.id()
    }
}
