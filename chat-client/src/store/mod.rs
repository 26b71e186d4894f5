//! Store abstraction for the chat client.
//!
//! This module describes the hierarchical key-value / pub-sub store the
//! client talks to. The store's replication, ACL enforcement and wire
//! protocol are its own business; the client only needs:
//! - `connect()` to reach a store instance
//! - `authenticate()` to obtain a session identity
//! - `listen()` / `unlisten()` to follow changes under a key path
//! - `write()` / `delete()` to change a key
//!
//! # Threading
//!
//! Listen callbacks may run on any thread, at any time after `listen()`
//! returns (or even during it, to replay existing values). They must be
//! cheap and must not block.
//!
//! # Example
//!
//! ```ignore
//! let store = MockStore::new();
//! store.connect(&options).await?;
//! let id = store.listen(&KeyPath::room_list(), callback)?;
//! store.write(&KeyPath::room(&room_id), "Lobby", AccessClass::PublicReadCreate).await?;
//! store.unlisten(id);
//! ```

mod mock;

pub use mock::{MockStore, WriteRecord};

use async_trait::async_trait;
use chat_types::{AccessClass, KeyPath, Notification};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Store errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Connection failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Not connected.
    #[error("not connected")]
    NotConnected,

    /// The authentication provider rejected the token.
    #[error("authentication rejected: {0}")]
    AuthenticationFailed(String),

    /// The key's access-control class forbids the operation.
    #[error("permission denied for key {0}")]
    PermissionDenied(String),

    /// Write or delete failed in transit.
    #[error("write failed: {0}")]
    WriteFailed(String),
}

/// Session data returned by a successful authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthData {
    /// Identity the store assigns to this session. Matches the `creator` of
    /// every key this session writes.
    pub uid: String,
    /// Provider that vouched for the token.
    pub provider: String,
}

/// Where and how to connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectOptions {
    /// Store host name.
    pub host: String,
    /// Store port.
    pub port: u16,
    /// Use TLS.
    pub use_ssl: bool,
    /// Keep the store's local cache in memory instead of on disk.
    pub db_in_memory: bool,
}

/// Handle returned by [`Store::listen`], passed back to [`Store::unlisten`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Wrap a raw listener number.
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the raw listener number.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener#{}", self.0)
    }
}

/// Callback invoked for every notification under a listened key path.
pub type NotificationCallback = Arc<dyn Fn(Notification) + Send + Sync>;

/// Store trait for following and changing key paths.
///
/// Implementations handle the underlying connection mechanism
/// (network client, in-memory mock, etc).
#[async_trait]
pub trait Store: Send + Sync + 'static {
    /// Connect to the store instance described by `options`.
    async fn connect(&self, options: &ConnectOptions) -> Result<(), StoreError>;

    /// Check if currently connected.
    fn is_connected(&self) -> bool;

    /// Exchange a provider token for a session identity.
    async fn authenticate(&self, provider: &str, token: &str) -> Result<AuthData, StoreError>;

    /// Start delivering notifications for `key` (which may end in `*`).
    fn listen(
        &self,
        key: &KeyPath,
        callback: NotificationCallback,
    ) -> Result<ListenerId, StoreError>;

    /// Stop delivering notifications to `listener`. Unknown ids are ignored.
    fn unlisten(&self, listener: ListenerId);

    /// Store `data` at `key` with the given access-control class.
    async fn write(&self, key: &KeyPath, data: &str, acl: AccessClass) -> Result<(), StoreError>;

    /// Delete `key`.
    async fn delete(&self, key: &KeyPath) -> Result<(), StoreError>;
}
