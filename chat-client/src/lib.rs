//! # chat-client
//!
//! Client-side synchronization layer for the CSync chat app.
//!
//! This is the library that applications use to show live rooms and
//! messages backed by a hierarchical pub/sub store.
//!
//! ## Features
//!
//! - **Exclusive Subscriptions**: one listener per scope, swapped
//!   release-then-listen, with generation tags that drop late events
//! - **Single Coordinating Queue**: store callbacks only enqueue; one
//!   [`Coordinator`] decodes and reconciles
//! - **Store Abstraction**: pluggable store (in-memory mock for tests)
//! - **Pure Core**: decoding and ordering come from `chat-core`
//!
//! ## Example
//!
//! ```ignore
//! use csync_chat_client::{ChatConfig, MockStore, RoomBucket, RoomListView, SyncSession};
//!
//! let (session, coordinator) = SyncSession::connect(MockStore::new(), ChatConfig::default()).await?;
//! tokio::spawn(coordinator.run());
//! session.authenticate(Some("ada")).await?;
//!
//! let rooms = RoomListView::new(session.clone());
//! rooms.start_listening()?;
//! rooms.create("General", RoomBucket::Public);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod logging;
pub mod room;
pub mod room_list;
pub mod session;
pub mod store;

pub use config::{ChatConfig, ConfigError, StoreConfig};
pub use room::{MessageObserver, RoomObserver, RoomView};
pub use room_list::{RoomBucket, RoomListObserver, RoomListView};
pub use session::{AuthError, Coordinator, MessageCallback, RoomCallback, SessionError, SyncSession};
pub use store::{
    AuthData, ConnectOptions, ListenerId, MockStore, NotificationCallback, Store, StoreError,
    WriteRecord,
};
