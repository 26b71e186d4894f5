//! # chat-types
//!
//! Entity model and key-path types for the CSync chat client.
//!
//! This crate provides the foundational types used across all chat crates:
//! - [`RoomId`], [`MessageId`] - Identity types (always valid key segments)
//! - [`Room`], [`Message`], [`UserIdentity`] - The entity model
//! - [`KeyPath`], [`AccessClass`] - Addressing and ACL classes of the store
//! - [`Notification`] - A raw change notification as delivered by the store
//! - [`TypesError`] - Error types

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod ids;
mod keys;
mod message;
mod notification;
mod room;
mod user;

pub use error::TypesError;
pub use ids::{MessageId, RoomId};
pub use keys::{AccessClass, KeyPath, ROOMS_SEGMENT, WILDCARD};
pub use message::{Message, MessagePayload};
pub use notification::Notification;
pub use room::Room;
pub use user::UserIdentity;
