//! # chat-core
//!
//! Pure logic for the CSync chat client (no I/O, instant tests).
//!
//! This crate turns raw store notifications into typed changes and applies
//! them to ordered, deduplicated collections, without any network access.
//!
//! ## Design Philosophy
//!
//! All modules in this crate are **pure** - they take input and produce output
//! without side effects. This enables:
//! - Instant unit tests (no mocks, no async)
//! - Deterministic behavior (same input → same output)
//! - Easy reasoning about ordering and subscription transitions
//!
//! The actual I/O (listening, writing) is performed by `chat-client`, which
//! drives these building blocks from its coordinating queue.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod collection;
pub mod decode;
pub mod display;
pub mod slot;

pub use collection::{Change, CollectionChange, OrderedCollection, Reconcile};
pub use decode::{decode_message, decode_room, DecodeError};
pub use display::format_timestamp;
pub use slot::{Generation, Scope, SlotError, SubscriptionSlot};
