//! Exclusive subscription slots.
//!
//! Each logical [`Scope`] owns exactly one [`SubscriptionSlot`]:
//!
//! ```text
//! Idle ──activate──▶ Listening { handle, generation } ──release──▶ Idle
//! ```
//!
//! There is no `Listening → Listening` transition. Switching a slot to a new
//! key must release the old handle first, so two listeners on the same scope
//! never coexist. Every activation carries a fresh [`Generation`]; a
//! notification tagged with any other generation is stale and is discarded.

use std::fmt;
use thiserror::Error;

/// Monotonic tag identifying one activation of a slot.
pub type Generation = u64;

/// The three subscription scopes of the chat client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// `rooms.*`
    RoomList,
    /// `rooms.<roomId>`
    RoomDetail,
    /// `rooms.<roomId>.*`
    Messages,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RoomList => f.write_str("room-list"),
            Self::RoomDetail => f.write_str("room-detail"),
            Self::Messages => f.write_str("messages"),
        }
    }
}

/// Slot transition errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SlotError {
    /// Activation attempted while another handle is still registered.
    #[error("slot already listening (generation {generation})")]
    Occupied {
        /// Generation of the activation still in place.
        generation: Generation,
    },
}

/// Subscription state of one scope.
///
/// `H` is the store's listener handle, `L` whatever the owner routes events
/// to (typically a callback).
pub enum SubscriptionSlot<H, L> {
    /// No registration.
    Idle,
    /// One registration is active.
    Listening {
        /// Handle to release on unlisten.
        handle: H,
        /// Generation events must carry to be delivered.
        generation: Generation,
        /// Where events for this activation go.
        listener: L,
    },
}

impl<H, L> SubscriptionSlot<H, L> {
    /// Create an idle slot.
    pub fn new() -> Self {
        Self::Idle
    }

    /// Check if a registration is active.
    pub fn is_listening(&self) -> bool {
        matches!(self, Self::Listening { .. })
    }

    /// Generation of the active registration.
    pub fn generation(&self) -> Option<Generation> {
        match self {
            Self::Listening { generation, .. } => Some(*generation),
            Self::Idle => None,
        }
    }

    /// `Idle → Listening`. Fails if a registration is still active.
    pub fn activate(
        &mut self,
        handle: H,
        generation: Generation,
        listener: L,
    ) -> Result<(), SlotError> {
        if let Self::Listening {
            generation: active, ..
        } = self
        {
            return Err(SlotError::Occupied {
                generation: *active,
            });
        }
        *self = Self::Listening {
            handle,
            generation,
            listener,
        };
        Ok(())
    }

    /// `Listening → Idle`, returning the handle to unlisten.
    ///
    /// Releasing an idle slot is a no-op.
    pub fn release(&mut self) -> Option<H> {
        match std::mem::replace(self, Self::Idle) {
            Self::Listening { handle, .. } => Some(handle),
            Self::Idle => None,
        }
    }

    /// The listener of the active registration, whatever its generation.
    pub fn listener(&self) -> Option<&L> {
        match self {
            Self::Listening { listener, .. } => Some(listener),
            Self::Idle => None,
        }
    }

    /// The listener for an event tagged with `generation`, if that
    /// generation is still the active one.
    pub fn listener_for(&self, generation: Generation) -> Option<&L> {
        match self {
            Self::Listening {
                generation: active,
                listener,
                ..
            } if *active == generation => Some(listener),
            _ => None,
        }
    }
}

impl<H, L> Default for SubscriptionSlot<H, L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: fmt::Debug, L> fmt::Debug for SubscriptionSlot<H, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("Idle"),
            Self::Listening {
                handle, generation, ..
            } => f
                .debug_struct("Listening")
                .field("handle", handle)
                .field("generation", generation)
                .finish_non_exhaustive(),
        }
    }
}
