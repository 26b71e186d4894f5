//! Error types for chat-types.

use thiserror::Error;

/// Errors raised while building identities and key paths.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypesError {
    /// The string is not a well-formed dot-separated key path.
    #[error("invalid key path {path:?}: {reason}")]
    InvalidKeyPath {
        /// The rejected path.
        path: String,
        /// What is wrong with it.
        reason: &'static str,
    },

    /// The string cannot be used as a single key-path segment.
    #[error("invalid key segment {0:?}")]
    InvalidSegment(String),
}
