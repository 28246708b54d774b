//! Error type shared by the store and the composition layers.

use std::error::Error as StdError;

use super::atom::AtomId;

/// Errors raised while reading or writing atoms.
///
/// Errors returned by user callbacks (getters, setters, read and write
/// functions) travel through the runtime unchanged; the store never
/// re-wraps an `AtomError` it receives from a callback.
#[derive(Debug, thiserror::Error)]
pub enum AtomError {
    /// The atom has no write behavior.
    #[error("{atom} is read-only")]
    ReadOnly { atom: AtomId },

    /// The atom was read while it was already being evaluated.
    #[error("cyclic read detected while evaluating {atom}")]
    Cycle { atom: AtomId },

    /// Nested evaluation went deeper than the configured limit.
    #[error("evaluation depth limit of {limit} exceeded at {atom}")]
    DepthExceeded { atom: AtomId, limit: usize },

    /// A value that should have been an object was something else.
    #[error("expected an object value, found {found}")]
    NotAnObject { found: &'static str },

    /// An update could not be decoded as a dispatcher action.
    #[error("malformed action: {0}")]
    Action(#[from] serde_json::Error),

    /// Error raised by a user supplied callback.
    #[error(transparent)]
    Callback(Box<dyn StdError + Send + Sync>),
}

impl AtomError {
    /// Wrap an arbitrary error raised inside a getter or setter.
    pub fn callback(err: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self::Callback(err.into())
    }
}
