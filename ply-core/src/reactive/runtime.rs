//! Runtime Interface
//!
//! Read and write functions never talk to a concrete store. They receive the
//! runtime they are evaluated in as a trait object:
//!
//! - [`Getter`] reads the current value of any atom.
//! - [`Setter`] additionally writes to any atom.
//! - [`Runtime`] additionally lets callers subscribe to changes.
//!
//! [`Store`](super::Store) is the bundled implementation. Anything else that
//! implements these traits (a mock in tests, a store embedded in another
//! framework) works with the composition layers unchanged.

use std::fmt;

use serde_json::Value;

use super::atom::Atom;
use super::error::AtomError;
use super::listener::Listener;
use super::record::Record;

/// Read access to atoms.
pub trait Getter {
    /// Get the current value of `atom`.
    fn get(&self, atom: &Atom) -> Result<Record, AtomError>;
}

/// Read and write access to atoms.
pub trait Setter: Getter {
    /// Write `update` to `atom`.
    fn set(&self, atom: &Atom, update: Value) -> Result<(), AtomError>;
}

/// A complete reactive runtime.
pub trait Runtime: Setter {
    /// Register `listener` to run whenever `atom` changes.
    ///
    /// The listener stays registered until the returned guard is dropped.
    fn subscribe(&self, atom: &Atom, listener: Listener) -> Result<Subscription, AtomError>;
}

/// Guard for a registered listener.
///
/// Dropping this guard unregisters the listener.
#[must_use = "dropping a Subscription unregisters its listener"]
pub struct Subscription {
    unsubscribe: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    /// Create a guard that runs `unsubscribe` when dropped.
    pub fn new<F>(unsubscribe: F) -> Self
    where
        F: FnOnce() + Send + Sync + 'static,
    {
        Self {
            unsubscribe: Some(Box::new(unsubscribe)),
        }
    }

    /// Unregister now instead of at drop time.
    pub fn cancel(mut self) {
        self.run();
    }

    fn run(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.run();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.unsubscribe.is_some())
            .finish()
    }
}
