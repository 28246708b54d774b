//! Layer Composition
//!
//! This module turns one atom into a stack of atoms, each layer adding
//! derived fields on read and intercepting writes on their way down.
//!
//! # Concepts
//!
//! ## Layers
//!
//! A [`Layer`] pairs an optional getter with an optional setter. Applying it
//! to a base atom produces a new writable atom; applying another layer to
//! that atom produces a chain. The chain's shape is fixed by the order of
//! application.
//!
//! ## Getter results
//!
//! A getter returns either plain fields or another atom ([`Derived`]).
//! Atoms are read through the runtime, so the layer tracks them as
//! dependencies like any other read.
//!
//! ## Setter outcomes
//!
//! A setter decides whether the update continues to the layer below. The
//! decision only reaches the adjacent base atom: a layer cannot cancel
//! layers above it, which have already run.

mod action;
mod guard;
mod layer;

pub use action::DispatcherAction;
pub use guard::{is_atom, Derived};
pub use layer::{extend, Layer, SetterOutcome, StateHelper, StateTracking};
