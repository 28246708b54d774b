//! Reactive Primitives
//!
//! This module implements the atom model the composition layers build on:
//! atom handles, record values, the runtime traits, and the bundled store.
//!
//! # Concepts
//!
//! ## Atoms
//!
//! An Atom is an addressable cell. Primitive atoms hold a value; computed
//! atoms derive one from other atoms and may accept writes. Atoms are
//! identified by handle, never by value.
//!
//! ## Runtime
//!
//! Read and write functions receive the runtime as `&dyn Getter` or
//! `&dyn Setter`. They never reach for global state, so the same atoms can
//! live in several stores, or be driven by a mock runtime in tests.
//!
//! ## Store
//!
//! The Store evaluates computed atoms lazily, caches them, tracks which
//! atoms each evaluation read, and invalidates caches on write.
//!
//! # Implementation Notes
//!
//! Dependency tracking is automatic. The store keeps a thread-local
//! evaluation stack: when an atom is read during another atom's evaluation,
//! the read is recorded as a dependency of the evaluating atom.

mod atom;
mod config;
mod context;
mod error;
mod listener;
mod record;
mod runtime;
mod store;

pub use atom::{Atom, AtomId, AtomKind, ReadFn, WriteFn};
pub use config::StoreConfig;
pub use context::EvaluationContext;
pub use error::AtomError;
pub use listener::{Listener, ListenerId};
pub use record::Record;
pub use runtime::{Getter, Runtime, Setter, Subscription};
pub use store::Store;
