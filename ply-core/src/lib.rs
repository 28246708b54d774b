//! Ply Core
//!
//! This crate builds layered state on top of atoms: independently readable
//! and writable reactive cells. It implements:
//!
//! - Layers: decorations that add derived fields to an atom's value and
//!   intercept writes on their way to it
//! - Chains: layers stacked on layers, to any depth
//! - A lazy, memoizing store that evaluates atoms, tracks dependencies, and
//!   notifies subscribers
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: atoms, records, the runtime traits, and the store
//! - `graph`: dependency graph used by the store for caching and invalidation
//! - `compose`: layers, getter results, setter outcomes, dispatcher actions
//!
//! Layers only depend on the runtime traits, so they work with any runtime
//! implementing [`Getter`] and [`Setter`], not just [`Store`].
//!
//! # Example
//!
//! ```rust,ignore
//! use ply_core::{Atom, Layer, Record, SetterOutcome, Store, Getter, Setter};
//! use serde_json::json;
//!
//! let store = Store::new();
//! let todos = Atom::primitive(Record::try_from(json!({"items": ["a", "b"]}))?);
//!
//! // Add a derived field
//! let counted = todos.extend(&Layer::named("count").getter(|state| {
//!     let n = state.last.get("items").and_then(|v| v.as_array()).map_or(0, |a| a.len());
//!     Ok(Record::new().with("count", n))
//! }));
//!
//! // Refuse writes that would empty the list
//! let guarded = counted.extend(&Layer::named("non-empty").setter(|_, update| {
//!     let empty = update["items"].as_array().is_some_and(|a| a.is_empty());
//!     Ok(SetterOutcome { should_abort_next_setter: empty })
//! }));
//!
//! assert_eq!(store.get(&guarded)?.get("count"), Some(&json!(2)));
//!
//! store.set(&guarded, json!({"items": []}))?;
//! // Write was vetoed, the list is unchanged
//! assert_eq!(store.get(&guarded)?.get("count"), Some(&json!(2)));
//! ```

pub mod compose;
pub mod graph;
pub mod reactive;

pub use compose::{extend, is_atom, Derived, DispatcherAction, Layer, SetterOutcome, StateHelper, StateTracking};
pub use reactive::{
    Atom, AtomError, AtomId, AtomKind, Getter, Listener, Record, Runtime, Setter, Store,
    StoreConfig, Subscription,
};
