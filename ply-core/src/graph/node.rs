//! Graph Nodes
//!
//! This module defines the per-atom entries that live in the dependency graph.

use std::collections::HashSet;

use crate::reactive::{Atom, AtomId, AtomKind, Record};

/// Dirty state of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DirtyState {
    /// The node's value is up-to-date.
    Clean,

    /// The node needs to recompute. It may still hold the previous value,
    /// which is used to decide whether subscribers must be notified.
    Dirty,
}

/// A node in the dependency graph.
#[derive(Debug)]
pub struct GraphNode {
    /// The atom this node tracks. Kept so the scheduler can re-evaluate
    /// dependents that are only known by ID.
    atom: Atom,

    dirty: DirtyState,

    /// Graph generation of the last write that reached this node.
    changed_at: u64,

    /// Stored value (sources) or last computed value (derived).
    value: Option<Record>,

    /// Atoms this node read during its last evaluation.
    dependencies: HashSet<AtomId>,

    /// Atoms that read this node during their last evaluation.
    dependents: HashSet<AtomId>,
}

impl GraphNode {
    /// Create the node for `atom`.
    ///
    /// Primitive atoms start clean, holding their initial value. Computed
    /// atoms start dirty with no value, forcing the first evaluation.
    pub fn new(atom: &Atom) -> Self {
        let (dirty, value) = match atom.kind() {
            AtomKind::Primitive { initial } => (DirtyState::Clean, Some(initial.clone())),
            AtomKind::Computed { .. } => (DirtyState::Dirty, None),
        };
        Self {
            atom: atom.clone(),
            dirty,
            changed_at: 0,
            value,
            dependencies: HashSet::new(),
            dependents: HashSet::new(),
        }
    }

    pub fn atom(&self) -> &Atom {
        &self.atom
    }

    pub fn is_clean(&self) -> bool {
        self.dirty == DirtyState::Clean
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = DirtyState::Dirty;
    }

    pub fn changed_at(&self) -> u64 {
        self.changed_at
    }

    /// Record that a write in `generation` reached this node.
    pub fn touch(&mut self, generation: u64) {
        self.changed_at = generation;
    }

    /// Current value, whatever the dirty state.
    pub fn value(&self) -> Option<&Record> {
        self.value.as_ref()
    }

    /// Value only if it can be served without recomputing.
    pub fn clean_value(&self) -> Option<&Record> {
        if self.is_clean() {
            self.value.as_ref()
        } else {
            None
        }
    }

    /// Replace the value and mark the node clean.
    pub fn set_value(&mut self, value: Record) {
        self.value = Some(value);
        self.dirty = DirtyState::Clean;
    }

    pub fn add_dependency(&mut self, atom: AtomId) {
        self.dependencies.insert(atom);
    }

    pub fn dependencies(&self) -> &HashSet<AtomId> {
        &self.dependencies
    }

    pub fn add_dependent(&mut self, atom: AtomId) {
        self.dependents.insert(atom);
    }

    pub fn remove_dependent(&mut self, atom: AtomId) {
        self.dependents.remove(&atom);
    }

    pub fn dependents(&self) -> &HashSet<AtomId> {
        &self.dependents
    }

    /// Clear all dependencies, returning the old set.
    pub fn take_dependencies(&mut self) -> HashSet<AtomId> {
        std::mem::take(&mut self.dependencies)
    }
}
