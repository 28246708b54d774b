//! Evaluation Context
//!
//! The evaluation context tracks which computed atom is currently running.
//! This enables automatic dependency tracking: when an atom is read, the
//! store registers it as a dependency of the atom being evaluated.
//!
//! # Implementation
//!
//! We use a thread-local stack to track the currently executing evaluation.
//! Entering pushes the atom onto the stack, dropping the guard pops it.
//! Nested evaluations (a layer reading the layer below it) push nested
//! entries, so each evaluation only collects its own direct dependencies.
//!
//! The same stack detects cycles: entering an atom that is already on the
//! stack means the atom (transitively) reads itself.

use std::cell::RefCell;

use smallvec::SmallVec;

use super::atom::AtomId;
use super::error::AtomError;

thread_local! {
    static CONTEXT_STACK: RefCell<Vec<ContextEntry>> = const { RefCell::new(Vec::new()) };
}

/// An entry in the evaluation stack.
#[derive(Debug, Clone)]
struct ContextEntry {
    /// The atom being evaluated.
    atom: AtomId,
    /// Atoms read directly by this evaluation, in first-read order.
    dependencies: SmallVec<[AtomId; 4]>,
}

/// Guard that pops the context when dropped.
///
/// This keeps the stack balanced even if an evaluation panics.
pub struct EvaluationContext {
    atom: AtomId,
}

impl EvaluationContext {
    /// Enter a new evaluation for `atom`.
    ///
    /// Fails with [`AtomError::Cycle`] if `atom` is already being evaluated
    /// on this thread, and with [`AtomError::DepthExceeded`] if the stack is
    /// already `max_depth` entries deep.
    pub fn enter(atom: AtomId, max_depth: usize) -> Result<Self, AtomError> {
        CONTEXT_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            if stack.iter().any(|entry| entry.atom == atom) {
                return Err(AtomError::Cycle { atom });
            }
            if stack.len() >= max_depth {
                return Err(AtomError::DepthExceeded {
                    atom,
                    limit: max_depth,
                });
            }
            stack.push(ContextEntry {
                atom,
                dependencies: SmallVec::new(),
            });
            Ok(Self { atom })
        })
    }

    /// Check if an evaluation is running on this thread.
    pub fn is_active() -> bool {
        CONTEXT_STACK.with(|stack| !stack.borrow().is_empty())
    }

    /// Get the nesting depth of the current evaluation.
    pub fn depth() -> usize {
        CONTEXT_STACK.with(|stack| stack.borrow().len())
    }

    /// Record that the current evaluation read `atom`.
    ///
    /// No-op outside an evaluation.
    pub fn track_dependency(atom: AtomId) {
        CONTEXT_STACK.with(|stack| {
            if let Some(entry) = stack.borrow_mut().last_mut() {
                if !entry.dependencies.contains(&atom) {
                    entry.dependencies.push(atom);
                }
            }
        });
    }

    /// Get the dependencies collected by this evaluation so far.
    pub fn dependencies(&self) -> Vec<AtomId> {
        CONTEXT_STACK.with(|stack| {
            stack
                .borrow()
                .iter()
                .rev()
                .find(|entry| entry.atom == self.atom)
                .map(|entry| entry.dependencies.to_vec())
                .unwrap_or_default()
        })
    }
}

impl Drop for EvaluationContext {
    fn drop(&mut self) {
        CONTEXT_STACK.with(|stack| {
            let popped = stack.borrow_mut().pop();

            if let Some(entry) = popped {
                debug_assert_eq!(
                    entry.atom, self.atom,
                    "EvaluationContext mismatch: expected {:?}, got {:?}",
                    self.atom, entry.atom
                );
            }
        });
    }
}
