//! Atom Handles
//!
//! An Atom is an addressable reactive cell. The handle itself holds no
//! current value: it describes *how* the value is produced, and the runtime
//! (see [`Store`](super::Store)) keeps the values, caches, and subscribers,
//! all keyed by atom identity.
//!
//! # Kinds
//!
//! - **Primitive**: holds an initial record. The runtime stores the current
//!   value and a write replaces it.
//! - **Computed**: holds a read function and, optionally, a write function.
//!   Both run against the runtime they are evaluated in, so they can read or
//!   write any other atom.
//!
//! Atoms are immutable once created and cheap to clone: clones share the
//! same identity.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::Value;

use super::error::AtomError;
use super::record::Record;
use super::runtime::{Getter, Setter};

/// Unique identifier for an atom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AtomId(u64);

impl AtomId {
    /// Generate a new unique atom ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for AtomId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AtomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "atom#{}", self.0)
    }
}

/// Read behavior of a computed atom.
pub type ReadFn = Arc<dyn Fn(&dyn Getter) -> Result<Record, AtomError> + Send + Sync>;

/// Write behavior of a computed atom.
pub type WriteFn = Arc<dyn Fn(&dyn Setter, Value) -> Result<(), AtomError> + Send + Sync>;

/// How an atom produces and accepts values.
pub enum AtomKind {
    /// A value cell. The runtime owns the current value.
    Primitive { initial: Record },

    /// A value derived from other atoms, optionally writable.
    Computed {
        read: ReadFn,
        write: Option<WriteFn>,
    },
}

struct AtomInner {
    id: AtomId,
    label: Option<String>,
    kind: AtomKind,
}

/// Handle to a reactive cell.
///
/// # Example
///
/// ```rust,ignore
/// let todos = Atom::primitive(Record::new().with("items", json!([])));
///
/// let count = Atom::computed({
///     let todos = todos.clone();
///     move |get| {
///         let items = get.get(&todos)?;
///         let len = items.get("items").and_then(|v| v.as_array()).map_or(0, |a| a.len());
///         Ok(Record::new().with("count", len))
///     }
/// });
/// ```
#[derive(Clone)]
pub struct Atom {
    inner: Arc<AtomInner>,
}

impl Atom {
    fn from_kind(kind: AtomKind) -> Self {
        Self {
            inner: Arc::new(AtomInner {
                id: AtomId::new(),
                label: None,
                kind,
            }),
        }
    }

    /// Create a primitive atom with the given initial value.
    pub fn primitive(initial: Record) -> Self {
        Self::from_kind(AtomKind::Primitive { initial })
    }

    /// Create a read-only computed atom.
    pub fn computed<R>(read: R) -> Self
    where
        R: Fn(&dyn Getter) -> Result<Record, AtomError> + Send + Sync + 'static,
    {
        Self::from_kind(AtomKind::Computed {
            read: Arc::new(read),
            write: None,
        })
    }

    /// Create a computed atom that also accepts writes.
    pub fn writable<R, W>(read: R, write: W) -> Self
    where
        R: Fn(&dyn Getter) -> Result<Record, AtomError> + Send + Sync + 'static,
        W: Fn(&dyn Setter, Value) -> Result<(), AtomError> + Send + Sync + 'static,
    {
        Self::from_kind(AtomKind::Computed {
            read: Arc::new(read),
            write: Some(Arc::new(write)),
        })
    }

    /// Attach a debug label.
    ///
    /// Only meaningful right after construction: the label belongs to this
    /// handle's identity, so labelling a shared handle yields a new atom.
    pub fn with_label(self, label: impl Into<String>) -> Self {
        let label = Some(label.into());
        match Arc::try_unwrap(self.inner) {
            Ok(mut inner) => {
                inner.label = label;
                Self { inner: Arc::new(inner) }
            }
            Err(shared) => {
                let kind = match &shared.kind {
                    AtomKind::Primitive { initial } => AtomKind::Primitive {
                        initial: initial.clone(),
                    },
                    AtomKind::Computed { read, write } => AtomKind::Computed {
                        read: Arc::clone(read),
                        write: write.clone(),
                    },
                };
                Self {
                    inner: Arc::new(AtomInner {
                        id: AtomId::new(),
                        label,
                        kind,
                    }),
                }
            }
        }
    }

    /// Get the atom's unique ID.
    pub fn id(&self) -> AtomId {
        self.inner.id
    }

    /// Get the debug label, if any.
    pub fn label(&self) -> Option<&str> {
        self.inner.label.as_deref()
    }

    /// How the atom produces its value.
    pub fn kind(&self) -> &AtomKind {
        &self.inner.kind
    }

    /// Whether the atom holds a value rather than computing one.
    pub fn is_primitive(&self) -> bool {
        matches!(self.inner.kind, AtomKind::Primitive { .. })
    }

    /// Whether writes to this atom are accepted.
    pub fn is_writable(&self) -> bool {
        match &self.inner.kind {
            AtomKind::Primitive { .. } => true,
            AtomKind::Computed { write, .. } => write.is_some(),
        }
    }
}

impl PartialEq for Atom {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Atom {}

impl Hash for Atom {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner.label {
            Some(label) => write!(f, "{}({})", label, self.inner.id),
            None => write!(f, "{}", self.inner.id),
        }
    }
}

impl fmt::Debug for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Atom")
            .field("id", &self.inner.id)
            .field("label", &self.inner.label)
            .field("primitive", &self.is_primitive())
            .field("writable", &self.is_writable())
            .finish()
    }
}
