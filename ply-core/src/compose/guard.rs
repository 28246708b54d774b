//! Getter results and the atom guard.
//!
//! A layer getter either computes its fields directly or points at another
//! atom whose current value should be used as the fields. [`Derived`] keeps
//! the two cases apart so the layer can handle both exhaustively.

use crate::reactive::{Atom, Record};

/// What a layer getter produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Derived {
    /// Fields computed directly.
    Fields(Record),

    /// An atom to read; its value supplies the fields.
    Atom(Atom),
}

impl Derived {
    /// The atom handle, if this result carries one.
    pub fn as_atom(&self) -> Option<&Atom> {
        match self {
            Derived::Atom(atom) => Some(atom),
            Derived::Fields(_) => None,
        }
    }
}

impl Default for Derived {
    /// No extra fields.
    fn default() -> Self {
        Derived::Fields(Record::new())
    }
}

impl From<Record> for Derived {
    fn from(fields: Record) -> Self {
        Derived::Fields(fields)
    }
}

impl From<Atom> for Derived {
    fn from(atom: Atom) -> Self {
        Derived::Atom(atom)
    }
}

impl From<&Atom> for Derived {
    fn from(atom: &Atom) -> Self {
        Derived::Atom(atom.clone())
    }
}

/// Returns true iff `value` is itself a readable atom rather than plain
/// fields.
pub fn is_atom(value: &Derived) -> bool {
    matches!(value, Derived::Atom(_))
}
