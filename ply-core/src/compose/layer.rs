//! Layer Implementation
//!
//! A Layer decorates an existing atom. The decorated atom:
//!
//! - reads as the base atom's record with the getter's fields merged on top
//!   (getter fields win on conflict);
//! - on write, hands the update to the setter first, then forwards the same
//!   update to the base atom unless the setter aborted.
//!
//! The decorated atom is an ordinary writable atom, so it can be the base of
//! another layer. Applying layers repeatedly builds a chain:
//!
//! ```text
//!   write ──▶ setter(L3) ──▶ setter(L2) ──▶ setter(L1) ──▶ root
//!   read  ◀── merge(L3)  ◀── merge(L2)  ◀── merge(L1)  ◀── root
//! ```
//!
//! Any setter can stop the write at its layer. Layers above it have already
//! run and are not rolled back.
//!
//! # Defaults
//!
//! Without a getter a layer adds no fields; without a setter it never
//! aborts. A bare `Layer::new()` is therefore a pure pass-through.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, trace};

use super::guard::Derived;
use crate::reactive::{Atom, AtomError, Getter, Record, Setter};

/// State handed to a layer getter.
#[derive(Debug)]
pub struct StateTracking<'a> {
    /// Current state of the layer below.
    pub last: &'a Record,
}

/// State and runtime access handed to a layer setter.
///
/// `get` and `set` reach every atom the runtime knows about, not just the
/// base atom. Reading or writing an atom that depends on this layer from
/// inside its own setter creates a cycle.
pub struct StateHelper<'a> {
    /// Current state of the layer below.
    pub last: &'a Record,
    runtime: &'a dyn Setter,
}

impl<'a> StateHelper<'a> {
    /// Read any atom.
    pub fn get(&self, atom: &Atom) -> Result<Record, AtomError> {
        self.runtime.get(atom)
    }

    /// Write any atom.
    pub fn set(&self, atom: &Atom, update: Value) -> Result<(), AtomError> {
        self.runtime.set(atom, update)
    }

    /// The runtime the write is running in.
    pub fn runtime(&self) -> &'a dyn Setter {
        self.runtime
    }
}

impl fmt::Debug for StateHelper<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateHelper").field("last", self.last).finish()
    }
}

/// A setter's decision about the layer below.
///
/// Setters may return anything convertible into this: `()` or `None` mean
/// "no decision" and propagate, `bool` is the abort flag itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetterOutcome {
    /// Stop the write here; the base atom never sees the update.
    pub should_abort_next_setter: bool,
}

impl SetterOutcome {
    /// Forward the update to the base atom.
    pub const PROCEED: Self = Self {
        should_abort_next_setter: false,
    };

    /// Stop the write at this layer.
    pub const ABORT: Self = Self {
        should_abort_next_setter: true,
    };
}

impl From<()> for SetterOutcome {
    fn from(_: ()) -> Self {
        Self::PROCEED
    }
}

impl From<bool> for SetterOutcome {
    fn from(should_abort_next_setter: bool) -> Self {
        Self {
            should_abort_next_setter,
        }
    }
}

impl From<Option<SetterOutcome>> for SetterOutcome {
    fn from(outcome: Option<SetterOutcome>) -> Self {
        outcome.unwrap_or_default()
    }
}

type LayerGetter = Arc<dyn Fn(&StateTracking<'_>) -> Result<Derived, AtomError> + Send + Sync>;
type LayerSetter =
    Arc<dyn Fn(&StateHelper<'_>, &Value) -> Result<SetterOutcome, AtomError> + Send + Sync>;

fn layer_getter<F>(getter: F) -> LayerGetter
where
    F: Fn(&StateTracking<'_>) -> Result<Derived, AtomError> + Send + Sync + 'static,
{
    Arc::new(getter)
}

fn layer_setter<F>(setter: F) -> LayerSetter
where
    F: Fn(&StateHelper<'_>, &Value) -> Result<SetterOutcome, AtomError> + Send + Sync + 'static,
{
    Arc::new(setter)
}

/// A reusable decoration: optional getter and setter.
///
/// Build once, then [`apply`](Layer::apply) to as many atoms as needed.
///
/// # Example
///
/// ```rust,ignore
/// let with_total = Layer::named("total").getter(|state| {
///     let items = state.last.get("items").and_then(Value::as_array);
///     Ok(Record::new().with("total", items.map_or(0, |i| i.len())))
/// });
///
/// let cart = Atom::primitive(Record::new().with("items", json!([])));
/// let cart_with_total = cart.extend(&with_total);
/// ```
#[derive(Clone, Default)]
pub struct Layer {
    label: Option<String>,
    getter: Option<LayerGetter>,
    setter: Option<LayerSetter>,
}

impl Layer {
    /// A pass-through layer.
    pub fn new() -> Self {
        Self::default()
    }

    /// A pass-through layer whose atoms carry `label` in logs and `Debug`
    /// output.
    pub fn named(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Self::default()
        }
    }

    /// Set the read-side callback.
    pub fn getter<F, R>(mut self, getter: F) -> Self
    where
        F: Fn(&StateTracking<'_>) -> Result<R, AtomError> + Send + Sync + 'static,
        R: Into<Derived>,
    {
        self.getter = Some(layer_getter(move |state| getter(state).map(Into::into)));
        self
    }

    /// Set the write-side callback.
    pub fn setter<F, R>(mut self, setter: F) -> Self
    where
        F: Fn(&StateHelper<'_>, &Value) -> Result<R, AtomError> + Send + Sync + 'static,
        R: Into<SetterOutcome>,
    {
        self.setter = Some(layer_setter(move |helper, update| {
            setter(helper, update).map(Into::into)
        }));
        self
    }

    /// Label given to atoms this layer produces, if any.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Decorate `base`, producing a new writable atom.
    pub fn apply(&self, base: &Atom) -> Atom {
        let atom = Atom::writable(
            {
                let base = base.clone();
                let getter = self.getter.clone();
                move |get| read_layer(get, &base, getter.as_ref())
            },
            {
                let base = base.clone();
                let setter = self.setter.clone();
                move |set, update| write_layer(set, &base, setter.as_ref(), update)
            },
        );
        match &self.label {
            Some(label) => atom.with_label(label.clone()),
            None => atom,
        }
    }
}

impl fmt::Debug for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Layer")
            .field("label", &self.label)
            .field("has_getter", &self.getter.is_some())
            .field("has_setter", &self.setter.is_some())
            .finish()
    }
}

/// Decorate `base` with `layer`.
///
/// Same as `layer.apply(base)`.
pub fn extend(layer: &Layer, base: &Atom) -> Atom {
    layer.apply(base)
}

impl Atom {
    /// Decorate this atom with `layer`. Calls chain:
    /// `root.extend(&a).extend(&b)` puts `b` outermost.
    pub fn extend(&self, layer: &Layer) -> Atom {
        layer.apply(self)
    }
}

fn read_layer(
    get: &dyn Getter,
    base: &Atom,
    getter: Option<&LayerGetter>,
) -> Result<Record, AtomError> {
    let last = get.get(base)?;
    let possible = match getter {
        Some(getter) => getter(&StateTracking { last: &last })?,
        None => Derived::default(),
    };
    let derived = match possible {
        Derived::Atom(atom) => get.get(&atom)?,
        Derived::Fields(fields) => fields,
    };
    trace!(base = %base, fields = derived.len(), "layer read");
    Ok(last.merged(derived))
}

fn write_layer(
    set: &dyn Setter,
    base: &Atom,
    setter: Option<&LayerSetter>,
    update: Value,
) -> Result<(), AtomError> {
    let last = set.get(base)?;
    let outcome = match setter {
        Some(setter) => {
            let helper = StateHelper {
                last: &last,
                runtime: set,
            };
            setter(&helper, &update)?
        }
        None => SetterOutcome::PROCEED,
    };

    if outcome.should_abort_next_setter {
        debug!(base = %base, "setter aborted the write");
        return Ok(());
    }
    trace!(base = %base, "forwarding write");
    set.set(base, update)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
