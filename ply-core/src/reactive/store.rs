//! Store Implementation
//!
//! The Store is the bundled reactive runtime. It owns the current value of
//! every primitive atom, caches computed atoms, and notifies subscribers.
//!
//! # How Reads Work
//!
//! 1. A primitive atom returns its stored value (the initial value until the
//!    first write).
//!
//! 2. A computed atom returns its cached value if it is clean.
//!
//! 3. Otherwise the store enters an evaluation context, runs the read
//!    function with itself as the [`Getter`], and records every atom read
//!    along the way as a dependency before caching the result. A result is
//!    only cached if no write reached its dependencies while it was being
//!    computed; otherwise the atom stays dirty and the next read retries.
//!
//! # How Writes Work
//!
//! Writing a primitive atom replaces its value, marks every transitive
//! dependent dirty, and notifies listeners. Dirty dependents stay lazy: only
//! the ones with listeners are re-evaluated right away, and their listeners
//! only run when the new value differs from the previous one.
//!
//! Writing a computed atom runs its write function with the store as the
//! [`Setter`]. That is how a write travels down a chain of layers.
//!
//! # Thread Safety
//!
//! The store is `Send + Sync` and cheap to clone. Locks are never held while
//! user read/write functions or listeners run, so callbacks may freely
//! re-enter the store.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::Value;
use smallvec::SmallVec;
use tracing::{debug, trace, warn};

use super::atom::{Atom, AtomId, AtomKind, ReadFn};
use super::config::StoreConfig;
use super::context::EvaluationContext;
use super::error::AtomError;
use super::listener::{Listener, ListenerId};
use super::record::Record;
use super::runtime::{Getter, Runtime, Setter, Subscription};
use crate::graph::DependencyGraph;

type ListenerList = SmallVec<[Listener; 2]>;

struct StoreInner {
    config: StoreConfig,

    /// Values, caches, and dependency edges, keyed by atom ID.
    graph: Mutex<DependencyGraph>,

    /// Registered listeners per atom.
    listeners: DashMap<AtomId, ListenerList>,
}

impl StoreInner {
    fn remove_listener(&self, atom: AtomId, id: ListenerId) {
        if let Some(mut listeners) = self.listeners.get_mut(&atom) {
            listeners.retain(|listener| listener.id() != id);
        }
        self.listeners.remove_if(&atom, |_, listeners| listeners.is_empty());
    }
}

/// A reactive store holding atom values.
///
/// # Example
///
/// ```rust,ignore
/// let store = Store::new();
/// let count = Atom::primitive(Record::new().with("count", 0));
///
/// store.set(&count, json!({"count": 1}))?;
/// assert_eq!(store.get(&count)?.get("count"), Some(&json!(1)));
/// ```
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

impl Store {
    /// Create a store with the default configuration.
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                config,
                graph: Mutex::new(DependencyGraph::new()),
                listeners: DashMap::new(),
            }),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    /// Number of listeners currently registered on `atom`.
    pub fn listener_count(&self, atom: &Atom) -> usize {
        self.inner
            .listeners
            .get(&atom.id())
            .map_or(0, |listeners| listeners.len())
    }

    /// Whether `atom` has a value that can be served without evaluation.
    pub fn is_cached(&self, atom: &Atom) -> bool {
        self.inner
            .graph
            .lock()
            .get_node(atom.id())
            .is_some_and(|node| node.clean_value().is_some())
    }

    fn read_primitive(&self, atom: &Atom) -> Record {
        let mut graph = self.inner.graph.lock();
        graph.ensure_node(atom).value().cloned().unwrap_or_default()
    }

    fn read_computed(&self, atom: &Atom, read: &ReadFn) -> Result<Record, AtomError> {
        let (cached, started_at) = {
            let graph = self.inner.graph.lock();
            let cached = graph
                .get_node(atom.id())
                .and_then(|node| node.clean_value().cloned());
            (cached, graph.generation())
        };
        if let Some(value) = cached {
            trace!(atom = %atom, "cache hit");
            return Ok(value);
        }

        let ctx = EvaluationContext::enter(atom.id(), self.inner.config.max_eval_depth)?;
        trace!(atom = %atom, depth = EvaluationContext::depth(), "evaluating");
        let getter: &dyn Getter = self;
        let result = read(getter);
        let mut dependencies = ctx.dependencies();
        drop(ctx);
        let value = result?;

        let mut graph = self.inner.graph.lock();
        graph.ensure_node(atom);
        graph.set_dependencies(atom.id(), &dependencies);
        dependencies.push(atom.id());
        if graph.changed_since(&dependencies, started_at) {
            // A write landed while evaluating; the result may predate it.
            debug!(atom = %atom, "dependency written during evaluation, not caching");
        } else {
            graph.ensure_node(atom).set_value(value.clone());
        }
        Ok(value)
    }

    fn write_primitive(&self, atom: &Atom, update: Value) -> Result<(), AtomError> {
        let next = Record::try_from(update)?;

        let invalidated = {
            let mut graph = self.inner.graph.lock();
            let node = graph.ensure_node(atom);
            if self.inner.config.skip_equal_writes && node.value() == Some(&next) {
                debug!(atom = %atom, "skipping write of an equal value");
                return Ok(());
            }
            node.set_value(next);
            graph.mark_changed(atom.id())
        };

        trace!(atom = %atom, invalidated = invalidated.len(), "primitive written");
        self.notify(atom.id(), &invalidated);
        Ok(())
    }

    fn listeners_of(&self, atom: AtomId) -> ListenerList {
        self.inner
            .listeners
            .get(&atom)
            .map(|listeners| listeners.clone())
            .unwrap_or_default()
    }

    /// Run the listeners affected by a write to `source`.
    fn notify(&self, source: AtomId, invalidated: &[AtomId]) {
        let mut pending = self.listeners_of(source);

        for &id in invalidated {
            let listeners = self.listeners_of(id);
            if listeners.is_empty() {
                continue;
            }

            let (atom, previous) = {
                let graph = self.inner.graph.lock();
                match graph.get_node(id) {
                    Some(node) => (node.atom().clone(), node.value().cloned()),
                    None => continue,
                }
            };

            match self.get(&atom) {
                Ok(current) if previous.as_ref() == Some(&current) => {
                    debug!(atom = %atom, "value unchanged, notification suppressed");
                    continue;
                }
                Ok(_) => {}
                Err(err) => {
                    warn!(atom = %atom, error = %err, "re-evaluation after write failed");
                }
            }
            pending.extend(listeners);
        }

        for listener in pending {
            listener.notify();
        }
    }
}

impl Getter for Store {
    fn get(&self, atom: &Atom) -> Result<Record, AtomError> {
        let value = match atom.kind() {
            AtomKind::Primitive { .. } => self.read_primitive(atom),
            AtomKind::Computed { read, .. } => self.read_computed(atom, read)?,
        };
        EvaluationContext::track_dependency(atom.id());
        Ok(value)
    }
}

impl Setter for Store {
    fn set(&self, atom: &Atom, update: Value) -> Result<(), AtomError> {
        match atom.kind() {
            AtomKind::Primitive { .. } => self.write_primitive(atom, update),
            AtomKind::Computed {
                write: Some(write), ..
            } => {
                trace!(atom = %atom, "running write");
                let setter: &dyn Setter = self;
                write(setter, update)
            }
            AtomKind::Computed { write: None, .. } => Err(AtomError::ReadOnly { atom: atom.id() }),
        }
    }
}

impl Runtime for Store {
    /// Mounts `atom` (evaluating it so its dependencies are known) and
    /// registers `listener`.
    fn subscribe(&self, atom: &Atom, listener: Listener) -> Result<Subscription, AtomError> {
        self.get(atom)?;

        let atom_id = atom.id();
        let listener_id = listener.id();
        self.inner.listeners.entry(atom_id).or_default().push(listener);

        let inner = Arc::downgrade(&self.inner);
        Ok(Subscription::new(move || {
            if let Some(inner) = inner.upgrade() {
                inner.remove_listener(atom_id, listener_id);
            }
        }))
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("config", &self.inner.config)
            .field("node_count", &self.inner.graph.lock().node_count())
            .field("watched_atoms", &self.inner.listeners.len())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
    use std::thread;
    use std::sync::OnceLock;

    fn record(value: Value) -> Record {
        Record::try_from(value).unwrap()
    }

    fn counting_listener() -> (Listener, Arc<AtomicI32>) {
        let calls = Arc::new(AtomicI32::new(0));
        let calls_clone = calls.clone();
        let listener = Listener::new(move || {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });
        (listener, calls)
    }

    /// Computed atom doubling field `n` of `base`, counting evaluations.
    fn doubled(base: &Atom) -> (Atom, Arc<AtomicI32>) {
        let evaluations = Arc::new(AtomicI32::new(0));
        let evaluations_clone = evaluations.clone();
        let base = base.clone();
        let atom = Atom::computed(move |get| {
            evaluations_clone.fetch_add(1, Ordering::SeqCst);
            let n = get.get(&base)?.get("n").and_then(Value::as_i64).unwrap_or(0);
            Ok(Record::new().with("doubled", n * 2))
        });
        (atom, evaluations)
    }

    #[test]
    fn primitive_starts_with_initial_value() {
        let store = Store::new();
        let atom = Atom::primitive(record(json!({"n": 1})));
        assert_eq!(store.get(&atom).unwrap(), record(json!({"n": 1})));
    }

    #[test]
    fn primitive_write_replaces_value() {
        let store = Store::new();
        let atom = Atom::primitive(record(json!({"n": 1, "m": 2})));

        store.set(&atom, json!({"n": 5})).unwrap();
        assert_eq!(store.get(&atom).unwrap(), record(json!({"n": 5})));
    }

    #[test]
    fn stores_are_independent() {
        let (first, second) = (Store::new(), Store::new());
        let atom = Atom::primitive(record(json!({"n": 1})));

        first.set(&atom, json!({"n": 2})).unwrap();
        assert_eq!(second.get(&atom).unwrap(), record(json!({"n": 1})));
    }

    #[test]
    fn primitive_write_requires_an_object() {
        let store = Store::new();
        let atom = Atom::primitive(Record::new());

        let err = store.set(&atom, json!(3)).unwrap_err();
        assert!(matches!(err, AtomError::NotAnObject { found: "number" }));
    }

    #[test]
    fn read_only_atoms_reject_writes() {
        let store = Store::new();
        let atom = Atom::computed(|_| Ok(Record::new()));

        let err = store.set(&atom, json!({})).unwrap_err();
        assert!(matches!(err, AtomError::ReadOnly { atom: id } if id == atom.id()));
    }

    #[test]
    fn computed_atom_is_cached_until_dependency_changes() {
        let store = Store::new();
        let base = Atom::primitive(record(json!({"n": 2})));
        let (atom, evaluations) = doubled(&base);

        assert!(!store.is_cached(&atom));
        assert_eq!(store.get(&atom).unwrap(), record(json!({"doubled": 4})));
        assert_eq!(store.get(&atom).unwrap(), record(json!({"doubled": 4})));
        assert_eq!(evaluations.load(Ordering::SeqCst), 1);
        assert!(store.is_cached(&atom));

        store.set(&base, json!({"n": 5})).unwrap();
        assert!(!store.is_cached(&atom));
        assert_eq!(store.get(&atom).unwrap(), record(json!({"doubled": 10})));
        assert_eq!(evaluations.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn writable_atom_runs_its_write() {
        let store = Store::new();
        let base = Atom::primitive(record(json!({"n": 0})));
        let increment = Atom::writable(
            {
                let base = base.clone();
                move |get| get.get(&base)
            },
            {
                let base = base.clone();
                move |set, update| {
                    let by = update.get("by").and_then(Value::as_i64).unwrap_or(1);
                    let n = set.get(&base)?.get("n").and_then(Value::as_i64).unwrap_or(0);
                    set.set(&base, json!({"n": n + by}))
                }
            },
        );

        store.set(&increment, json!({"by": 3})).unwrap();
        store.set(&increment, json!({})).unwrap();
        assert_eq!(store.get(&increment).unwrap(), record(json!({"n": 4})));
    }

    #[test]
    fn listeners_run_on_change_until_dropped() {
        let store = Store::new();
        let atom = Atom::primitive(record(json!({"n": 0})));
        let (listener, calls) = counting_listener();

        let subscription = store.subscribe(&atom, listener).unwrap();
        assert_eq!(store.listener_count(&atom), 1);

        store.set(&atom, json!({"n": 1})).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        drop(subscription);
        assert_eq!(store.listener_count(&atom), 0);

        store.set(&atom, json!({"n": 2})).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn equal_writes_are_skipped() {
        let store = Store::new();
        let atom = Atom::primitive(record(json!({"n": 0})));
        let (listener, calls) = counting_listener();
        let _subscription = store.subscribe(&atom, listener).unwrap();

        store.set(&atom, json!({"n": 0})).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn equal_writes_notify_when_configured() {
        let store = Store::with_config(StoreConfig {
            skip_equal_writes: false,
            ..StoreConfig::default()
        });
        let atom = Atom::primitive(record(json!({"n": 0})));
        let (listener, calls) = counting_listener();
        let _subscription = store.subscribe(&atom, listener).unwrap();

        store.set(&atom, json!({"n": 0})).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dependents_notify_only_when_their_value_changes() {
        let store = Store::new();
        let base = Atom::primitive(record(json!({"n": 1, "other": 0})));
        let (atom, _) = doubled(&base);
        let (listener, calls) = counting_listener();
        let _subscription = store.subscribe(&atom, listener).unwrap();

        store.set(&base, json!({"n": 1, "other": 9})).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        store.set(&base, json!({"n": 2, "other": 9})).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn cycles_are_reported() {
        let store = Store::new();
        let slot: Arc<OnceLock<Atom>> = Arc::new(OnceLock::new());
        let a = Atom::computed({
            let slot = slot.clone();
            move |get| match slot.get() {
                Some(b) => get.get(b),
                None => Ok(Record::new()),
            }
        });
        let b = Atom::computed({
            let a = a.clone();
            move |get| get.get(&a)
        });
        slot.set(b).unwrap();

        let err = store.get(&a).unwrap_err();
        assert!(matches!(err, AtomError::Cycle { atom } if atom == a.id()));
        assert!(!EvaluationContext::is_active());
    }

    #[test]
    fn depth_limit_applies_to_nested_reads() {
        let store = Store::with_config(StoreConfig {
            max_eval_depth: 2,
            ..StoreConfig::default()
        });
        let root = Atom::primitive(Record::new());
        let mut top = root;
        for _ in 0..3 {
            let below = top.clone();
            top = Atom::computed(move |get| get.get(&below));
        }

        let err = store.get(&top).unwrap_err();
        assert!(matches!(err, AtomError::DepthExceeded { limit: 2, .. }));
    }

    #[test]
    fn read_errors_propagate_and_are_not_cached() {
        let store = Store::new();
        let attempts = Arc::new(AtomicI32::new(0));
        let attempts_clone = attempts.clone();
        let atom = Atom::computed(move |_| {
            attempts_clone.fetch_add(1, Ordering::SeqCst);
            Err(AtomError::callback("backend offline"))
        });

        assert_eq!(store.get(&atom).unwrap_err().to_string(), "backend offline");
        assert!(store.get(&atom).is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn write_during_evaluation_is_not_cached_stale() {
        let store = Store::new();
        let root = Atom::primitive(record(json!({"n": 1})));
        let first_run = Arc::new(AtomicBool::new(true));
        let layered = Atom::computed({
            let (store, root, first_run) = (store.clone(), root.clone(), first_run.clone());
            move |get| {
                let n = get.get(&root)?.get("n").and_then(Value::as_i64).unwrap_or(0);
                if first_run.swap(false, Ordering::SeqCst) {
                    let (store, root) = (store.clone(), root.clone());
                    thread::spawn(move || store.set(&root, json!({"n": 2})))
                        .join()
                        .unwrap()
                        .unwrap();
                }
                Ok(Record::new().with("n", n).with("double", n * 2))
            }
        });

        // The in-flight read saw the old root, but must not be kept.
        assert_eq!(store.get(&layered).unwrap().get("n"), Some(&json!(1)));
        assert!(!store.is_cached(&layered));

        assert_eq!(store.get(&root).unwrap(), record(json!({"n": 2})));
        assert_eq!(
            store.get(&layered).unwrap(),
            record(json!({"n": 2, "double": 4}))
        );
        assert!(store.is_cached(&layered));
    }
}
