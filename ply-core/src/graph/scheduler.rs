//! Invalidation Scheduler
//!
//! The dependency graph decides which cached values a write makes stale,
//! and in which order they should be re-evaluated.
//!
//! # Algorithm
//!
//! 1. When a source node changes, walk its dependents breadth first.
//! 2. Mark every reached node dirty. Values stay in place so the store can
//!    compare old and new values after re-evaluation.
//! 3. Sort the reached nodes topologically (dependencies before dependents)
//!    with Kahn's algorithm.
//!
//! Nothing is recomputed here. Computed atoms are lazy: they re-evaluate on
//! their next read, and the store only forces that read for atoms that have
//! subscribers.

use std::collections::{HashMap, HashSet, VecDeque};

use super::node::GraphNode;
use crate::reactive::{Atom, AtomId};

/// The dependency graph of every atom a store has touched.
pub struct DependencyGraph {
    nodes: HashMap<AtomId, GraphNode>,

    /// Number of writes applied so far.
    generation: u64,
}

impl DependencyGraph {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            generation: 0,
        }
    }

    /// Get the node for `atom`, creating it on first access.
    pub fn ensure_node(&mut self, atom: &Atom) -> &mut GraphNode {
        self.nodes
            .entry(atom.id())
            .or_insert_with(|| GraphNode::new(atom))
    }

    pub fn get_node(&self, atom: AtomId) -> Option<&GraphNode> {
        self.nodes.get(&atom)
    }

    /// Add a dependency edge: `dependent` read `dependency`.
    pub fn add_edge(&mut self, dependency: AtomId, dependent: AtomId) {
        if let Some(dep_node) = self.nodes.get_mut(&dependency) {
            dep_node.add_dependent(dependent);
        }
        if let Some(dependent_node) = self.nodes.get_mut(&dependent) {
            dependent_node.add_dependency(dependency);
        }
    }

    /// Current write generation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether a write after `generation` reached any of `atoms`.
    pub fn changed_since(&self, atoms: &[AtomId], generation: u64) -> bool {
        atoms.iter().any(|id| {
            self.nodes
                .get(id)
                .is_some_and(|node| node.changed_at() > generation)
        })
    }

    /// Replace the dependencies of `atom` with the set read by its latest
    /// evaluation.
    pub fn set_dependencies(&mut self, atom: AtomId, dependencies: &[AtomId]) {
        let old = match self.nodes.get_mut(&atom) {
            Some(node) => node.take_dependencies(),
            None => return,
        };
        for dep in old {
            if let Some(dep_node) = self.nodes.get_mut(&dep) {
                dep_node.remove_dependent(atom);
            }
        }
        for &dep in dependencies {
            self.add_edge(dep, atom);
        }
    }

    /// Mark a source node as changed and propagate dirty flags. Starts a new
    /// generation and stamps the source and every invalidated node with it.
    ///
    /// Returns every invalidated node in topological order. The source
    /// itself is not included.
    pub fn mark_changed(&mut self, source: AtomId) -> Vec<AtomId> {
        self.generation += 1;
        let generation = self.generation;

        let mut to_process = Vec::new();
        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();

        if let Some(node) = self.nodes.get_mut(&source) {
            node.touch(generation);
            queue.extend(node.dependents().iter().copied());
        }

        while let Some(node_id) = queue.pop_front() {
            if !visited.insert(node_id) {
                continue;
            }

            if let Some(node) = self.nodes.get_mut(&node_id) {
                node.mark_dirty();
                node.touch(generation);
                to_process.push(node_id);
                queue.extend(node.dependents().iter().copied());
            }
        }

        self.topological_sort(to_process)
    }

    /// Perform a topological sort of the given nodes.
    ///
    /// Returns nodes in order such that dependencies come before dependents.
    fn topological_sort(&self, nodes: Vec<AtomId>) -> Vec<AtomId> {
        let node_set: HashSet<_> = nodes.iter().copied().collect();
        let mut in_degree: HashMap<AtomId, usize> = HashMap::new();
        let mut result = Vec::with_capacity(nodes.len());
        let mut queue = VecDeque::new();

        for &node_id in &nodes {
            if let Some(node) = self.nodes.get(&node_id) {
                let degree = node
                    .dependencies()
                    .iter()
                    .filter(|d| node_set.contains(*d))
                    .count();
                in_degree.insert(node_id, degree);
                if degree == 0 {
                    queue.push_back(node_id);
                }
            }
        }

        while let Some(node_id) = queue.pop_front() {
            result.push(node_id);

            if let Some(node) = self.nodes.get(&node_id) {
                for &dependent_id in node.dependents() {
                    if let Some(degree) = in_degree.get_mut(&dependent_id) {
                        *degree = degree.saturating_sub(1);
                        if *degree == 0 {
                            queue.push_back(dependent_id);
                        }
                    }
                }
            }
        }

        result
    }

    /// Get the total number of nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Record;

    fn source() -> Atom {
        Atom::primitive(Record::new())
    }

    fn derived() -> Atom {
        Atom::computed(|_| Ok(Record::new()))
    }

    #[test]
    fn nodes_are_created_once() {
        let mut graph = DependencyGraph::new();
        let atom = source();

        graph.ensure_node(&atom);
        graph.ensure_node(&atom);

        assert_eq!(graph.node_count(), 1);
        assert!(graph.get_node(atom.id()).is_some());
    }

    #[test]
    fn add_edge_links_both_nodes() {
        let mut graph = DependencyGraph::new();
        let (s, d) = (source(), derived());
        graph.ensure_node(&s);
        graph.ensure_node(&d);

        graph.add_edge(s.id(), d.id());
        assert!(graph.get_node(s.id()).unwrap().dependents().contains(&d.id()));
        assert!(graph.get_node(d.id()).unwrap().dependencies().contains(&s.id()));
    }

    #[test]
    fn set_dependencies_replaces_old_edges() {
        let mut graph = DependencyGraph::new();
        let (a, b, d) = (source(), source(), derived());
        for atom in [&a, &b, &d] {
            graph.ensure_node(atom);
        }

        graph.set_dependencies(d.id(), &[a.id()]);
        graph.set_dependencies(d.id(), &[b.id()]);

        assert!(!graph.get_node(a.id()).unwrap().dependents().contains(&d.id()));
        assert!(graph.get_node(b.id()).unwrap().dependents().contains(&d.id()));
        assert_eq!(graph.get_node(d.id()).unwrap().dependencies().len(), 1);
    }

    #[test]
    fn mark_changed_propagates_in_order() {
        let mut graph = DependencyGraph::new();

        // source -> layer1 -> layer2
        let (s, l1, l2) = (source(), derived(), derived());
        for atom in [&s, &l1, &l2] {
            graph.ensure_node(atom);
        }
        graph.set_dependencies(l1.id(), &[s.id()]);
        graph.set_dependencies(l2.id(), &[l1.id()]);

        graph.ensure_node(&l1).set_value(Record::new());
        graph.ensure_node(&l2).set_value(Record::new());

        let to_process = graph.mark_changed(s.id());

        assert_eq!(to_process, vec![l1.id(), l2.id()]);
        assert!(!graph.get_node(l1.id()).unwrap().is_clean());
        assert!(!graph.get_node(l2.id()).unwrap().is_clean());
        assert!(graph.get_node(s.id()).unwrap().is_clean());
    }

    #[test]
    fn diamond_dependents_are_visited_once() {
        let mut graph = DependencyGraph::new();
        let (s, left, right, join) = (source(), derived(), derived(), derived());
        for atom in [&s, &left, &right, &join] {
            graph.ensure_node(atom);
        }
        graph.set_dependencies(left.id(), &[s.id()]);
        graph.set_dependencies(right.id(), &[s.id()]);
        graph.set_dependencies(join.id(), &[left.id(), right.id()]);

        let to_process = graph.mark_changed(s.id());

        assert_eq!(to_process.len(), 3);
        assert_eq!(to_process.last(), Some(&join.id()));
    }

    #[test]
    fn writes_stamp_reached_nodes_with_a_new_generation() {
        let mut graph = DependencyGraph::new();
        let (s, other, d) = (source(), source(), derived());
        for atom in [&s, &other, &d] {
            graph.ensure_node(atom);
        }
        graph.set_dependencies(d.id(), &[s.id()]);

        let start = graph.generation();
        assert!(!graph.changed_since(&[s.id(), d.id()], start));

        graph.mark_changed(s.id());

        assert_eq!(graph.generation(), start + 1);
        assert!(graph.changed_since(&[s.id()], start));
        assert!(graph.changed_since(&[d.id()], start));
        assert!(!graph.changed_since(&[other.id()], start));
        assert!(!graph.changed_since(&[s.id()], graph.generation()));
    }
}
