//! Dependency Graph
//!
//! This module implements the dependency graph the store uses to cache
//! computed atoms and invalidate them after writes.
//!
//! # Overview
//!
//! The graph is a directed acyclic graph where:
//!
//! - Nodes represent atoms: primitive atoms are sources, computed atoms
//!   (including every layer of a chain) are derived nodes
//! - Edges represent reads: if A read B during its last evaluation, there is
//!   an edge from B to A
//!
//! When a primitive atom is written, we traverse the graph to find every
//! affected node and mark it dirty. A chain of N layers over a root is a
//! simple path of N + 1 nodes.
//!
//! Edges are rebuilt on every evaluation, so an atom whose getter switches
//! between two atoms only depends on the one it read last.
//!
//! Every write bumps the graph generation and stamps the nodes it reached.
//! An evaluation that ran without the graph lock compares those stamps with
//! the generation it started in before caching its result.

mod node;
mod scheduler;

pub use node::GraphNode;
pub use scheduler::DependencyGraph;
