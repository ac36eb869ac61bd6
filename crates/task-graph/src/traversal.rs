//! Traversal algorithms and types for dependency graphs.
//!
//! This module provides the output types of ordering operations and the
//! transitive ancestor/descendant queries.

use crate::{DependencyGraph, Error, NodeKey, Result};
use petgraph::Direction;
use petgraph::graph::NodeIndex;
use std::collections::{HashSet, VecDeque};

/// A topologically sorted sequence of keys.
///
/// Every parent appears before all of its children.
pub type TopologicalOrder<K> = Vec<K>;

/// Groups of keys that can execute side by side.
///
/// Every key in wave N has all of its parents in waves `0..N`.
pub type ExecutionWaves<K> = Vec<Vec<K>>;

impl<K: NodeKey> DependencyGraph<K> {
    /// All keys that must finish before `key`, directly or transitively.
    ///
    /// The result is sorted ascending and never contains `key` itself in an
    /// acyclic graph.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownNode`] if `key` is not in the graph.
    pub fn ancestors(&self, key: &K) -> Result<Vec<K>> {
        self.reachable(key, Direction::Incoming)
    }

    /// All keys that wait on `key`, directly or transitively.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownNode`] if `key` is not in the graph.
    pub fn descendants(&self, key: &K) -> Result<Vec<K>> {
        self.reachable(key, Direction::Outgoing)
    }

    fn reachable(&self, key: &K, direction: Direction) -> Result<Vec<K>> {
        let start = self.node_index(key).ok_or_else(|| Error::unknown_node(key))?;

        let mut seen: HashSet<NodeIndex> = HashSet::new();
        let mut queue = VecDeque::from([start]);

        while let Some(node) = queue.pop_front() {
            for next in self.inner().neighbors_directed(node, direction) {
                if next != start && seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }

        let mut keys: Vec<K> = seen
            .into_iter()
            .map(|idx| self.inner()[idx].clone())
            .collect();
        keys.sort();
        Ok(keys)
    }
}
