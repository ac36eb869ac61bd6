//! Dependency graph algorithms for taskmesh.
//!
//! This crate provides a directed graph over opaque, ordered keys that models
//! "must finish before" relations between tasks. It is built fresh from an
//! edge list whenever a caller needs to reason about the dependency structure,
//! and answers the questions the dependency engine asks:
//!
//! - Would adding an edge close a cycle? ([`DependencyGraph::would_create_cycle`])
//! - In which order can all participating tasks run? ([`DependencyGraph::resolve_order`])
//! - Which tasks can run side by side? ([`DependencyGraph::execution_waves`])
//!
//! # Key Types
//!
//! - [`DependencyGraph`]: the graph itself, backed by petgraph
//! - [`NodeKey`]: bound for key types stored in the graph
//! - [`TieBreak`]: how ready nodes are ordered during Kahn's algorithm
//!
//! # Example
//!
//! ```
//! use taskmesh_task_graph::{DependencyGraph, TieBreak};
//!
//! let graph = DependencyGraph::from_edges([("a", "b"), ("b", "c")]);
//! assert!(graph.would_create_cycle(&"c", &"a").is_some());
//!
//! let order = graph.resolve_order(TieBreak::Ascending)?;
//! assert_eq!(order, vec!["a", "b", "c"]);
//! # Ok::<(), taskmesh_task_graph::Error>(())
//! ```

mod error;
mod graph;
mod traversal;
mod validation;

use std::fmt;
use std::hash::Hash;

pub use error::{Error, Result};
pub use graph::DependencyGraph;
pub use traversal::{ExecutionWaves, TopologicalOrder};
pub use validation::ValidationResult;

/// Bound for keys stored in a [`DependencyGraph`].
///
/// Keys are opaque: the graph only compares, hashes, clones and prints them.
/// `Ord` drives the [`TieBreak::Ascending`] policy.
pub trait NodeKey: Clone + Eq + Hash + Ord + fmt::Display {}

impl<T> NodeKey for T where T: Clone + Eq + Hash + Ord + fmt::Display {}

/// Ordering applied to nodes that become ready at the same time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TieBreak {
    /// Ready nodes are emitted in ascending key order.
    #[default]
    Ascending,
    /// Ready nodes are emitted in the order their keys were first observed
    /// while the graph was built from its edge list.
    FirstSeen,
}
