//! Error types for dependency graph operations.

// Rust 1.92 compiler bug: false positives for thiserror/miette derive macro fields
// https://github.com/rust-lang/rust/issues/147648
#![allow(unused_assignments)]

use miette::Diagnostic;
use thiserror::Error;

/// Result type for dependency graph operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during dependency graph operations.
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum Error {
    /// A dependency cycle exists, or would exist after a proposed edge.
    ///
    /// `cycle` lists the keys along the cycle with the first key repeated at
    /// the end, e.g. `["a", "b", "a"]`.
    #[error("Cycle detected in dependency graph: {}", cycle.join(" -> "))]
    #[diagnostic(
        code(taskmesh::graph::cycle),
        help("Remove one of the edges along the cycle")
    )]
    CycleDetected {
        /// Keys along the cycle, closing on the first key.
        cycle: Vec<String>,
    },

    /// A key was referenced that is not part of the graph.
    #[error("Node '{key}' is not part of the dependency graph")]
    #[diagnostic(code(taskmesh::graph::unknown_node))]
    UnknownNode {
        /// The missing key.
        key: String,
    },
}

impl Error {
    /// Create a cycle error from any displayable keys.
    #[must_use]
    pub fn cycle<K: ToString>(keys: &[K]) -> Self {
        Self::CycleDetected {
            cycle: keys.iter().map(ToString::to_string).collect(),
        }
    }

    /// Create an unknown-node error.
    #[must_use]
    pub fn unknown_node(key: impl ToString) -> Self {
        Self::UnknownNode {
            key: key.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_message_lists_path() {
        let err = Error::cycle(&["a", "b", "a"]);
        assert_eq!(
            err.to_string(),
            "Cycle detected in dependency graph: a -> b -> a"
        );
    }

    #[test]
    fn unknown_node_message() {
        let err = Error::unknown_node("x");
        assert_eq!(
            err.to_string(),
            "Node 'x' is not part of the dependency graph"
        );
    }
}
