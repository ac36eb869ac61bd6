//! Validation utilities for dependency graphs.
//!
//! Graphs built from a store snapshot are expected to be acyclic already.
//! This module re-checks that for data that may have been written by another
//! process or an older version.

use crate::{DependencyGraph, Error, NodeKey};

/// Result of graph validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    /// Whether the graph is valid (no cycles, no self-loops).
    pub is_valid: bool,
    /// List of validation errors, if any.
    pub errors: Vec<Error>,
}

impl ValidationResult {
    /// Create a valid result.
    #[must_use]
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            errors: vec![],
        }
    }

    /// Create an invalid result with errors.
    #[must_use]
    pub fn invalid(errors: Vec<Error>) -> Self {
        Self {
            is_valid: false,
            errors,
        }
    }
}

impl<K: NodeKey> DependencyGraph<K> {
    /// Validate the graph structure.
    ///
    /// Every self-loop is reported on its own. Ignoring self-loops, one
    /// remaining cycle is reported if the graph is still cyclic.
    #[must_use]
    pub fn validate(&self) -> ValidationResult {
        let mut errors = Vec::new();

        let mut self_loops: Vec<&K> = self
            .keys()
            .filter(|key| self.contains_edge(key, key))
            .collect();
        self_loops.sort();
        for key in &self_loops {
            errors.push(Error::cycle(&[*key, *key]));
        }

        if let Some(cycle) = self.search_cycle(true) {
            errors.push(Error::cycle(&cycle));
        }

        if errors.is_empty() {
            ValidationResult::valid()
        } else {
            ValidationResult::invalid(errors)
        }
    }
}
