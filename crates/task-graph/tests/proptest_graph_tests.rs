//! Property-based tests for dependency graph invariants.
//!
//! These tests verify the behavioral contracts of the dependency graph:
//! - Kahn ordering respects every edge and emits every key once
//! - Execution waves contain only independent keys
//! - Cycle detection agrees with ordering
//! - Incremental cycle checks keep a growing graph acyclic

use proptest::prelude::*;
use std::collections::{HashMap, HashSet};
use taskmesh_task_graph::{DependencyGraph, TieBreak};

// =============================================================================
// Strategies for generating test data
// =============================================================================

/// Generate a DAG edge list over `node_count` keys.
///
/// Edges only run from a lower index to a higher index, so the result is
/// acyclic by construction. Keys are shuffled names so that ascending key
/// order does not coincide with the construction order.
fn dag_strategy(max_nodes: usize) -> impl Strategy<Value = Vec<(String, String)>> {
    (2..=max_nodes).prop_flat_map(|node_count| {
        let names: Vec<String> = (0..node_count).map(|i| format!("t{:03}", (i * 7919) % 1000)).collect();
        proptest::collection::vec((0..node_count, 0..node_count), 0..node_count * 2).prop_map(
            move |pairs| {
                pairs
                    .into_iter()
                    .filter(|(a, b)| a != b)
                    .map(|(a, b)| {
                        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
                        (names[lo].clone(), names[hi].clone())
                    })
                    .collect()
            },
        )
    })
}

/// Generate arbitrary edges (possibly cyclic) over a small key space.
fn arbitrary_edges_strategy() -> impl Strategy<Value = Vec<(String, String)>> {
    proptest::collection::vec((0..8_u8, 0..8_u8), 0..20).prop_map(|pairs| {
        pairs
            .into_iter()
            .map(|(a, b)| (format!("n{a}"), format!("n{b}")))
            .collect()
    })
}

fn tie_break_strategy() -> impl Strategy<Value = TieBreak> {
    prop_oneof![Just(TieBreak::Ascending), Just(TieBreak::FirstSeen)]
}

fn distinct_keys(edges: &[(String, String)]) -> HashSet<String> {
    edges
        .iter()
        .flat_map(|(a, b)| [a.clone(), b.clone()])
        .collect()
}

// =============================================================================
// Property Tests: Kahn ordering
// =============================================================================

proptest! {
    /// Contract: every parent precedes its child in the resolved order.
    #[test]
    fn resolve_order_respects_edges(edges in dag_strategy(15), tie_break in tie_break_strategy()) {
        let graph = DependencyGraph::from_edges(edges.clone());
        let order = graph.resolve_order(tie_break).expect("Sort should succeed for DAG");

        let positions: HashMap<&String, usize> =
            order.iter().enumerate().map(|(i, key)| (key, i)).collect();

        for (parent, child) in &edges {
            let p = positions.get(parent).expect("Parent should be ordered");
            let c = positions.get(child).expect("Child should be ordered");
            prop_assert!(p < c, "'{}' (pos {}) should precede '{}' (pos {})", parent, p, child, c);
        }
    }

    /// Contract: every key that appears in an edge is emitted exactly once.
    #[test]
    fn resolve_order_emits_each_key_once(edges in dag_strategy(20)) {
        let graph = DependencyGraph::from_edges(edges.clone());
        let order = graph.resolve_order(TieBreak::Ascending).expect("Sort should succeed");

        let unique: HashSet<&String> = order.iter().collect();
        prop_assert_eq!(unique.len(), order.len(), "No key may repeat");
        prop_assert_eq!(
            order.into_iter().collect::<HashSet<_>>(),
            distinct_keys(&edges)
        );
    }

    /// Contract: ordering is deterministic for the same edge list.
    #[test]
    fn resolve_order_is_deterministic(edges in dag_strategy(12), tie_break in tie_break_strategy()) {
        let first = DependencyGraph::from_edges(edges.clone()).resolve_order(tie_break);
        let second = DependencyGraph::from_edges(edges).resolve_order(tie_break);
        prop_assert_eq!(first, second);
    }

    /// Contract: the ascending policy does not depend on edge enumeration order.
    #[test]
    fn ascending_order_ignores_enumeration_order(edges in dag_strategy(12)) {
        let mut reversed = edges.clone();
        reversed.reverse();

        let forward = DependencyGraph::from_edges(edges).resolve_order(TieBreak::Ascending);
        let backward = DependencyGraph::from_edges(reversed).resolve_order(TieBreak::Ascending);
        prop_assert_eq!(forward, backward);
    }
}

// =============================================================================
// Property Tests: Execution waves
// =============================================================================

proptest! {
    /// Contract: a key's parents always sit in strictly earlier waves.
    #[test]
    fn waves_respect_dependency_order(edges in dag_strategy(15)) {
        let graph = DependencyGraph::from_edges(edges.clone());
        let waves = graph.execution_waves(TieBreak::Ascending).expect("Waves should succeed");

        let mut wave_of: HashMap<String, usize> = HashMap::new();
        for (idx, wave) in waves.iter().enumerate() {
            for key in wave {
                prop_assert!(wave_of.insert(key.clone(), idx).is_none(), "Key '{}' appears twice", key);
            }
        }

        for (parent, child) in &edges {
            prop_assert!(wave_of[parent] < wave_of[child]);
        }
        prop_assert_eq!(wave_of.len(), distinct_keys(&edges).len());
    }
}

// =============================================================================
// Property Tests: Cycle detection
// =============================================================================

proptest! {
    /// Contract: ordering fails exactly when a cycle exists, and the reported
    /// cycle is made of real edges.
    #[test]
    fn ordering_fails_iff_cyclic(edges in arbitrary_edges_strategy()) {
        let graph = DependencyGraph::from_edges(edges.clone());
        let edge_set: HashSet<(String, String)> = edges.into_iter().collect();

        match graph.find_cycle() {
            Some(cycle) => {
                prop_assert!(graph.has_cycles());
                prop_assert!(graph.resolve_order(TieBreak::Ascending).is_err());
                prop_assert_eq!(cycle.first(), cycle.last());
                for pair in cycle.windows(2) {
                    prop_assert!(edge_set.contains(&(pair[0].clone(), pair[1].clone())));
                }
            }
            None => {
                prop_assert!(!graph.has_cycles());
                prop_assert!(graph.resolve_order(TieBreak::Ascending).is_ok());
            }
        }
    }

    /// Contract: inserting only edges that pass `would_create_cycle` keeps the
    /// graph acyclic, and every rejected edge really would have closed a cycle.
    #[test]
    fn incremental_checks_preserve_acyclicity(edges in arbitrary_edges_strategy()) {
        let mut graph: DependencyGraph<String> = DependencyGraph::new();

        for (parent, child) in edges {
            match graph.would_create_cycle(&parent, &child) {
                Some(cycle) => {
                    prop_assert_eq!(cycle.first(), Some(&child));
                    prop_assert_eq!(cycle.last(), Some(&child));
                    let mut candidate = graph.clone();
                    candidate.add_edge(parent, child);
                    prop_assert!(candidate.has_cycles());
                }
                None => {
                    graph.add_edge(parent, child);
                    prop_assert!(!graph.has_cycles());
                }
            }
        }

        prop_assert!(graph.find_cycle().is_none());
        prop_assert!(graph.validate().is_valid);
    }
}
