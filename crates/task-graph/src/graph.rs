//! Dependency graph built on petgraph.
//!
//! An edge `parent -> child` means `parent` must complete before `child`.
//! The graph is cheap to build from an edge list and is meant to be rebuilt
//! from a fresh snapshot for every query rather than kept around.

use crate::{Error, ExecutionWaves, NodeKey, Result, TieBreak, TopologicalOrder};
use petgraph::Direction;
use petgraph::algo::is_cyclic_directed;
use petgraph::graph::{DiGraph, NodeIndex};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};
use tracing::debug;

/// Directed graph over task keys.
///
/// Node indices are assigned in the order keys are first observed, which is
/// what [`TieBreak::FirstSeen`] relies on. Parallel edges are never stored,
/// so in-degrees always equal the number of distinct parents.
#[derive(Debug, Clone)]
pub struct DependencyGraph<K: NodeKey> {
    /// The directed graph of keys.
    graph: DiGraph<K, ()>,
    /// Map from keys to node indices.
    key_to_node: HashMap<K, NodeIndex>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    Unvisited,
    OnPath,
    Done,
}

impl<K: NodeKey> DependencyGraph<K> {
    /// Create a new empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            key_to_node: HashMap::new(),
        }
    }

    /// Build a graph from `(parent, child)` pairs.
    ///
    /// Repeated pairs collapse into one edge. Self-loops are kept so that
    /// [`DependencyGraph::find_cycle`] can report them.
    pub fn from_edges<I>(edges: I) -> Self
    where
        I: IntoIterator<Item = (K, K)>,
    {
        let mut graph = Self::new();
        let mut collapsed = 0_usize;
        for (parent, child) in edges {
            if !graph.add_edge(parent, child) {
                collapsed += 1;
            }
        }
        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            collapsed,
            "Built dependency graph"
        );
        graph
    }

    /// Add a node, returning the existing index if the key is already present.
    pub fn add_node(&mut self, key: K) -> NodeIndex {
        if let Some(&node) = self.key_to_node.get(&key) {
            return node;
        }
        let node = self.graph.add_node(key.clone());
        self.key_to_node.insert(key, node);
        node
    }

    /// Add an edge `parent -> child`, adding either node if missing.
    ///
    /// Returns `false` when the edge was already present.
    pub fn add_edge(&mut self, parent: K, child: K) -> bool {
        let from = self.add_node(parent);
        let to = self.add_node(child);
        if self.graph.find_edge(from, to).is_some() {
            return false;
        }
        self.graph.add_edge(from, to, ());
        true
    }

    /// Check whether a key is part of the graph.
    #[must_use]
    pub fn contains_node(&self, key: &K) -> bool {
        self.key_to_node.contains_key(key)
    }

    /// Check whether the edge `parent -> child` exists.
    #[must_use]
    pub fn contains_edge(&self, parent: &K, child: &K) -> bool {
        match (self.key_to_node.get(parent), self.key_to_node.get(child)) {
            (Some(&from), Some(&to)) => self.graph.find_edge(from, to).is_some(),
            _ => false,
        }
    }

    /// Number of distinct keys in the graph.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of distinct edges in the graph.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Iterate over keys in first-seen order.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.graph.node_indices().map(|idx| &self.graph[idx])
    }

    /// Direct parents of `key`, sorted ascending.
    #[must_use]
    pub fn parents(&self, key: &K) -> Vec<K> {
        self.neighbors(key, Direction::Incoming)
    }

    /// Direct children of `key`, sorted ascending.
    #[must_use]
    pub fn children(&self, key: &K) -> Vec<K> {
        self.neighbors(key, Direction::Outgoing)
    }

    fn neighbors(&self, key: &K, direction: Direction) -> Vec<K> {
        let Some(&node) = self.key_to_node.get(key) else {
            return Vec::new();
        };
        let mut keys: Vec<K> = self
            .graph
            .neighbors_directed(node, direction)
            .map(|idx| self.graph[idx].clone())
            .collect();
        keys.sort();
        keys
    }

    /// Shortest directed path from `from` to `to`, both ends included.
    ///
    /// Breadth-first search over existing edges. Returns `None` if either key
    /// is absent or `to` is unreachable.
    #[must_use]
    pub fn path_between(&self, from: &K, to: &K) -> Option<Vec<K>> {
        let start = *self.key_to_node.get(from)?;
        let goal = *self.key_to_node.get(to)?;
        if start == goal {
            return Some(vec![from.clone()]);
        }

        let mut predecessor: HashMap<NodeIndex, NodeIndex> = HashMap::new();
        let mut visited = HashSet::from([start]);
        let mut queue = VecDeque::from([start]);

        while let Some(node) = queue.pop_front() {
            for next in self.graph.neighbors_directed(node, Direction::Outgoing) {
                if !visited.insert(next) {
                    continue;
                }
                predecessor.insert(next, node);
                if next == goal {
                    let mut path = vec![goal];
                    let mut current = goal;
                    while let Some(&prev) = predecessor.get(&current) {
                        path.push(prev);
                        current = prev;
                    }
                    path.reverse();
                    return Some(path.into_iter().map(|idx| self.graph[idx].clone()).collect());
                }
                queue.push_back(next);
            }
        }

        None
    }

    /// Check whether adding `parent -> child` would close a cycle.
    ///
    /// Returns the cycle the edge would create, starting and ending at
    /// `child`, or `None` when the edge is safe. A self-loop is reported as
    /// `[parent, parent]` whether or not the key is in the graph.
    #[must_use]
    pub fn would_create_cycle(&self, parent: &K, child: &K) -> Option<Vec<K>> {
        if parent == child {
            return Some(vec![parent.clone(), child.clone()]);
        }
        let mut cycle = self.path_between(child, parent)?;
        cycle.push(child.clone());
        Some(cycle)
    }

    /// Check if the graph has cycles.
    #[must_use]
    pub fn has_cycles(&self) -> bool {
        is_cyclic_directed(&self.graph)
    }

    /// Find one directed cycle, if any.
    ///
    /// The returned keys start and end at the same key. Search starts from
    /// keys in first-seen order, so the answer is stable for a given edge
    /// enumeration.
    #[must_use]
    pub fn find_cycle(&self) -> Option<Vec<K>> {
        self.search_cycle(false)
    }

    /// Depth-first cycle search. With `skip_self_loops`, edges from a key to
    /// itself are ignored so only cycles through two or more keys are found.
    pub(crate) fn search_cycle(&self, skip_self_loops: bool) -> Option<Vec<K>> {
        let successors = |node: NodeIndex| -> Vec<NodeIndex> {
            self.graph
                .neighbors(node)
                .filter(|&next| !(skip_self_loops && next == node))
                .collect()
        };

        let mut state = vec![Visit::Unvisited; self.graph.node_count()];
        let mut path: Vec<NodeIndex> = Vec::new();

        for start in self.graph.node_indices() {
            if state[start.index()] != Visit::Unvisited {
                continue;
            }

            state[start.index()] = Visit::OnPath;
            path.push(start);
            let mut stack: Vec<(NodeIndex, Vec<NodeIndex>)> =
                vec![(start, successors(start))];

            loop {
                let Some((node, pending)) = stack.last_mut() else {
                    break;
                };
                let node = *node;

                match pending.pop() {
                    Some(next) => match state[next.index()] {
                        Visit::OnPath => {
                            let pos = path.iter().position(|&idx| idx == next)?;
                            let mut cycle: Vec<K> = path[pos..]
                                .iter()
                                .map(|&idx| self.graph[idx].clone())
                                .collect();
                            cycle.push(self.graph[next].clone());
                            return Some(cycle);
                        }
                        Visit::Unvisited => {
                            state[next.index()] = Visit::OnPath;
                            path.push(next);
                            stack.push((next, successors(next)));
                        }
                        Visit::Done => {}
                    },
                    None => {
                        state[node.index()] = Visit::Done;
                        path.pop();
                        stack.pop();
                    }
                }
            }
        }

        None
    }

    /// Order every key so that parents precede children (Kahn's algorithm).
    ///
    /// Nodes that become ready at the same time are emitted according to
    /// `tie_break`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CycleDetected`] if not every key could be reduced to
    /// in-degree zero. No partial order is returned.
    pub fn resolve_order(&self, tie_break: TieBreak) -> Result<TopologicalOrder<K>> {
        let rank = self.ranks(tie_break);
        let mut in_degree = self.in_degrees();

        let mut ready: BinaryHeap<Reverse<(usize, usize)>> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, degree)| **degree == 0)
            .map(|(idx, _)| Reverse((rank[idx], idx)))
            .collect();

        let mut order = Vec::with_capacity(self.graph.node_count());

        while let Some(Reverse((_, idx))) = ready.pop() {
            let node = NodeIndex::new(idx);
            order.push(self.graph[node].clone());

            for child in self.graph.neighbors_directed(node, Direction::Outgoing) {
                let degree = &mut in_degree[child.index()];
                *degree = degree.saturating_sub(1);
                if *degree == 0 {
                    ready.push(Reverse((rank[child.index()], child.index())));
                }
            }
        }

        if order.len() < self.graph.node_count() {
            return Err(self.cycle_error(&in_degree));
        }

        Ok(order)
    }

    /// Group keys into waves of mutually independent work.
    ///
    /// Wave 0 holds every key without parents; each later wave holds the keys
    /// whose last parent sits in the previous wave. Keys within a wave are
    /// ordered by `tie_break`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CycleDetected`] if the graph contains a cycle.
    pub fn execution_waves(&self, tie_break: TieBreak) -> Result<ExecutionWaves<K>> {
        let rank = self.ranks(tie_break);
        let mut in_degree = self.in_degrees();

        let mut current: Vec<usize> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, degree)| **degree == 0)
            .map(|(idx, _)| idx)
            .collect();

        let mut waves = Vec::new();
        let mut emitted = 0_usize;

        while !current.is_empty() {
            current.sort_by_key(|&idx| rank[idx]);

            let mut next = Vec::new();
            for &idx in &current {
                for child in self
                    .graph
                    .neighbors_directed(NodeIndex::new(idx), Direction::Outgoing)
                {
                    let degree = &mut in_degree[child.index()];
                    *degree = degree.saturating_sub(1);
                    if *degree == 0 {
                        next.push(child.index());
                    }
                }
            }

            emitted += current.len();
            waves.push(
                current
                    .iter()
                    .map(|&idx| self.graph[NodeIndex::new(idx)].clone())
                    .collect(),
            );
            current = next;
        }

        if emitted < self.graph.node_count() {
            return Err(self.cycle_error(&in_degree));
        }

        Ok(waves)
    }

    /// Rank of every node index under the given tie-break policy.
    fn ranks(&self, tie_break: TieBreak) -> Vec<usize> {
        let count = self.graph.node_count();
        match tie_break {
            TieBreak::FirstSeen => (0..count).collect(),
            TieBreak::Ascending => {
                let mut by_key: Vec<NodeIndex> = self.graph.node_indices().collect();
                by_key.sort_by(|a, b| self.graph[*a].cmp(&self.graph[*b]));
                let mut rank = vec![0; count];
                for (position, idx) in by_key.into_iter().enumerate() {
                    rank[idx.index()] = position;
                }
                rank
            }
        }
    }

    fn in_degrees(&self) -> Vec<usize> {
        self.graph
            .node_indices()
            .map(|idx| {
                self.graph
                    .neighbors_directed(idx, Direction::Incoming)
                    .count()
            })
            .collect()
    }

    /// Build the error for a Kahn run that stalled with `in_degree` left over.
    fn cycle_error(&self, in_degree: &[usize]) -> Error {
        if let Some(cycle) = self.find_cycle() {
            return Error::cycle(&cycle);
        }
        // Unreachable for a stalled Kahn run, but keep the error informative.
        let mut stuck: Vec<K> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, degree)| **degree > 0)
            .map(|(idx, _)| self.graph[NodeIndex::new(idx)].clone())
            .collect();
        stuck.sort();
        Error::cycle(&stuck)
    }

    pub(crate) fn node_index(&self, key: &K) -> Option<NodeIndex> {
        self.key_to_node.get(key).copied()
    }

    pub(crate) fn inner(&self) -> &DiGraph<K, ()> {
        &self.graph
    }
}

impl<K: NodeKey> Default for DependencyGraph<K> {
    fn default() -> Self {
        Self::new()
    }
}
