//! Stream graph storage
//!
//! Node ids are interned into a petgraph arena, so the same external id
//! reused by an unrelated graph never aliases this graph's indices.

use crate::error::GraphError;
use crate::paths::{Paths, Traversal};
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::cell::OnceCell;
use std::collections::{BTreeSet, HashMap, HashSet};

/// Sign interpretation or text fragment id
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for NodeId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Default)]
struct Leaves {
    initial: BTreeSet<NodeId>,
    end: BTreeSet<NodeId>,
}

/// Directed "followed by" graph for one edition's stream
///
/// The leaf cache lives in a [`OnceCell`], so the type is `Send` but not
/// `Sync`: a single instance belongs to one coordinating context.
#[derive(Debug, Clone, Default)]
pub struct StreamGraph {
    arena: StableDiGraph<NodeId, ()>,
    index: HashMap<NodeId, NodeIndex>,
    leaves: OnceCell<Leaves>,
}

impl StreamGraph {
    /// Create an empty graph
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from `(item, next_item)` pairs without cycle checks
    pub fn from_edges<I>(edges: I) -> Self
    where
        I: IntoIterator<Item = (NodeId, NodeId)>,
    {
        let mut graph = Self::new();
        for (item, next) in edges {
            graph.unsafe_add_link(item, next);
        }
        graph
    }

    /// Build a graph from untrusted pairs, rejecting self loops and cycles
    pub fn try_from_edges<I>(edges: I) -> Result<Self, GraphError>
    where
        I: IntoIterator<Item = (NodeId, NodeId)>,
    {
        let mut graph = Self::new();
        for (item, next) in edges {
            if item == next {
                return Err(GraphError::SelfLoop(item));
            }
            graph.unsafe_add_link(item, next);
        }

        if graph.is_acyclic() {
            Ok(graph)
        } else {
            Err(GraphError::CycleDetected)
        }
    }

    /// Number of nodes, including isolated ones
    pub fn node_count(&self) -> usize {
        self.arena.node_count()
    }

    /// Number of edges
    pub fn edge_count(&self) -> usize {
        self.arena.edge_count()
    }

    /// Whether `node` has been seen by this graph
    pub fn contains_node(&self, node: NodeId) -> bool {
        self.index.contains_key(&node)
    }

    /// Whether the edge `node -> next` exists
    pub fn contains_link(&self, node: NodeId, next: NodeId) -> bool {
        match (self.index.get(&node), self.index.get(&next)) {
            (Some(&a), Some(&b)) => self.arena.find_edge(a, b).is_some(),
            _ => false,
        }
    }

    /// All edges as sorted `(item, next_item)` pairs
    pub fn edges(&self) -> Vec<(NodeId, NodeId)> {
        let mut edges: Vec<_> = self
            .arena
            .edge_indices()
            .filter_map(|e| self.arena.edge_endpoints(e))
            .map(|(a, b)| (self.arena[a], self.arena[b]))
            .collect();
        edges.sort_unstable();
        edges
    }

    /// Direct successors of `node`, sorted
    pub fn successors(&self, node: NodeId) -> Vec<NodeId> {
        self.neighbours(node, Direction::Outgoing)
    }

    /// Direct predecessors of `node`, sorted
    pub fn predecessors(&self, node: NodeId) -> Vec<NodeId> {
        self.neighbours(node, Direction::Incoming)
    }

    pub(crate) fn neighbours(&self, node: NodeId, direction: Direction) -> Vec<NodeId> {
        let Some(&idx) = self.index.get(&node) else {
            return Vec::new();
        };
        let mut out: Vec<_> = self
            .arena
            .neighbors_directed(idx, direction)
            .map(|n| self.arena[n])
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    /// Nodes nothing points to
    pub fn initial_leaves(&self) -> &BTreeSet<NodeId> {
        &self.leaves().initial
    }

    /// Nodes that point to nothing
    pub fn end_leaves(&self) -> &BTreeSet<NodeId> {
        &self.leaves().end
    }

    fn leaves(&self) -> &Leaves {
        self.leaves.get_or_init(|| {
            let mut leaves = Leaves::default();
            for idx in self.arena.node_indices() {
                let node = self.arena[idx];
                if self
                    .arena
                    .neighbors_directed(idx, Direction::Incoming)
                    .next()
                    .is_none()
                {
                    leaves.initial.insert(node);
                }
                if self
                    .arena
                    .neighbors_directed(idx, Direction::Outgoing)
                    .next()
                    .is_none()
                {
                    leaves.end.insert(node);
                }
            }
            leaves
        })
    }

    fn invalidate_leaves(&mut self) {
        self.leaves.take();
    }

    fn intern(&mut self, node: NodeId) -> NodeIndex {
        if let Some(&idx) = self.index.get(&node) {
            return idx;
        }
        let idx = self.arena.add_node(node);
        self.index.insert(node, idx);
        idx
    }

    pub(crate) fn index_of(&self, node: NodeId) -> Option<NodeIndex> {
        self.index.get(&node).copied()
    }

    pub(crate) fn arena(&self) -> &StableDiGraph<NodeId, ()> {
        &self.arena
    }

    /// Add `node -> next` unless that would close a cycle
    ///
    /// Returns `false` without touching the graph when a path already leads
    /// from `next` back to `node`. Self loops always fail this test.
    pub fn add_link(&mut self, node: NodeId, next: NodeId) -> bool {
        if self.path_exists(next, node) {
            return false;
        }
        self.unsafe_add_link(node, next);
        true
    }

    /// Add `node -> next` without the cycle check
    ///
    /// The caller must already know the edge is safe. Adding an edge that
    /// exists is a no-op.
    pub fn unsafe_add_link(&mut self, node: NodeId, next: NodeId) {
        let a = self.intern(node);
        let b = self.intern(next);
        if self.arena.find_edge(a, b).is_none() {
            self.arena.add_edge(a, b, ());
        }
        self.invalidate_leaves();
    }

    /// Remove `node -> next`; both nodes stay in the graph
    pub fn remove_link(&mut self, node: NodeId, next: NodeId) -> bool {
        let (Some(&a), Some(&b)) = (self.index.get(&node), self.index.get(&next)) else {
            return false;
        };
        match self.arena.find_edge(a, b) {
            Some(edge) => {
                self.arena.remove_edge(edge);
                self.invalidate_leaves();
                true
            }
            None => false,
        }
    }

    /// Whether `goal` is reachable from `start` along forward edges
    ///
    /// Every node reaches itself.
    pub fn path_exists(&self, start: NodeId, goal: NodeId) -> bool {
        if start == goal {
            return true;
        }
        let (Some(&from), Some(&to)) = (self.index.get(&start), self.index.get(&goal)) else {
            return false;
        };

        let mut visited = HashSet::from([from]);
        let mut stack = vec![from];
        while let Some(idx) = stack.pop() {
            for next in self.arena.neighbors_directed(idx, Direction::Outgoing) {
                if next == to {
                    return true;
                }
                if visited.insert(next) {
                    stack.push(next);
                }
            }
        }
        false
    }

    /// Whether no cycle exists anywhere in the graph
    pub fn is_acyclic(&self) -> bool {
        !petgraph::algo::is_cyclic_directed(&self.arena)
    }

    /// Topological reading order of every node
    pub fn topological_order(&self) -> Result<Vec<NodeId>, GraphError> {
        petgraph::algo::toposort(&self.arena, None)
            .map(|order| order.into_iter().map(|idx| self.arena[idx]).collect())
            .map_err(|_| GraphError::CycleDetected)
    }

    /// Lazily enumerate every complete path from `start`
    pub fn paths(&self, start: NodeId, traversal: Traversal) -> Paths<'_> {
        Paths::new(self, start, traversal)
    }

    /// Collect every complete path from `start`
    ///
    /// Exponential in fan-out; bound the graph before calling this on
    /// anything large.
    pub fn find_all_paths(&self, start: NodeId, toward_beginning: bool) -> Vec<Vec<NodeId>> {
        let traversal = if toward_beginning {
            Traversal::TowardBeginning
        } else {
            Traversal::Forward
        };
        self.paths(start, traversal).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(id: u32) -> NodeId {
        NodeId(id)
    }

    fn graph(edges: &[(u32, u32)]) -> StreamGraph {
        StreamGraph::from_edges(edges.iter().map(|&(a, b)| (n(a), n(b))))
    }

    #[test]
    fn test_construction_builds_both_directions() {
        let g = graph(&[(1, 2), (2, 3), (2, 4)]);
        assert_eq!(g.node_count(), 4);
        assert_eq!(g.edge_count(), 3);
        assert_eq!(g.successors(n(2)), vec![n(3), n(4)]);
        assert_eq!(g.predecessors(n(3)), vec![n(2)]);
        assert!(g.successors(n(9)).is_empty());
    }

    #[test]
    fn test_duplicate_edges_collapse() {
        let g = graph(&[(1, 2), (1, 2)]);
        assert_eq!(g.edge_count(), 1);
    }

    #[test]
    fn test_leaves() {
        let g = graph(&[(1, 2), (2, 3), (5, 3)]);
        assert_eq!(g.initial_leaves(), &BTreeSet::from([n(1), n(5)]));
        assert_eq!(g.end_leaves(), &BTreeSet::from([n(3)]));
    }

    #[test]
    fn test_leaves_recomputed_after_edit() {
        let mut g = graph(&[(1, 2)]);
        assert_eq!(g.end_leaves(), &BTreeSet::from([n(2)]));

        assert!(g.add_link(n(2), n(3)));
        assert_eq!(g.end_leaves(), &BTreeSet::from([n(3)]));

        assert!(g.remove_link(n(2), n(3)));
        assert_eq!(g.end_leaves(), &BTreeSet::from([n(2), n(3)]));
        assert_eq!(g.initial_leaves(), &BTreeSet::from([n(1), n(3)]));
    }

    #[test]
    fn test_add_link_rejects_cycle() {
        let mut g = graph(&[(1, 2), (2, 3)]);
        assert!(!g.add_link(n(3), n(1)));
        assert_eq!(g.edge_count(), 2);
        assert!(g.add_link(n(1), n(3)));
        assert_eq!(g.edge_count(), 3);
    }

    #[test]
    fn test_add_link_rejects_self_loop() {
        let mut g = StreamGraph::new();
        assert!(!g.add_link(n(5), n(5)));
        assert_eq!(g.node_count(), 0);
    }

    #[test]
    fn test_unsafe_add_link_skips_check() {
        let mut g = graph(&[(1, 2)]);
        g.unsafe_add_link(n(2), n(1));
        assert!(!g.is_acyclic());
    }

    #[test]
    fn test_path_exists() {
        let g = graph(&[(1, 2), (2, 3), (4, 3)]);
        assert!(g.path_exists(n(1), n(3)));
        assert!(!g.path_exists(n(3), n(1)));
        assert!(!g.path_exists(n(1), n(4)));
        assert!(!g.path_exists(n(1), n(99)));
        assert!(g.path_exists(n(99), n(99)));
    }

    #[test]
    fn test_try_from_edges() {
        let ok = StreamGraph::try_from_edges([(n(1), n(2)), (n(2), n(3))]);
        assert!(ok.is_ok());

        let cyclic = StreamGraph::try_from_edges([(n(1), n(2)), (n(2), n(1))]);
        assert_eq!(cyclic.unwrap_err(), GraphError::CycleDetected);

        let looped = StreamGraph::try_from_edges([(n(4), n(4))]);
        assert_eq!(looped.unwrap_err(), GraphError::SelfLoop(n(4)));
    }

    #[test]
    fn test_topological_order() {
        let g = graph(&[(3, 1), (1, 2)]);
        assert_eq!(g.topological_order().unwrap(), vec![n(3), n(1), n(2)]);
    }
}
