//! Lazy path enumeration
//!
//! Walks the graph with an explicit stack so deep streams cannot overflow
//! the call stack. A node already on the current path is never revisited,
//! which keeps enumeration finite on graphs built with
//! [`StreamGraph::unsafe_add_link`].

use crate::graph::{NodeId, StreamGraph};
use petgraph::stable_graph::NodeIndex;
use petgraph::Direction;
use std::collections::HashSet;

/// Which edges a path follows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Traversal {
    /// Follow `item -> next_item`
    #[default]
    Forward,
    /// Follow `next_item -> item`
    TowardBeginning,
}

impl Traversal {
    fn direction(self) -> Direction {
        match self {
            Traversal::Forward => Direction::Outgoing,
            Traversal::TowardBeginning => Direction::Incoming,
        }
    }
}

#[derive(Debug, Clone)]
struct Frame {
    node: NodeIndex,
    /// Neighbours still to descend into, popped from the back
    pending: Vec<NodeIndex>,
    expanded: bool,
}

/// Iterator over every complete path from a start node
///
/// A path is complete once it reaches a node with no further edges in the
/// traversal direction. Paths are produced in ascending neighbour order.
/// Call [`Paths::restart`] (or clone the iterator before consuming it) to
/// walk them again.
#[derive(Debug, Clone)]
pub struct Paths<'g> {
    graph: &'g StreamGraph,
    start: NodeId,
    traversal: Traversal,
    stack: Vec<Frame>,
    path: Vec<NodeId>,
    on_path: HashSet<NodeIndex>,
    started: bool,
}

impl<'g> Paths<'g> {
    pub(crate) fn new(graph: &'g StreamGraph, start: NodeId, traversal: Traversal) -> Self {
        Self {
            graph,
            start,
            traversal,
            stack: Vec::new(),
            path: Vec::new(),
            on_path: HashSet::new(),
            started: false,
        }
    }

    /// Rewind to the first path
    pub fn restart(&mut self) {
        self.stack.clear();
        self.path.clear();
        self.on_path.clear();
        self.started = false;
    }

    /// Node every path begins with
    pub fn start(&self) -> NodeId {
        self.start
    }

    /// Direction the paths follow
    pub fn traversal(&self) -> Traversal {
        self.traversal
    }

    fn push(&mut self, idx: NodeIndex) {
        let graph = self.graph;
        let arena = graph.arena();
        self.on_path.insert(idx);
        self.path.push(arena[idx]);

        let mut pending: Vec<NodeIndex> = arena
            .neighbors_directed(idx, self.traversal.direction())
            .filter(|n| !self.on_path.contains(n))
            .collect();
        // Highest id first so pop() yields ascending order
        pending.sort_unstable_by(|a, b| arena[*b].cmp(&arena[*a]));
        pending.dedup();

        self.stack.push(Frame {
            node: idx,
            pending,
            expanded: false,
        });
    }

    fn pop(&mut self) {
        if let Some(frame) = self.stack.pop() {
            self.on_path.remove(&frame.node);
            self.path.pop();
        }
    }
}

impl Iterator for Paths<'_> {
    type Item = Vec<NodeId>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.started {
            self.started = true;
            match self.graph.index_of(self.start) {
                Some(idx) => self.push(idx),
                None => return Some(vec![self.start]),
            }
        }

        loop {
            let frame = self.stack.last_mut()?;
            if !frame.expanded {
                frame.expanded = true;
                if frame.pending.is_empty() {
                    let complete = self.path.clone();
                    self.pop();
                    return Some(complete);
                }
            }

            match frame.pending.pop() {
                Some(next) => {
                    // Another branch may have put `next` on the path since
                    // this frame was expanded.
                    if !self.on_path.contains(&next) {
                        self.push(next);
                    }
                }
                None => self.pop(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(id: u32) -> NodeId {
        NodeId(id)
    }

    fn ids(paths: &[Vec<NodeId>]) -> Vec<Vec<u32>> {
        paths
            .iter()
            .map(|p| p.iter().map(|n| n.0).collect())
            .collect()
    }

    #[test]
    fn test_forward_paths_through_fork_and_merge() {
        let g = StreamGraph::from_edges([(n(1), n(2)), (n(2), n(3)), (n(2), n(4)), (n(3), n(5)), (n(4), n(5))]);
        let paths = g.find_all_paths(n(1), false);
        assert_eq!(ids(&paths), vec![vec![1, 2, 3, 5], vec![1, 2, 4, 5]]);
    }

    #[test]
    fn test_paths_toward_beginning() {
        let g = StreamGraph::from_edges([(n(1), n(3)), (n(2), n(3)), (n(3), n(4))]);
        let paths = g.find_all_paths(n(4), true);
        assert_eq!(ids(&paths), vec![vec![4, 3, 1], vec![4, 3, 2]]);
    }

    #[test]
    fn test_isolated_and_unknown_start() {
        let g = StreamGraph::from_edges([(n(1), n(2))]);
        assert_eq!(ids(&g.find_all_paths(n(2), false)), vec![vec![2]]);
        assert_eq!(ids(&g.find_all_paths(n(42), false)), vec![vec![42]]);
    }

    #[test]
    fn test_enumeration_terminates_on_cycle() {
        let mut g = StreamGraph::from_edges([(n(1), n(2)), (n(2), n(3))]);
        g.unsafe_add_link(n(3), n(1));
        assert_eq!(ids(&g.find_all_paths(n(1), false)), vec![vec![1, 2, 3]]);
    }

    #[test]
    fn test_paths_are_lazy_and_restartable() {
        let g = StreamGraph::from_edges([(n(1), n(2)), (n(1), n(3))]);
        let mut paths = g.paths(n(1), Traversal::Forward);
        assert_eq!(paths.next(), Some(vec![n(1), n(2)]));

        paths.restart();
        let all: Vec<_> = paths.collect();
        assert_eq!(ids(&all), vec![vec![1, 2], vec![1, 3]]);
    }

    #[test]
    fn test_deep_chain_does_not_recurse() {
        let edges: Vec<_> = (0..50_000u32).map(|i| (n(i), n(i + 1))).collect();
        let g = StreamGraph::from_edges(edges);
        let paths = g.find_all_paths(n(0), false);
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].len(), 50_001);
    }
}
