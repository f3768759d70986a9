//! Scribe Graph - in-memory sign stream
//!
//! A manuscript's reading order is a directed graph of sign interpretation
//! (or text fragment) ids joined by "immediately followed by" edges. The graph
//! may fork and merge to carry variant readings but must never contain a cycle.
//!
//! [`StreamGraph`] is an owned value type that provides:
//! - Adjacency construction from edge lists
//! - Lazily cached initial/end leaves
//! - Lazy, restartable path enumeration ([`Paths`])
//! - Cycle-safe edge insertion ([`StreamGraph::add_link`])
//!
//! # Example
//!
//! ```rust
//! use scribe_graph::{NodeId, StreamGraph};
//!
//! let mut graph = StreamGraph::from_edges([(1, 2), (2, 3)].map(|(a, b)| (NodeId(a), NodeId(b))));
//!
//! // 3 -> 1 would close a loop
//! assert!(!graph.add_link(NodeId(3), NodeId(1)));
//! assert!(graph.add_link(NodeId(1), NodeId(3)));
//! ```

#![warn(unreachable_pub)]

pub mod error;
pub mod graph;
pub mod paths;

pub use error::GraphError;
pub use graph::{NodeId, StreamGraph};
pub use paths::{Paths, Traversal};
