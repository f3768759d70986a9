//! Error types for stream graphs

use crate::graph::NodeId;

/// Structural errors raised when a graph is built from untrusted input
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// An edge leads from a node to itself
    #[error("self loop on node {0}")]
    SelfLoop(NodeId),

    /// The edge set contains a cycle
    #[error("edge set contains a cycle")]
    CycleDetected,
}
