//! Core types for position planning
//!
//! Defines the identifiers and the persisted-edge tuple shared by the
//! planner, the repository seam and the mutation requests it emits.

use serde::{Deserialize, Serialize};

pub use scribe_graph::NodeId;

/// Edition (tenant-scoped version) that owns a set of edges
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EditionId(pub u32);

impl std::fmt::Display for EditionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Row identity of one persisted edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeRowId(pub u32);

impl std::fmt::Display for EdgeRowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One persisted edge: `item` is immediately followed by `next_item`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PositionDataPair {
    pub item: NodeId,
    pub next_item: NodeId,
    pub row_id: EdgeRowId,
}

impl PositionDataPair {
    #[inline]
    #[must_use]
    pub fn new(item: NodeId, next_item: NodeId, row_id: EdgeRowId) -> Self {
        Self {
            item,
            next_item,
            row_id,
        }
    }

    /// The `(item, next_item)` link this row persists
    #[inline]
    #[must_use]
    pub fn link(&self) -> (NodeId, NodeId) {
        (self.item, self.next_item)
    }
}
