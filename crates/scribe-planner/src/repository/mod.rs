//! Repository seam
//!
//! The planner never touches storage directly. Everything it needs to know
//! about persisted edges comes through [`StreamRepository`]; callers that
//! resolve hierarchy terminators go through [`HierarchyRepository`].
//!
//! Implementations return their own error type. The planner propagates it
//! unchanged.

pub mod memory;

pub use memory::InMemoryStreamStore;

use crate::hierarchy::TextUnit;
use crate::schema::EdgeTableSchema;
use crate::types::{EditionId, NodeId, PositionDataPair};

/// Query primitives over one edition's persisted stream edges
///
/// Every call names the schema (table and columns) and the owning edition;
/// rows owned by other editions must be invisible.
#[async_trait::async_trait]
pub trait StreamRepository: Send + Sync {
    /// Storage failure type, propagated unchanged by the planner
    type Error: std::error::Error + Send + Sync + 'static;

    /// Nodes with an edge into `item`
    async fn anchors_before(
        &self,
        schema: &EdgeTableSchema,
        edition: EditionId,
        item: NodeId,
    ) -> Result<Vec<NodeId>, Self::Error>;

    /// Nodes `item` has an edge to
    async fn anchors_after(
        &self,
        schema: &EdgeTableSchema,
        edition: EditionId,
        item: NodeId,
    ) -> Result<Vec<NodeId>, Self::Error>;

    /// The persisted row for `item -> next_item`, if any
    async fn edge(
        &self,
        schema: &EdgeTableSchema,
        edition: EditionId,
        item: NodeId,
        next_item: NodeId,
    ) -> Result<Option<PositionDataPair>, Self::Error>;

    /// Number of edges leaving `item` that continue to `next_item`
    async fn count_continuations(
        &self,
        schema: &EdgeTableSchema,
        edition: EditionId,
        item: NodeId,
        next_item: NodeId,
    ) -> Result<u32, Self::Error>;

    /// Every edge owned by `edition`
    async fn existing_pairs(
        &self,
        schema: &EdgeTableSchema,
        edition: EditionId,
    ) -> Result<Vec<PositionDataPair>, Self::Error>;
}

/// Lookup of signs carrying hierarchy attributes
#[async_trait::async_trait]
pub trait HierarchyRepository: Send + Sync {
    /// Storage failure type
    type Error: std::error::Error + Send + Sync + 'static;

    /// Sign interpretations inside `unit_id` whose attribute value is
    /// `attribute_value`
    async fn nodes_with_attribute(
        &self,
        edition: EditionId,
        unit: TextUnit,
        unit_id: u32,
        attribute_value: u32,
    ) -> Result<Vec<NodeId>, Self::Error>;
}
