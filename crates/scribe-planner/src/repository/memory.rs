//! In-memory stream store
//!
//! Reference implementation of both repository traits. Edge rows are keyed
//! by table and owning edition, row ids are unique across the store, and
//! [`InMemoryStreamStore::apply`] applies a batch all-or-nothing the way a
//! transactional executor would.

use super::{HierarchyRepository, StreamRepository};
use crate::error::StoreError;
use crate::hierarchy::TextUnit;
use crate::request::{MutationParameters, MutationRequest};
use crate::schema::EdgeTableSchema;
use crate::types::{EdgeRowId, EditionId, NodeId, PositionDataPair};
use parking_lot::RwLock;
use scribe_graph::StreamGraph;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

type StreamKey = (String, EditionId);
type AttributeKey = (EditionId, TextUnit, u32);

#[derive(Debug, Clone)]
struct RowOwner {
    table: String,
    edition: EditionId,
    link: (NodeId, NodeId),
}

#[derive(Debug, Clone, Default)]
struct StoreState {
    next_row: u32,
    streams: HashMap<StreamKey, BTreeMap<(NodeId, NodeId), EdgeRowId>>,
    rows: HashMap<EdgeRowId, RowOwner>,
    attributes: HashMap<AttributeKey, Vec<(NodeId, u32)>>,
}

impl StoreState {
    fn stream(&self, schema: &EdgeTableSchema, edition: EditionId) -> Option<&BTreeMap<(NodeId, NodeId), EdgeRowId>> {
        self.streams.get(&(schema.table.clone(), edition))
    }

    fn create(
        &mut self,
        schema: &EdgeTableSchema,
        edition: EditionId,
        item: NodeId,
        next_item: NodeId,
    ) -> Result<PositionDataPair, StoreError> {
        if item == next_item {
            return Err(StoreError::SelfLoop(item));
        }
        let stream = self
            .streams
            .entry((schema.table.clone(), edition))
            .or_default();
        if stream.contains_key(&(item, next_item)) {
            return Err(StoreError::DuplicateEdge {
                edition,
                item,
                next_item,
            });
        }

        self.next_row += 1;
        let row_id = EdgeRowId(self.next_row);
        stream.insert((item, next_item), row_id);
        self.rows.insert(
            row_id,
            RowOwner {
                table: schema.table.clone(),
                edition,
                link: (item, next_item),
            },
        );
        Ok(PositionDataPair::new(item, next_item, row_id))
    }

    fn delete(
        &mut self,
        schema: &EdgeTableSchema,
        edition: EditionId,
        row_id: EdgeRowId,
    ) -> Result<PositionDataPair, StoreError> {
        let owner = self
            .rows
            .get(&row_id)
            .filter(|owner| owner.table == schema.table)
            .ok_or(StoreError::UnknownRow(row_id))?;
        if owner.edition != edition {
            return Err(StoreError::WrongEdition {
                row: row_id,
                owner: owner.edition,
                requested: edition,
            });
        }

        let (item, next_item) = owner.link;
        self.rows.remove(&row_id);
        if let Some(stream) = self.streams.get_mut(&(schema.table.clone(), edition)) {
            stream.remove(&(item, next_item));
        }
        Ok(PositionDataPair::new(item, next_item, row_id))
    }
}

/// Rows written by one applied batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub created: Vec<PositionDataPair>,
    pub deleted: Vec<PositionDataPair>,
}

/// Thread-safe in-memory edge storage
#[derive(Debug, Default)]
pub struct InMemoryStreamStore {
    state: RwLock<StoreState>,
    unavailable: AtomicBool,
}

impl InMemoryStreamStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail with [`StoreError::Unavailable`] until reset
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable)
        } else {
            Ok(())
        }
    }

    /// Seed one edge
    pub fn insert_edge(
        &self,
        schema: &EdgeTableSchema,
        edition: EditionId,
        item: NodeId,
        next_item: NodeId,
    ) -> Result<EdgeRowId, StoreError> {
        self.check_available()?;
        let pair = self.state.write().create(schema, edition, item, next_item)?;
        Ok(pair.row_id)
    }

    /// Seed many edges; stops at the first failure
    pub fn insert_edges<I>(
        &self,
        schema: &EdgeTableSchema,
        edition: EditionId,
        edges: I,
    ) -> Result<Vec<EdgeRowId>, StoreError>
    where
        I: IntoIterator<Item = (NodeId, NodeId)>,
    {
        edges
            .into_iter()
            .map(|(item, next)| self.insert_edge(schema, edition, item, next))
            .collect()
    }

    /// Mark `node` as carrying `attribute_value` inside `unit_id`
    pub fn tag_node(
        &self,
        edition: EditionId,
        unit: TextUnit,
        unit_id: u32,
        node: NodeId,
        attribute_value: u32,
    ) {
        self.state
            .write()
            .attributes
            .entry((edition, unit, unit_id))
            .or_default()
            .push((node, attribute_value));
    }

    /// Current `(item, next_item)` links of one edition, sorted
    pub fn links(&self, schema: &EdgeTableSchema, edition: EditionId) -> Vec<(NodeId, NodeId)> {
        self.state
            .read()
            .stream(schema, edition)
            .map(|s| s.keys().copied().collect())
            .unwrap_or_default()
    }

    pub fn edge_count(&self, schema: &EdgeTableSchema, edition: EditionId) -> usize {
        self.state
            .read()
            .stream(schema, edition)
            .map_or(0, BTreeMap::len)
    }

    /// Snapshot one edition as a [`StreamGraph`]
    pub fn graph(&self, schema: &EdgeTableSchema, edition: EditionId) -> StreamGraph {
        StreamGraph::from_edges(self.links(schema, edition))
    }

    /// Apply a batch atomically
    ///
    /// Requests run in order against a draft; the draft replaces the live
    /// state only if every request succeeds.
    pub fn apply(
        &self,
        schema: &EdgeTableSchema,
        edition: EditionId,
        requests: &[MutationRequest],
    ) -> Result<ApplyReport, StoreError> {
        self.check_available()?;

        let mut state = self.state.write();
        let mut draft = state.clone();
        let mut report = ApplyReport::default();

        for request in requests {
            if request.table != schema.table {
                return Err(StoreError::WrongTable {
                    expected: schema.table.clone(),
                    found: request.table.clone(),
                });
            }
            match request.parameters {
                MutationParameters::Link {
                    item, next_item, ..
                } => report
                    .created
                    .push(draft.create(schema, edition, item, next_item)?),
                MutationParameters::Owned { row_id } => {
                    report.deleted.push(draft.delete(schema, edition, row_id)?);
                }
            }
        }

        *state = draft;
        tracing::debug!(
            "Applied batch to edition {}: {} created, {} deleted",
            edition,
            report.created.len(),
            report.deleted.len()
        );
        Ok(report)
    }
}

#[async_trait::async_trait]
impl StreamRepository for InMemoryStreamStore {
    type Error = StoreError;

    async fn anchors_before(
        &self,
        schema: &EdgeTableSchema,
        edition: EditionId,
        item: NodeId,
    ) -> Result<Vec<NodeId>, Self::Error> {
        self.check_available()?;
        let state = self.state.read();
        Ok(state
            .stream(schema, edition)
            .map(|s| {
                s.keys()
                    .filter(|(_, next)| *next == item)
                    .map(|(prev, _)| *prev)
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn anchors_after(
        &self,
        schema: &EdgeTableSchema,
        edition: EditionId,
        item: NodeId,
    ) -> Result<Vec<NodeId>, Self::Error> {
        self.check_available()?;
        let state = self.state.read();
        Ok(state
            .stream(schema, edition)
            .map(|s| {
                s.range((item, NodeId(0))..=(item, NodeId(u32::MAX)))
                    .map(|((_, next), _)| *next)
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn edge(
        &self,
        schema: &EdgeTableSchema,
        edition: EditionId,
        item: NodeId,
        next_item: NodeId,
    ) -> Result<Option<PositionDataPair>, Self::Error> {
        self.check_available()?;
        let state = self.state.read();
        Ok(state
            .stream(schema, edition)
            .and_then(|s| s.get(&(item, next_item)))
            .map(|row| PositionDataPair::new(item, next_item, *row)))
    }

    async fn count_continuations(
        &self,
        schema: &EdgeTableSchema,
        edition: EditionId,
        item: NodeId,
        next_item: NodeId,
    ) -> Result<u32, Self::Error> {
        self.check_available()?;
        let state = self.state.read();
        let found = state
            .stream(schema, edition)
            .is_some_and(|s| s.contains_key(&(item, next_item)));
        Ok(u32::from(found))
    }

    async fn existing_pairs(
        &self,
        schema: &EdgeTableSchema,
        edition: EditionId,
    ) -> Result<Vec<PositionDataPair>, Self::Error> {
        self.check_available()?;
        let state = self.state.read();
        Ok(state
            .stream(schema, edition)
            .map(|s| {
                s.iter()
                    .map(|(&(item, next), &row)| PositionDataPair::new(item, next, row))
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[async_trait::async_trait]
impl HierarchyRepository for InMemoryStreamStore {
    type Error = StoreError;

    async fn nodes_with_attribute(
        &self,
        edition: EditionId,
        unit: TextUnit,
        unit_id: u32,
        attribute_value: u32,
    ) -> Result<Vec<NodeId>, Self::Error> {
        self.check_available()?;
        let state = self.state.read();
        Ok(state
            .attributes
            .get(&(edition, unit, unit_id))
            .map(|tagged| {
                tagged
                    .iter()
                    .filter(|(_, value)| *value == attribute_value)
                    .map(|(node, _)| *node)
                    .collect()
            })
            .unwrap_or_default())
    }
}
