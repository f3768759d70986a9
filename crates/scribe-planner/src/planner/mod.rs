//! Position mutation planner
//!
//! A planning session names a stream, an edition, an ordered path of items,
//! the anchors around the edited region and a queue of actions.
//! [`PositionMutationPlanner::create_requests`] walks the queue against a
//! [`StreamRepository`] and returns the edge writes that carry it out. Nothing
//! is written: the caller hands the plan to a transactional executor.
//!
//! # Example
//!
//! ```rust,ignore
//! let planner = PositionMutationPlanner::builder(StreamType::SignInterpretationStream, edition)
//!     .with_items([NodeId(7)])
//!     .with_anchors_before([NodeId(3)])
//!     .with_operation(EditOperation::Insert)
//!     .build()?;
//!
//! let plan = planner.create_requests(&repo).await?;
//! executor.apply(plan.requests).await?;
//! ```

mod actions;
mod state;

use crate::config::PlannerConfig;
use crate::error::PlannerError;
use crate::hierarchy::UnitBounds;
use crate::repository::StreamRepository;
use crate::request::MutationRequest;
use crate::schema::{EdgeTableSchema, StreamType};
use crate::types::{EdgeRowId, EditionId, NodeId};
use serde::{Deserialize, Serialize};
use state::PlanState;
use std::collections::{BTreeSet, HashSet};

/// One queued planning step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionAction {
    /// Link consecutive items, anchors before to the first item and the last
    /// item to anchors after; existing edges are skipped
    CreatePathFromItems,
    /// Cut the edges joining the anchor sets, discovering the missing side
    /// when only one is given
    DisconnectNeighbouringAnchors,
    /// Link every anchor before to every anchor after
    ConnectAnchors,
    /// Cut the path out of the stream and bridge the gap it leaves
    TakeOutPathOfItems,
    /// Detach the path completely so its items can be deleted
    #[serde(alias = "delete_and_close_can_be_deleted")]
    DeleteAndClose,
    /// Detach the path and splice it between the anchors
    MoveInBetween,
}

/// Editorial operations expressed as action sequences
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditOperation {
    /// Put new items between the anchors
    Insert,
    /// Remove items and close the gap
    Delete,
    /// Relocate items between the anchors
    Move,
    /// Cut the items out, keeping branches at the ends, and bridge the gap
    Splice,
    /// Cut the edges between the anchors
    Disconnect,
    /// Join the anchors directly
    Connect,
}

impl EditOperation {
    #[must_use]
    pub fn actions(self) -> &'static [PositionAction] {
        use PositionAction as A;
        match self {
            EditOperation::Insert => &[A::DisconnectNeighbouringAnchors, A::CreatePathFromItems],
            EditOperation::Delete => &[A::DeleteAndClose],
            EditOperation::Move => &[A::MoveInBetween],
            EditOperation::Splice => &[A::TakeOutPathOfItems],
            EditOperation::Disconnect => &[A::DisconnectNeighbouringAnchors],
            EditOperation::Connect => &[A::ConnectAnchors],
        }
    }
}

/// The planner's output
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationPlan {
    /// Edge writes in the order they were planned
    pub requests: Vec<MutationRequest>,
    /// Set when an edge outside the requested splice points was found,
    /// meaning another reading shares the edited region
    pub affects_other_paths: bool,
    /// Anchor sets after planning, including discovered neighbours
    pub anchors_before: BTreeSet<NodeId>,
    pub anchors_after: BTreeSet<NodeId>,
    /// Links that were not planned because they would close a cycle
    pub rejected_links: Vec<(NodeId, NodeId)>,
}

impl MutationPlan {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Links the plan creates
    pub fn created_links(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.requests.iter().filter_map(MutationRequest::link)
    }

    /// Rows the plan deletes
    pub fn deleted_rows(&self) -> impl Iterator<Item = EdgeRowId> + '_ {
        self.requests.iter().filter_map(MutationRequest::row_id)
    }

    /// Net change in edge count once applied
    #[must_use]
    pub fn edge_delta(&self) -> isize {
        let created = self.requests.iter().filter(|r| r.is_create()).count();
        let deleted = self.requests.len() - created;
        created as isize - deleted as isize
    }
}

/// Validating builder for [`PositionMutationPlanner`]
#[derive(Debug, Clone)]
pub struct PlannerBuilder {
    stream: StreamType,
    edition: EditionId,
    schema: Option<EdgeTableSchema>,
    config: PlannerConfig,
    items: Vec<NodeId>,
    anchors_before: BTreeSet<NodeId>,
    anchors_after: BTreeSet<NodeId>,
    actions: Vec<PositionAction>,
}

impl PlannerBuilder {
    /// Path of items, in reading order
    #[must_use]
    pub fn with_items(mut self, items: impl IntoIterator<Item = NodeId>) -> Self {
        self.items.extend(items);
        self
    }

    #[must_use]
    pub fn with_anchors_before(mut self, anchors: impl IntoIterator<Item = NodeId>) -> Self {
        self.anchors_before.extend(anchors);
        self
    }

    #[must_use]
    pub fn with_anchors_after(mut self, anchors: impl IntoIterator<Item = NodeId>) -> Self {
        self.anchors_after.extend(anchors);
        self
    }

    /// Queue one action
    #[must_use]
    pub fn with_action(mut self, action: PositionAction) -> Self {
        self.actions.push(action);
        self
    }

    /// Queue the actions of an editorial operation
    #[must_use]
    pub fn with_operation(mut self, operation: EditOperation) -> Self {
        self.actions.extend_from_slice(operation.actions());
        self
    }

    /// Insert after the unit's start terminators
    #[must_use]
    pub fn after_unit_start(self, bounds: &UnitBounds) -> Self {
        self.with_anchors_before(bounds.starts.iter().copied())
    }

    /// Insert before the unit's end terminators
    #[must_use]
    pub fn before_unit_end(self, bounds: &UnitBounds) -> Self {
        self.with_anchors_after(bounds.ends.iter().copied())
    }

    /// Replace the stream's default schema
    #[must_use]
    pub fn with_schema(mut self, schema: EdgeTableSchema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Use `config`, including its schema overrides
    #[must_use]
    pub fn with_config(mut self, config: PlannerConfig) -> Self {
        self.config = config;
        self
    }

    /// Validate inputs and produce the planner
    pub fn build(self) -> Result<PositionMutationPlanner, PlannerError> {
        let schema = match self.schema {
            Some(schema) => {
                schema.validate()?;
                schema
            }
            None => self.config.schema.resolve(self.stream)?,
        };
        if schema.stream != self.stream {
            return Err(PlannerError::StreamMismatch {
                expected: self.stream,
                found: schema.stream,
            });
        }

        let mut seen = HashSet::new();
        for &item in &self.items {
            if !seen.insert(item) {
                return Err(PlannerError::DuplicateItem(item));
            }
            if self.anchors_before.contains(&item) || self.anchors_after.contains(&item) {
                return Err(PlannerError::AnchorIsItem(item));
            }
        }
        if let Some(&both) = self.anchors_before.intersection(&self.anchors_after).next() {
            return Err(PlannerError::AnchorOnBothSides(both));
        }

        Ok(PositionMutationPlanner {
            stream: self.stream,
            edition: self.edition,
            schema,
            config: self.config,
            items: self.items,
            anchors_before: self.anchors_before,
            anchors_after: self.anchors_after,
            actions: self.actions,
        })
    }
}

/// Validated planning session
#[derive(Debug, Clone)]
pub struct PositionMutationPlanner {
    stream: StreamType,
    edition: EditionId,
    schema: EdgeTableSchema,
    config: PlannerConfig,
    items: Vec<NodeId>,
    anchors_before: BTreeSet<NodeId>,
    anchors_after: BTreeSet<NodeId>,
    actions: Vec<PositionAction>,
}

impl PositionMutationPlanner {
    /// Start a session for `edition`'s `stream`
    #[must_use]
    pub fn builder(stream: StreamType, edition: EditionId) -> PlannerBuilder {
        PlannerBuilder {
            stream,
            edition,
            schema: None,
            config: PlannerConfig::default(),
            items: Vec::new(),
            anchors_before: BTreeSet::new(),
            anchors_after: BTreeSet::new(),
            actions: Vec::new(),
        }
    }

    pub fn stream(&self) -> StreamType {
        self.stream
    }

    pub fn edition(&self) -> EditionId {
        self.edition
    }

    pub fn schema(&self) -> &EdgeTableSchema {
        &self.schema
    }

    pub fn items(&self) -> &[NodeId] {
        &self.items
    }

    pub fn actions(&self) -> &[PositionAction] {
        &self.actions
    }

    /// Plan every queued action in order
    ///
    /// Repository errors are returned as-is; nothing has been written when
    /// one occurs.
    pub async fn create_requests<R>(&self, repo: &R) -> Result<MutationPlan, R::Error>
    where
        R: StreamRepository + ?Sized,
    {
        tracing::info!(
            "Planning {} action(s) on {} stream of edition {}",
            self.actions.len(),
            self.stream,
            self.edition
        );

        let mut state = PlanState::new(repo, &self.schema, self.edition, &self.config);
        state.items.clone_from(&self.items);
        state.anchors_before.clone_from(&self.anchors_before);
        state.anchors_after.clone_from(&self.anchors_after);

        for &action in &self.actions {
            actions::dispatch(action, &mut state).await?;
        }

        let plan = MutationPlan {
            requests: state.requests(),
            affects_other_paths: state.affects_other_paths,
            anchors_before: state.anchors_before,
            anchors_after: state.anchors_after,
            rejected_links: state.rejected_links,
        };

        tracing::info!(
            "Planned {} request(s) for edition {}{}",
            plan.requests.len(),
            self.edition,
            if plan.affects_other_paths {
                " (other readings affected)"
            } else {
                ""
            }
        );
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SchemaError;
    use crate::repository::InMemoryStreamStore;

    const ED: EditionId = EditionId(1);
    const SIGNS: StreamType = StreamType::SignInterpretationStream;

    fn n(id: u32) -> NodeId {
        NodeId(id)
    }

    fn store(edges: &[(u32, u32)]) -> InMemoryStreamStore {
        let store = InMemoryStreamStore::new();
        store
            .insert_edges(&SIGNS.schema(), ED, edges.iter().map(|&(a, b)| (n(a), n(b))))
            .unwrap();
        store
    }

    #[test]
    fn build_rejects_duplicate_items() {
        let result = PositionMutationPlanner::builder(SIGNS, ED)
            .with_items([n(1), n(2), n(1)])
            .build();
        assert_eq!(result.unwrap_err(), PlannerError::DuplicateItem(n(1)));
    }

    #[test]
    fn build_rejects_item_used_as_anchor() {
        let result = PositionMutationPlanner::builder(SIGNS, ED)
            .with_items([n(1), n(2)])
            .with_anchors_after([n(2)])
            .build();
        assert_eq!(result.unwrap_err(), PlannerError::AnchorIsItem(n(2)));
    }

    #[test]
    fn build_rejects_anchor_on_both_sides() {
        let result = PositionMutationPlanner::builder(SIGNS, ED)
            .with_anchors_before([n(4)])
            .with_anchors_after([n(4)])
            .build();
        assert_eq!(result.unwrap_err(), PlannerError::AnchorOnBothSides(n(4)));
    }

    #[test]
    fn build_rejects_bad_schema() {
        let mut schema = SIGNS.schema();
        schema.next_item_column.clone_from(&schema.item_column);
        let result = PositionMutationPlanner::builder(SIGNS, ED)
            .with_schema(schema)
            .build();
        assert!(matches!(
            result,
            Err(PlannerError::Schema(SchemaError::IdenticalColumns(_)))
        ));

        let result = PositionMutationPlanner::builder(SIGNS, ED)
            .with_schema(StreamType::TextFragmentStream.schema())
            .build();
        assert!(matches!(result, Err(PlannerError::StreamMismatch { .. })));
    }

    #[test]
    fn operations_expand_to_actions() {
        let planner = PositionMutationPlanner::builder(SIGNS, ED)
            .with_operation(EditOperation::Insert)
            .with_action(PositionAction::ConnectAnchors)
            .build()
            .unwrap();
        assert_eq!(
            planner.actions(),
            &[
                PositionAction::DisconnectNeighbouringAnchors,
                PositionAction::CreatePathFromItems,
                PositionAction::ConnectAnchors,
            ]
        );
    }

    #[tokio::test]
    async fn empty_items_is_a_noop() {
        let repo = store(&[(1, 2)]);
        for action in [
            PositionAction::CreatePathFromItems,
            PositionAction::TakeOutPathOfItems,
            PositionAction::DeleteAndClose,
        ] {
            let planner = PositionMutationPlanner::builder(SIGNS, ED)
                .with_anchors_before([n(1)])
                .with_action(action)
                .build()
                .unwrap();
            let plan = planner.create_requests(&repo).await.unwrap();
            assert!(plan.is_empty(), "{action:?}");
        }
    }

    #[tokio::test]
    async fn create_then_delete_cancels_out() {
        let repo = store(&[]);
        let planner = PositionMutationPlanner::builder(SIGNS, ED)
            .with_items([n(1), n(2)])
            .with_action(PositionAction::CreatePathFromItems)
            .with_action(PositionAction::DeleteAndClose)
            .build()
            .unwrap();
        let plan = planner.create_requests(&repo).await.unwrap();
        assert!(plan.is_empty());
    }

    #[tokio::test]
    async fn self_cycle_through_anchors_rejected() {
        // 1 -> 2 -> 3; linking 3 before the path [4] and 1 after it closes a loop
        let repo = store(&[(1, 2), (2, 3)]);
        let planner = PositionMutationPlanner::builder(SIGNS, ED)
            .with_items([n(4)])
            .with_anchors_before([n(3)])
            .with_anchors_after([n(1)])
            .with_action(PositionAction::CreatePathFromItems)
            .build()
            .unwrap();
        let plan = planner.create_requests(&repo).await.unwrap();

        assert_eq!(plan.created_links().collect::<Vec<_>>(), vec![(n(3), n(4))]);
        assert_eq!(plan.rejected_links, vec![(n(4), n(1))]);
    }

    #[tokio::test]
    async fn full_stream_check_sees_pending_links() {
        let repo = store(&[(1, 2), (2, 3)]);
        let planner = PositionMutationPlanner::builder(SIGNS, ED)
            .with_items([n(4)])
            .with_anchors_before([n(3)])
            .with_anchors_after([n(1)])
            .with_action(PositionAction::CreatePathFromItems)
            .with_config(PlannerConfig::new().with_cycle_search_limit(None))
            .build()
            .unwrap();
        let plan = planner.create_requests(&repo).await.unwrap();

        // 4 -> 1 only closes a loop through the pending 3 -> 4
        assert_eq!(plan.created_links().collect::<Vec<_>>(), vec![(n(3), n(4))]);
        assert_eq!(plan.rejected_links, vec![(n(4), n(1))]);
    }

    #[test]
    fn edge_delta_counts_creates_minus_deletes() {
        let schema = SIGNS.schema();
        let plan = MutationPlan {
            requests: vec![
                MutationRequest::delete(&schema, EdgeRowId(1)),
                MutationRequest::delete(&schema, EdgeRowId(2)),
                MutationRequest::create(&schema, n(1), n(3)),
            ],
            ..MutationPlan::default()
        };
        assert_eq!(plan.edge_delta(), -1);
        assert_eq!(plan.deleted_rows().count(), 2);
    }
}
