//! Planning state
//!
//! Tracks pending writes on top of repository reads so later actions in a
//! session see the edges earlier actions created or removed. A create that
//! meets a pending delete of the same link cancels it (and vice versa), which
//! keeps emitted batches minimal.

use crate::config::PlannerConfig;
use crate::repository::StreamRepository;
use crate::request::MutationRequest;
use crate::schema::EdgeTableSchema;
use crate::types::{EdgeRowId, EditionId, NodeId, PositionDataPair};
use indexmap::IndexMap;
use scribe_graph::StreamGraph;
use std::collections::{BTreeSet, HashSet, VecDeque};

type Link = (NodeId, NodeId);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    Create,
    Delete(EdgeRowId),
}

/// Outcome of a bounded reachability search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Reach {
    Found,
    NotFound,
    /// Budget ran out before the search finished
    Exhausted,
}

/// Whether a new link must be checked for cycles first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CycleCheck {
    Required,
    /// Caller has proved the link safe
    Skip,
}

pub(crate) struct PlanState<'a, R: ?Sized> {
    repo: &'a R,
    schema: &'a EdgeTableSchema,
    edition: EditionId,
    config: &'a PlannerConfig,
    pub(crate) items: Vec<NodeId>,
    pub(crate) anchors_before: BTreeSet<NodeId>,
    pub(crate) anchors_after: BTreeSet<NodeId>,
    pub(crate) affects_other_paths: bool,
    pub(crate) rejected_links: Vec<Link>,
    pending: IndexMap<Link, Pending>,
}

impl<'a, R> PlanState<'a, R>
where
    R: StreamRepository + ?Sized,
{
    pub(crate) fn new(
        repo: &'a R,
        schema: &'a EdgeTableSchema,
        edition: EditionId,
        config: &'a PlannerConfig,
    ) -> Self {
        Self {
            repo,
            schema,
            edition,
            config,
            items: Vec::new(),
            anchors_before: BTreeSet::new(),
            anchors_after: BTreeSet::new(),
            affects_other_paths: false,
            rejected_links: Vec::new(),
            pending: IndexMap::new(),
        }
    }

    /// Successors of `node` as they will be once pending writes land
    pub(crate) async fn successors(&self, node: NodeId) -> Result<BTreeSet<NodeId>, R::Error> {
        let persisted = self.repo.anchors_after(self.schema, self.edition, node).await?;
        let mut out: BTreeSet<_> = persisted
            .into_iter()
            .filter(|next| !matches!(self.pending.get(&(node, *next)), Some(Pending::Delete(_))))
            .collect();
        out.extend(
            self.pending
                .iter()
                .filter(|(link, p)| link.0 == node && **p == Pending::Create)
                .map(|(link, _)| link.1),
        );
        Ok(out)
    }

    /// Predecessors of `node` as they will be once pending writes land
    pub(crate) async fn predecessors(&self, node: NodeId) -> Result<BTreeSet<NodeId>, R::Error> {
        let persisted = self.repo.anchors_before(self.schema, self.edition, node).await?;
        let mut out: BTreeSet<_> = persisted
            .into_iter()
            .filter(|prev| !matches!(self.pending.get(&(*prev, node)), Some(Pending::Delete(_))))
            .collect();
        out.extend(
            self.pending
                .iter()
                .filter(|(link, p)| link.1 == node && **p == Pending::Create)
                .map(|(link, _)| link.0),
        );
        Ok(out)
    }

    pub(crate) async fn link_exists(&self, item: NodeId, next: NodeId) -> Result<bool, R::Error> {
        match self.pending.get(&(item, next)) {
            Some(Pending::Create) => Ok(true),
            Some(Pending::Delete(_)) => Ok(false),
            None => Ok(self
                .repo
                .count_continuations(self.schema, self.edition, item, next)
                .await?
                > 0),
        }
    }

    /// Plan `item -> next`; returns whether the stream changes
    ///
    /// Self loops and links that would close a cycle are recorded in
    /// `rejected_links` instead.
    pub(crate) async fn create_link(
        &mut self,
        item: NodeId,
        next: NodeId,
        check: CycleCheck,
    ) -> Result<bool, R::Error> {
        if item == next {
            self.reject(item, next);
            return Ok(false);
        }
        let restoring = matches!(self.pending.get(&(item, next)), Some(Pending::Delete(_)));
        if !restoring && self.link_exists(item, next).await? {
            return Ok(false);
        }

        if check == CycleCheck::Required && self.closes_cycle(item, next).await? {
            self.reject(item, next);
            return Ok(false);
        }

        if restoring {
            self.pending.shift_remove(&(item, next));
        } else {
            self.pending.insert((item, next), Pending::Create);
        }
        Ok(true)
    }

    /// Plan removal of `item -> next`; returns whether the stream changes
    pub(crate) async fn delete_link(&mut self, item: NodeId, next: NodeId) -> Result<bool, R::Error> {
        match self.pending.get(&(item, next)) {
            Some(Pending::Create) => {
                self.pending.shift_remove(&(item, next));
                return Ok(true);
            }
            Some(Pending::Delete(_)) => return Ok(false),
            None => {}
        }

        match self
            .repo
            .edge(self.schema, self.edition, item, next)
            .await?
        {
            Some(pair) => {
                self.pending.insert((item, next), Pending::Delete(pair.row_id));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Whether `item -> next` would close a cycle once pending writes land
    ///
    /// The bounded search settles most links cheaply. When its budget runs
    /// out (or no budget is configured) the whole edition is loaded and
    /// checked exactly.
    async fn closes_cycle(&self, item: NodeId, next: NodeId) -> Result<bool, R::Error> {
        if let Some(limit) = self.config.cycle_search_limit {
            match self.reaches(next, item, limit).await? {
                Reach::Found => return Ok(true),
                Reach::NotFound => return Ok(false),
                Reach::Exhausted => tracing::debug!(
                    "Cycle search for {} -> {} exhausted after {} nodes; checking full stream",
                    item,
                    next,
                    limit
                ),
            }
        }
        let graph = self.overlay_graph().await?;
        Ok(graph.path_exists(next, item))
    }

    /// The edition's stream with pending writes applied
    async fn overlay_graph(&self) -> Result<StreamGraph, R::Error> {
        let pairs = self.repo.existing_pairs(self.schema, self.edition).await?;
        let mut graph = StreamGraph::from_edges(pairs.iter().map(PositionDataPair::link));
        for (&(item, next), pending) in &self.pending {
            match pending {
                Pending::Create => graph.unsafe_add_link(item, next),
                Pending::Delete(_) => {
                    graph.remove_link(item, next);
                }
            }
        }
        Ok(graph)
    }

    /// Breadth-first search from `from` for `goal`, visiting at most `limit` nodes
    pub(crate) async fn reaches(
        &self,
        from: NodeId,
        goal: NodeId,
        limit: usize,
    ) -> Result<Reach, R::Error> {
        if from == goal {
            return Ok(Reach::Found);
        }
        let mut visited = HashSet::from([from]);
        let mut queue = VecDeque::from([from]);

        while let Some(node) = queue.pop_front() {
            for next in self.successors(node).await? {
                if next == goal {
                    return Ok(Reach::Found);
                }
                if visited.insert(next) {
                    if visited.len() > limit {
                        return Ok(Reach::Exhausted);
                    }
                    queue.push_back(next);
                }
            }
        }
        Ok(Reach::NotFound)
    }

    fn reject(&mut self, item: NodeId, next: NodeId) {
        tracing::warn!("Rejected link {} -> {}: would close a cycle", item, next);
        if !self.rejected_links.contains(&(item, next)) {
            self.rejected_links.push((item, next));
        }
    }

    /// Pending writes as requests, in the order they were planned
    pub(crate) fn requests(&self) -> Vec<MutationRequest> {
        self.pending
            .iter()
            .map(|(&(item, next), pending)| match pending {
                Pending::Create => MutationRequest::create(self.schema, item, next),
                Pending::Delete(row) => MutationRequest::delete(self.schema, *row),
            })
            .collect()
    }
}
