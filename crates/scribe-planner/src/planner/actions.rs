//! Action dispatch
//!
//! Each [`PositionAction`] is interpreted by one function over an explicit
//! [`PlanState`]. Composite actions call the primitive ones in sequence.

use super::state::{PlanState, CycleCheck};
use super::PositionAction;
use crate::repository::StreamRepository;
use crate::types::NodeId;
use scribe_graph::StreamGraph;
use std::collections::{BTreeSet, HashSet};

/// How extraction treats edges at the ends of the path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Extraction {
    /// Cut only the splice edges named by the anchors and keep any other
    /// branch that starts or ends at the path's ends
    Splice,
    /// Cut every external edge so the path is fully detached
    Release,
}

pub(crate) async fn dispatch<R>(
    action: PositionAction,
    state: &mut PlanState<'_, R>,
) -> Result<(), R::Error>
where
    R: StreamRepository + ?Sized,
{
    tracing::debug!("Dispatching {:?} over {} item(s)", action, state.items.len());
    match action {
        PositionAction::CreatePathFromItems => create_path_from_items(state).await,
        PositionAction::DisconnectNeighbouringAnchors => {
            disconnect_neighbouring_anchors(state).await
        }
        PositionAction::ConnectAnchors => connect_anchors(state).await,
        PositionAction::TakeOutPathOfItems => {
            take_out_path_of_items(state, Extraction::Splice).await
        }
        PositionAction::DeleteAndClose => {
            take_out_path_of_items(state, Extraction::Release).await?;
            remove_links_between_items(state).await
        }
        PositionAction::MoveInBetween => {
            take_out_path_of_items(state, Extraction::Release).await?;
            disconnect_neighbouring_anchors(state).await?;
            create_path_from_items(state).await
        }
    }
}

async fn create_path_from_items<R>(state: &mut PlanState<'_, R>) -> Result<(), R::Error>
where
    R: StreamRepository + ?Sized,
{
    let items = state.items.clone();
    let (Some(&first), Some(&last)) = (items.first(), items.last()) else {
        return Ok(());
    };

    for pair in items.windows(2) {
        state.create_link(pair[0], pair[1], CycleCheck::Required).await?;
    }
    for anchor in state.anchors_before.clone() {
        state.create_link(anchor, first, CycleCheck::Required).await?;
    }
    for anchor in state.anchors_after.clone() {
        state.create_link(last, anchor, CycleCheck::Required).await?;
    }
    Ok(())
}

async fn disconnect_neighbouring_anchors<R>(state: &mut PlanState<'_, R>) -> Result<(), R::Error>
where
    R: StreamRepository + ?Sized,
{
    match (state.anchors_before.is_empty(), state.anchors_after.is_empty()) {
        (true, true) => {}
        (false, true) => {
            for anchor in state.anchors_before.clone() {
                for next in state.successors(anchor).await? {
                    state.delete_link(anchor, next).await?;
                    state.anchors_after.insert(next);
                }
            }
        }
        (true, false) => {
            for anchor in state.anchors_after.clone() {
                for prev in state.predecessors(anchor).await? {
                    state.delete_link(prev, anchor).await?;
                    state.anchors_before.insert(prev);
                }
            }
        }
        (false, false) => {
            for before in state.anchors_before.clone() {
                for after in state.anchors_after.clone() {
                    state.delete_link(before, after).await?;
                }
            }
        }
    }
    Ok(())
}

async fn connect_anchors<R>(state: &mut PlanState<'_, R>) -> Result<(), R::Error>
where
    R: StreamRepository + ?Sized,
{
    for before in state.anchors_before.clone() {
        for after in state.anchors_after.clone() {
            state.create_link(before, after, CycleCheck::Required).await?;
        }
    }
    Ok(())
}

/// Detach the item path from the surrounding stream
///
/// Every reading that entered the path at item `k` from an external node `p`
/// and left it at item `j` toward an external node `s` is preserved by a
/// bridge `p -> s`. Bridges only join nodes that were already connected, so
/// they cannot close a cycle.
async fn take_out_path_of_items<R>(
    state: &mut PlanState<'_, R>,
    mode: Extraction,
) -> Result<(), R::Error>
where
    R: StreamRepository + ?Sized,
{
    let items = state.items.clone();
    if items.is_empty() {
        return Ok(());
    }
    let on_path: HashSet<NodeId> = items.iter().copied().collect();
    let last = items.len() - 1;

    let before = boundary_filter(mode, &state.anchors_before);
    let after = boundary_filter(mode, &state.anchors_after);
    let is_splice = |filter: &Option<BTreeSet<NodeId>>, node: &NodeId| {
        filter.as_ref().map_or(true, |anchors| anchors.contains(node))
    };

    let mut internal = StreamGraph::new();
    let mut entries: Vec<(NodeId, NodeId)> = Vec::new();
    let mut exits: Vec<(NodeId, NodeId)> = Vec::new();

    for (k, &item) in items.iter().enumerate() {
        let external_prev: Vec<_> = state
            .predecessors(item)
            .await?
            .into_iter()
            .filter(|p| !on_path.contains(p))
            .collect();
        if k == 0 && before.is_none() && external_prev.len() > 1 {
            // Merge into the first item: another reading joins here
            state.affects_other_paths = true;
        }
        for prev in external_prev {
            let splice = k == 0 && is_splice(&before, &prev);
            if !splice {
                state.affects_other_paths = true;
                if k == 0 {
                    tracing::debug!("Keeping branch {} -> {} into the path start", prev, item);
                    continue;
                }
            }
            if state.delete_link(prev, item).await? {
                entries.push((prev, item));
            }
        }

        let successors = state.successors(item).await?;
        let mut external_next = Vec::new();
        for next in successors {
            if on_path.contains(&next) {
                internal.unsafe_add_link(item, next);
            } else {
                external_next.push(next);
            }
        }
        if k == last && after.is_none() && external_next.len() > 1 {
            // Fork at the last item: another reading leaves here
            state.affects_other_paths = true;
        }
        for next in external_next {
            let splice = k == last && is_splice(&after, &next);
            if !splice {
                state.affects_other_paths = true;
                if k == last {
                    tracing::debug!("Keeping branch {} -> {} out of the path end", item, next);
                    continue;
                }
            }
            if state.delete_link(item, next).await? {
                exits.push((item, next));
            }
        }
    }

    for &(prev, entry) in &entries {
        for &(exit, next) in &exits {
            if prev != next && internal.path_exists(entry, exit) {
                state.create_link(prev, next, CycleCheck::Skip).await?;
            }
        }
    }

    tracing::debug!(
        "Took out {} item(s): {} entry edge(s), {} exit edge(s) cut",
        items.len(),
        entries.len(),
        exits.len()
    );
    Ok(())
}

/// Anchors that decide which end edges are splices; `None` means all are
fn boundary_filter(mode: Extraction, anchors: &BTreeSet<NodeId>) -> Option<BTreeSet<NodeId>> {
    match mode {
        Extraction::Splice if !anchors.is_empty() => Some(anchors.clone()),
        _ => None,
    }
}

async fn remove_links_between_items<R>(state: &mut PlanState<'_, R>) -> Result<(), R::Error>
where
    R: StreamRepository + ?Sized,
{
    let items = state.items.clone();
    let on_path: HashSet<NodeId> = items.iter().copied().collect();
    for &item in &items {
        for next in state.successors(item).await? {
            if on_path.contains(&next) {
                state.delete_link(item, next).await?;
            }
        }
    }
    Ok(())
}
