//! Testing utilities for Scribe workspace
//!
//! Shared fixtures, strategies, and assertions.

#![allow(missing_docs)]

use proptest::prelude::*;
use scribe_graph::StreamGraph;
use scribe_planner::{
    ApplyReport, EditionId, InMemoryStreamStore, MutationPlan, NodeId, StreamType,
};
use std::collections::BTreeSet;

pub const EDITION: EditionId = EditionId(1);

pub fn n(id: u32) -> NodeId {
    NodeId(id)
}

pub fn links(pairs: &[(u32, u32)]) -> Vec<(NodeId, NodeId)> {
    pairs.iter().map(|&(a, b)| (n(a), n(b))).collect()
}

/// `first -> first + 1 -> ... -> last`
pub fn chain(first: u32, last: u32) -> Vec<(NodeId, NodeId)> {
    (first..last).map(|id| (n(id), n(id + 1))).collect()
}

pub fn seeded_store(stream: StreamType, pairs: &[(u32, u32)]) -> InMemoryStreamStore {
    let store = InMemoryStreamStore::new();
    store
        .insert_edges(&stream.schema(), EDITION, links(pairs))
        .unwrap();
    store
}

pub fn apply_plan(store: &InMemoryStreamStore, stream: StreamType, plan: &MutationPlan) -> ApplyReport {
    store
        .apply(&stream.schema(), EDITION, &plan.requests)
        .unwrap()
}

pub fn current_links(store: &InMemoryStreamStore, stream: StreamType) -> BTreeSet<(NodeId, NodeId)> {
    store.links(&stream.schema(), EDITION).into_iter().collect()
}

pub fn assert_acyclic(store: &InMemoryStreamStore, stream: StreamType) {
    let graph = store.graph(&stream.schema(), EDITION);
    assert!(
        graph.is_acyclic(),
        "stream has a cycle: {:?}",
        store.links(&stream.schema(), EDITION)
    );
}

pub fn assert_links(store: &InMemoryStreamStore, stream: StreamType, expected: &[(u32, u32)]) {
    let expected: BTreeSet<_> = links(expected).into_iter().collect();
    assert_eq!(current_links(store, stream), expected);
}

/// Acyclic edge lists over nodes `1..=max_node`
///
/// Edges always point from a lower id to a higher one, so any subset is a DAG.
pub fn dag_edges(max_node: u32, max_edges: usize) -> impl Strategy<Value = Vec<(NodeId, NodeId)>> {
    prop::collection::btree_set((1..max_node, 1..=max_node), 0..=max_edges).prop_map(|pairs| {
        pairs
            .into_iter()
            .filter(|(a, b)| a < b)
            .map(|(a, b)| (n(a), n(b)))
            .collect()
    })
}

/// A [`StreamGraph`] built from [`dag_edges`]
pub fn dag_graph(max_node: u32, max_edges: usize) -> impl Strategy<Value = StreamGraph> {
    dag_edges(max_node, max_edges).prop_map(StreamGraph::from_edges)
}
