//! `scribe plan`: run one planning session over an edge-list file

use anyhow::{bail, Context, Result};
use scribe_graph::{StreamGraph, Traversal};
use scribe_planner::{
    ApplyReport, EditOperation, EditionId, InMemoryStreamStore, MutationPlan, NodeId,
    PlannerConfig, PositionAction, PositionMutationPlanner, StreamType,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Planning session as read from `--request`
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct SessionFile {
    #[serde(default)]
    pub(crate) stream: Option<String>,
    pub(crate) edition: u32,
    #[serde(default)]
    pub(crate) items: Vec<NodeId>,
    #[serde(default)]
    pub(crate) anchors_before: Vec<NodeId>,
    #[serde(default)]
    pub(crate) anchors_after: Vec<NodeId>,
    #[serde(default)]
    pub(crate) operation: Option<EditOperation>,
    #[serde(default)]
    pub(crate) actions: Vec<PositionAction>,
}

impl SessionFile {
    pub(crate) fn stream(&self) -> Result<StreamType> {
        match &self.stream {
            Some(raw) => Ok(raw.parse()?),
            None => Ok(StreamType::SignInterpretationStream),
        }
    }

    /// Operation actions first, then any explicit ones
    pub(crate) fn planner(&self, config: &PlannerConfig) -> Result<PositionMutationPlanner> {
        if self.operation.is_none() && self.actions.is_empty() {
            bail!("request names neither an operation nor any actions");
        }
        let mut builder = PositionMutationPlanner::builder(self.stream()?, EditionId(self.edition))
            .with_config(config.clone())
            .with_items(self.items.iter().copied())
            .with_anchors_before(self.anchors_before.iter().copied())
            .with_anchors_after(self.anchors_after.iter().copied());
        if let Some(operation) = self.operation {
            builder = builder.with_operation(operation);
        }
        for &action in &self.actions {
            builder = builder.with_action(action);
        }
        Ok(builder.build()?)
    }
}

/// Everything `scribe plan` reports
#[derive(Debug, Serialize)]
pub(crate) struct PlanOutcome {
    pub(crate) plan: MutationPlan,
    /// Edges after applying, when `--apply` was given
    pub(crate) applied: Option<Vec<(NodeId, NodeId)>>,
    /// Complete readings after applying, bounded by `max_enumerated_paths`
    pub(crate) readings: Vec<Vec<NodeId>>,
}

pub(crate) fn read_edges(path: &Path) -> Result<Vec<(NodeId, NodeId)>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read edges from {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("{} is not a JSON edge list", path.display()))
}

pub(crate) fn read_session(path: &Path) -> Result<SessionFile> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read request from {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("{} is not a planning request", path.display()))
}

pub(crate) async fn run(
    config: &PlannerConfig,
    edges: Vec<(NodeId, NodeId)>,
    session: &SessionFile,
    apply: bool,
) -> Result<PlanOutcome> {
    let planner = session.planner(config)?;
    let schema = planner.schema().clone();
    let edition = planner.edition();

    let store = InMemoryStreamStore::new();
    store
        .insert_edges(&schema, edition, edges)
        .context("edge list could not be loaded")?;
    if !store.graph(&schema, edition).is_acyclic() {
        bail!("edge list contains a cycle");
    }

    let plan = planner.create_requests(&store).await?;

    let mut applied = None;
    let mut readings = Vec::new();
    if apply {
        let ApplyReport { created, deleted } = store.apply(&schema, edition, &plan.requests)?;
        tracing::info!("Applied {} create(s), {} delete(s)", created.len(), deleted.len());
        let graph = store.graph(&schema, edition);
        readings = readings_of(&graph, config.max_enumerated_paths);
        applied = Some(graph.edges());
    }

    Ok(PlanOutcome {
        plan,
        applied,
        readings,
    })
}

/// Up to `limit` complete readings, starting from each initial leaf in order
pub(crate) fn readings_of(graph: &StreamGraph, limit: usize) -> Vec<Vec<NodeId>> {
    graph
        .initial_leaves()
        .iter()
        .flat_map(|&start| graph.paths(start, Traversal::Forward))
        .take(limit)
        .collect()
}

pub(crate) fn print_text(outcome: &PlanOutcome) {
    let plan = &outcome.plan;
    if plan.is_empty() {
        println!("No changes.");
    }
    for request in &plan.requests {
        println!("{request}");
    }
    for (item, next) in &plan.rejected_links {
        println!("rejected: {item} -> {next} (would close a cycle)");
    }
    if plan.affects_other_paths {
        println!("warning: other readings share the edited region");
    }

    if let Some(edges) = &outcome.applied {
        println!();
        println!("Edges after apply: {}", edges.len());
        for reading in &outcome.readings {
            let rendered: Vec<String> = reading.iter().map(ToString::to_string).collect();
            println!("  {}", rendered.join(" -> "));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn session(raw: &str) -> SessionFile {
        serde_json::from_str(raw).unwrap()
    }

    fn n(id: u32) -> NodeId {
        NodeId(id)
    }

    #[test]
    fn session_defaults_to_sign_stream() {
        let file = session(r#"{"edition": 3, "operation": "delete", "items": [2]}"#);
        assert_eq!(file.stream().unwrap(), StreamType::SignInterpretationStream);
        let planner = file.planner(&PlannerConfig::default()).unwrap();
        assert_eq!(planner.actions(), &[PositionAction::DeleteAndClose]);
        assert_eq!(planner.edition(), EditionId(3));
    }

    #[test]
    fn session_without_actions_is_rejected() {
        let file = session(r#"{"edition": 1, "items": [2]}"#);
        assert!(file.planner(&PlannerConfig::default()).is_err());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let result: Result<SessionFile, _> =
            serde_json::from_str(r#"{"edition": 1, "itmes": [2]}"#);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn run_applies_and_lists_readings() {
        let file = session(
            r#"{
                "stream": "sign",
                "edition": 1,
                "items": [2],
                "anchors_before": [1],
                "anchors_after": [3],
                "actions": ["take_out_path_of_items"]
            }"#,
        );
        let edges = vec![(n(1), n(2)), (n(2), n(3)), (n(2), n(4))];
        let outcome = run(&PlannerConfig::default(), edges, &file, true).await.unwrap();

        assert!(outcome.plan.affects_other_paths);
        assert_eq!(
            outcome.applied,
            Some(vec![(n(1), n(3)), (n(2), n(4))])
        );
        assert_eq!(outcome.readings, vec![vec![n(1), n(3)], vec![n(2), n(4)]]);
    }

    #[tokio::test]
    async fn run_rejects_cyclic_input() {
        let file = session(r#"{"edition": 1, "operation": "connect"}"#);
        let edges = vec![(n(1), n(2)), (n(2), n(1))];
        assert!(run(&PlannerConfig::default(), edges, &file, false).await.is_err());
    }

    #[test]
    fn reading_enumeration_is_bounded() {
        let graph = StreamGraph::from_edges([(1, 2), (1, 3), (2, 4), (3, 4)].map(|(a, b)| (n(a), n(b))));
        assert_eq!(readings_of(&graph, 1), vec![vec![n(1), n(2), n(4)]]);
        assert_eq!(readings_of(&graph, 10).len(), 2);
    }
}
