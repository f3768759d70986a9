use proptest::prelude::*;
use scribe_graph::{NodeId, StreamGraph, Traversal};

fn has_reachable_cycle(graph: &StreamGraph) -> bool {
    // A cycle shows up as an edge whose head can reach its tail.
    graph
        .edges()
        .into_iter()
        .any(|(a, b)| graph.path_exists(b, a))
}

proptest! {
    #[test]
    fn prop_add_link_rejects_exactly_reverse_paths(
        edges in proptest::collection::vec((0..16u32, 0..16u32), 0..48)
    ) {
        let mut graph = StreamGraph::new();

        for (a, b) in edges {
            let (a, b) = (NodeId(a), NodeId(b));
            let reverse_path = graph.path_exists(b, a);
            let before = graph.edge_count();

            let added = graph.add_link(a, b);

            // Rejected if and only if a path already led back
            prop_assert_eq!(added, !reverse_path);
            if !added {
                prop_assert_eq!(graph.edge_count(), before);
            }
            prop_assert!(graph.is_acyclic());
        }

        prop_assert!(!has_reachable_cycle(&graph));
    }

    #[test]
    fn prop_every_enumerated_path_is_a_real_walk(
        edges in proptest::collection::vec((0..10u32, 0..10u32), 0..20)
    ) {
        let mut graph = StreamGraph::new();
        for (a, b) in edges {
            graph.add_link(NodeId(a), NodeId(b));
        }

        for start in graph.initial_leaves().clone() {
            for path in graph.paths(start, Traversal::Forward) {
                prop_assert_eq!(path[0], start);
                for pair in path.windows(2) {
                    prop_assert!(graph.contains_link(pair[0], pair[1]));
                }
                let last = *path.last().unwrap();
                prop_assert!(graph.end_leaves().contains(&last));
            }
        }
    }
}

#[test]
fn test_self_loop_always_rejected() {
    let mut graph = StreamGraph::from_edges([(NodeId(5), NodeId(6))]);
    assert!(!graph.add_link(NodeId(5), NodeId(5)));
    assert!(!graph.add_link(NodeId(6), NodeId(6)));
    assert_eq!(graph.edge_count(), 1);
}

#[test]
fn test_fork_then_merge_reading() {
    // 1 -> 2 -> 4, with a variant 1 -> 3 -> 4
    let mut graph = StreamGraph::new();
    assert!(graph.add_link(NodeId(1), NodeId(2)));
    assert!(graph.add_link(NodeId(2), NodeId(4)));
    assert!(graph.add_link(NodeId(1), NodeId(3)));
    assert!(graph.add_link(NodeId(3), NodeId(4)));
    assert!(!graph.add_link(NodeId(4), NodeId(1)));

    let readings = graph.find_all_paths(NodeId(1), false);
    assert_eq!(readings.len(), 2);
    assert_eq!(graph.initial_leaves().len(), 1);
    assert_eq!(graph.end_leaves().len(), 1);
}
