//! Weakly connected component partition: merges, splits, bulk rebuilds and the
//! partition invariant.

use std::collections::BTreeSet;

use relation_flow::{
    ComponentNode, Delta, Direction, EngineError, NodeBuilder, Timestamp, Validator,
    WiringContext,
};

fn node() -> ComponentNode<&'static str> {
    ComponentNode::new(WiringContext::standalone()).unwrap()
}

fn rep(node: &ComponentNode<&'static str>, n: &'static str) -> &'static str {
    node.algorithm().representative(&n).copied().unwrap()
}

#[test]
fn test_merge_is_deterministic() {
    let run = || {
        let mut node = node();
        node.apply(Delta::insert("n", "n", Timestamp(1))).unwrap();
        node.apply(Delta::insert("m", "m", Timestamp(1))).unwrap();
        assert_eq!(rep(&node, "n"), "n");
        assert_eq!(rep(&node, "m"), "m");
        node.apply(Delta::insert("n", "m", Timestamp(2))).unwrap();
        Validator::check_components(&node).unwrap();
        (rep(&node, "n"), rep(&node, "m"))
    };
    let first = run();
    assert_eq!(first, ("m", "m"));
    for _ in 0..5 {
        assert_eq!(run(), first);
    }
}

#[test]
fn test_split_of_three_node_path() {
    let mut node = node();
    // The self-edge keeps `a` in the graph once it is cut off.
    node.apply(Delta::insert("a", "a", Timestamp(1))).unwrap();
    node.apply(Delta::insert("a", "b", Timestamp(1))).unwrap();
    node.apply(Delta::insert("b", "c", Timestamp(2))).unwrap();
    assert_eq!(node.algorithm().component_count(), 1);
    Validator::check_components(&node).unwrap();

    let out = node.apply(Delta::delete("a", "b", Timestamp(3))).unwrap();
    Validator::check_components(&node).unwrap();
    assert_eq!(rep(&node, "a"), "a");
    assert_eq!(rep(&node, "b"), rep(&node, "c"));
    assert_ne!(rep(&node, "a"), rep(&node, "b"));
    // b and c each move from a to b.
    assert_eq!(out.len(), 4);
    assert!(out.iter().all(|d| d.timestamp == Timestamp::ZERO));
}

#[test]
fn test_first_edge_announces_both_nodes() {
    let mut node = node();
    let out = node.apply(Delta::insert("x", "y", Timestamp(5))).unwrap();
    assert_eq!(
        out,
        vec![
            Delta::insert("x", "x", Timestamp::ZERO),
            Delta::insert("y", "y", Timestamp::ZERO),
            Delta::delete("y", "y", Timestamp::ZERO),
            Delta::insert("y", "x", Timestamp::ZERO),
        ]
    );
}

#[test]
fn test_last_edge_removal_retracts_nodes() {
    let mut node = node();
    node.apply(Delta::insert("x", "y", Timestamp(1))).unwrap();
    let out = node.apply(Delta::delete("x", "y", Timestamp(2))).unwrap();
    assert_eq!(
        out,
        vec![
            Delta::delete("y", "x", Timestamp::ZERO),
            Delta::insert("y", "y", Timestamp::ZERO),
            Delta::delete("x", "x", Timestamp::ZERO),
            Delta::delete("y", "y", Timestamp::ZERO),
        ]
    );
    assert!(node.materialize().unwrap().is_empty());
    assert!(node.graph().is_empty());
}

#[test]
fn test_reinitialize_matches_incremental_partition() {
    let edges = [
        ("a", "b"),
        ("c", "b"),
        ("d", "e"),
        ("f", "f"),
        ("g", "d"),
        ("h", "a"),
    ];

    let mut incremental = node();
    incremental
        .apply_all(edges.iter().map(|&(s, t)| Delta::insert(s, t, Timestamp(1))))
        .unwrap();

    let mut bulk = node();
    bulk.apply(Delta::insert("z", "q", Timestamp(1))).unwrap();
    bulk.reinitialize_with(edges).unwrap();

    assert_eq!(
        bulk.algorithm().components(),
        incremental.algorithm().components()
    );
    assert_eq!(bulk.materialize().unwrap(), incremental.materialize().unwrap());
    assert!(bulk.algorithm().representative(&"z").is_none());
    Validator::check_components(&bulk).unwrap();
    Validator::check_components(&incremental).unwrap();
}

#[test]
fn test_reinitialize_elects_same_representative_as_replay() {
    // The later edge pulls in a smaller node than the first component's representative.
    let edges = [("b", "c"), ("a", "b")];

    let mut incremental = node();
    incremental
        .apply_all(edges.iter().map(|&(s, t)| Delta::insert(s, t, Timestamp(1))))
        .unwrap();
    let mut bulk = node();
    bulk.reinitialize_with(edges).unwrap();

    assert_eq!(
        bulk.algorithm().components(),
        incremental.algorithm().components()
    );
    assert_eq!(rep(&incremental, "c"), "a");
    assert_eq!(
        incremental.algorithm().component_of(&"b"),
        Some(&BTreeSet::from(["a", "b", "c"]))
    );
}

#[test]
fn test_materialize_lists_every_node_once() {
    let mut node = node();
    node.apply_all([
        Delta::insert("a", "b", Timestamp(1)),
        Delta::insert("c", "d", Timestamp(1)),
        Delta::insert("b", "c", Timestamp(1)),
    ])
    .unwrap();
    let tuples = node.materialize().unwrap();
    assert_eq!(tuples.len(), 4);
    let reps: BTreeSet<_> = tuples.iter().map(|(_, r)| *r).collect();
    assert_eq!(reps.len(), 1);
    Validator::check_materialized(node.algorithm(), &tuples).unwrap();

    let timelines = node.materialize_timestamped().unwrap();
    assert_eq!(timelines.len(), 4);
    assert!(timelines
        .values()
        .all(|t| t.moments() == [Timestamp::ZERO]));
}

#[test]
fn test_outputs_replay_to_materialized_state() {
    let mut node = node();
    let mut replayed: BTreeSet<(&str, &str)> = BTreeSet::new();
    let script = [
        Delta::insert("a", "b", Timestamp(1)),
        Delta::insert("c", "d", Timestamp(2)),
        Delta::insert("d", "a", Timestamp(3)),
        Delta::insert("e", "e", Timestamp(4)),
        Delta::delete("d", "a", Timestamp(5)),
        Delta::insert("b", "c", Timestamp(6)),
        Delta::delete("a", "b", Timestamp(7)),
        Delta::delete("e", "e", Timestamp(8)),
    ];
    for delta in script {
        for out in node.apply(delta).unwrap() {
            match out.direction {
                Direction::Insert => assert!(replayed.insert(out.tuple)),
                Direction::Delete => assert!(replayed.remove(&out.tuple)),
            }
        }
        assert_eq!(replayed, node.materialize().unwrap());
        Validator::check_components(&node).unwrap();
    }
}

#[test]
fn test_recursive_group_is_rejected_at_build_time() {
    let result: Result<ComponentNode<u32>, _> =
        NodeBuilder::new().wiring(WiringContext::recursive()).build();
    assert!(matches!(
        result,
        Err(EngineError::RecursiveGroup {
            algorithm: "ComponentElection"
        })
    ));
}
