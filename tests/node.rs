//! Node lifecycle, bulk replacement and tracer hooks.

use std::fmt::Debug;
use std::sync::Arc;

use parking_lot::Mutex;
use relation_flow::{
    ClosureNode, ComponentNode, Delta, Direction, EngineError, NodeBuilder, NodeState, Timestamp,
    Tracer, Validator, WiringContext,
};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Event {
    Received(Direction, String),
    NodeInserted(String),
    NodeDeleted(String),
    Output(Direction, String, Timestamp),
    Applied(usize),
    Reinitialized(&'static str, usize),
    Cleared(&'static str),
    Disposed(&'static str),
    Rejected(&'static str),
}

/// Tracer that records events for assertions.
#[derive(Clone, Default)]
struct Recorder {
    events: Arc<Mutex<Vec<Event>>>,
}

impl Recorder {
    fn take(&self) -> Vec<Event> {
        std::mem::take(&mut *self.events.lock())
    }

    fn push(&self, event: Event) {
        self.events.lock().push(event);
    }
}

impl Tracer for Recorder {
    fn on_delta_received(&self, direction: Direction, tuple: &dyn Debug, _: Timestamp) {
        self.push(Event::Received(direction, format!("{tuple:?}")));
    }

    fn on_graph_node_inserted(&self, node: &dyn Debug) {
        self.push(Event::NodeInserted(format!("{node:?}")));
    }

    fn on_graph_node_deleted(&self, node: &dyn Debug) {
        self.push(Event::NodeDeleted(format!("{node:?}")));
    }

    fn on_output(&self, direction: Direction, tuple: &dyn Debug, timestamp: Timestamp) {
        self.push(Event::Output(direction, format!("{tuple:?}"), timestamp));
    }

    fn on_delta_applied(&self, outputs: usize) {
        self.push(Event::Applied(outputs));
    }

    fn on_reinitialized(&self, algorithm: &'static str, edges: usize) {
        self.push(Event::Reinitialized(algorithm, edges));
    }

    fn on_cleared(&self, algorithm: &'static str) {
        self.push(Event::Cleared(algorithm));
    }

    fn on_disposed(&self, algorithm: &'static str) {
        self.push(Event::Disposed(algorithm));
    }

    fn on_wiring_rejected(&self, algorithm: &'static str, _: WiringContext) {
        self.push(Event::Rejected(algorithm));
    }
}

#[test]
fn test_tracer_sees_apply_lifecycle() {
    let recorder = Recorder::default();
    let mut node: ClosureNode<u32, Recorder> =
        NodeBuilder::new().tracer(recorder.clone()).build().unwrap();

    node.apply(Delta::insert(1, 2, Timestamp(3))).unwrap();
    assert_eq!(
        recorder.take(),
        vec![
            Event::Received(Direction::Insert, "(1, 2)".to_string()),
            Event::NodeInserted("1".to_string()),
            Event::NodeInserted("2".to_string()),
            Event::Output(Direction::Insert, "(1, 2)".to_string(), Timestamp(3)),
            Event::Applied(1),
        ]
    );

    node.apply(Delta::delete(1, 2, Timestamp(4))).unwrap();
    assert_eq!(
        recorder.take(),
        vec![
            Event::Received(Direction::Delete, "(1, 2)".to_string()),
            Event::NodeDeleted("1".to_string()),
            Event::NodeDeleted("2".to_string()),
            Event::Output(Direction::Delete, "(1, 2)".to_string(), Timestamp(4)),
            Event::Applied(1),
        ]
    );

    node.clear().unwrap();
    node.dispose();
    node.dispose();
    assert_eq!(
        recorder.take(),
        vec![
            Event::Cleared("CountingClosure"),
            Event::Disposed("CountingClosure"),
        ]
    );
}

#[test]
fn test_tracer_sees_rejected_wiring() {
    let recorder = Recorder::default();
    let mut node: ComponentNode<u32, Recorder> =
        NodeBuilder::new().tracer(recorder.clone()).build().unwrap();
    let err = node.rewire(WiringContext::recursive()).unwrap_err();
    assert_eq!(
        err,
        EngineError::RecursiveGroup {
            algorithm: "ComponentElection"
        }
    );
    assert_eq!(recorder.take(), vec![Event::Rejected("ComponentElection")]);
}

#[test]
fn test_duplicate_insert_is_silent() {
    let mut node = ClosureNode::<u32>::new(WiringContext::standalone()).unwrap();
    assert_eq!(node.apply(Delta::insert(1, 2, Timestamp(1))).unwrap().len(), 1);
    assert!(node.apply(Delta::insert(1, 2, Timestamp(2))).unwrap().is_empty());
    assert_eq!(node.graph().edge_count(), 1);
}

#[test]
fn test_delete_of_unknown_edge_is_benign() {
    let mut node = ClosureNode::<u32>::new(WiringContext::standalone()).unwrap();
    node.apply(Delta::insert(1, 2, Timestamp(1))).unwrap();
    assert!(node.apply(Delta::delete(2, 1, Timestamp(2))).unwrap().is_empty());
    assert!(node.apply(Delta::delete(7, 8, Timestamp(2))).unwrap().is_empty());
    assert_eq!(node.materialize().unwrap().len(), 1);
}

#[test]
fn test_reinitialize_closure_matches_incremental() {
    let edges = [(1u32, 2), (2, 3), (3, 1), (3, 4), (5, 6)];

    let mut incremental = ClosureNode::<u32>::new(WiringContext::standalone()).unwrap();
    incremental
        .apply_all(edges.iter().map(|&(s, t)| Delta::insert(s, t, Timestamp(1))))
        .unwrap();

    let mut bulk = ClosureNode::<u32>::new(WiringContext::standalone()).unwrap();
    bulk.apply(Delta::insert(9, 9, Timestamp(1))).unwrap();
    bulk.reinitialize_with(edges).unwrap();

    assert_eq!(
        bulk.algorithm().query().entries(),
        incremental.algorithm().query().entries()
    );
    assert_eq!(bulk.materialize().unwrap(), incremental.materialize().unwrap());
    assert!(bulk
        .materialize_timestamped()
        .unwrap()
        .values()
        .all(|t| t.moments() == [Timestamp::ZERO]));

    // Updates after a bulk rebuild continue incrementally.
    bulk.apply(Delta::delete(3, 1, Timestamp(2))).unwrap();
    Validator::check_closure(&bulk).unwrap();
    assert!(!bulk.materialize().unwrap().contains(&(1, 1)));
}

#[test]
fn test_clear_then_reuse() {
    let mut node = ComponentNode::<u32>::new(WiringContext::standalone()).unwrap();
    node.apply(Delta::insert(1, 2, Timestamp(1))).unwrap();
    node.clear().unwrap();
    assert_eq!(node.state(), NodeState::Cleared);
    assert!(node.materialize().unwrap().is_empty());

    let out = node.apply(Delta::insert(1, 2, Timestamp(1))).unwrap();
    assert_eq!(out.len(), 4);
    assert_eq!(node.state(), NodeState::Active);
    Validator::check_components(&node).unwrap();
}

#[test]
fn test_disposed_node_refuses_everything() {
    let mut node = ComponentNode::<u32>::new(WiringContext::standalone()).unwrap();
    node.dispose();
    assert_eq!(node.reinitialize_with([(1, 2)]), Err(EngineError::Disposed));
    assert_eq!(node.rewire(WiringContext::standalone()), Err(EngineError::Disposed));
    assert_eq!(node.materialize_timestamped(), Err(EngineError::Disposed));
    assert_eq!(node.state(), NodeState::Disposed);
}

#[test]
fn test_direction_from_raw_multiplicity() {
    assert_eq!(Direction::from_sign(0), Err(EngineError::InvalidDirection(0)));
    let direction = Direction::from_sign(-1).unwrap();
    let mut node = ClosureNode::<u32>::new(WiringContext::standalone()).unwrap();
    node.apply(Delta::insert(1, 2, Timestamp(1))).unwrap();
    let out = node
        .apply(Delta::new(direction, 1, 2, Timestamp(2)))
        .unwrap();
    assert_eq!(out, vec![Delta::delete(1, 2, Timestamp(2))]);
}

#[test]
fn test_inverse_stream_restores_empty_node() {
    let script = [
        Delta::insert(1u32, 2, Timestamp(1)),
        Delta::insert(2, 3, Timestamp(2)),
        Delta::insert(3, 1, Timestamp(3)),
        Delta::insert(3, 4, Timestamp(4)),
        Delta::delete(2, 3, Timestamp(5)),
        Delta::insert(4, 4, Timestamp(6)),
    ];
    let inverse: Vec<Delta<u32>> = script
        .iter()
        .rev()
        .map(|d| Delta::new(d.direction.opposite(), *d.source(), *d.target(), d.timestamp))
        .collect();

    let mut closure = ClosureNode::<u32>::new(WiringContext::standalone()).unwrap();
    let mut components = ComponentNode::<u32>::new(WiringContext::standalone()).unwrap();
    closure.apply_all(script.clone()).unwrap();
    components.apply_all(script).unwrap();
    assert!(!closure.materialize().unwrap().is_empty());

    closure.apply_all(inverse.clone()).unwrap();
    components.apply_all(inverse).unwrap();
    assert!(closure.materialize().unwrap().is_empty());
    assert!(components.materialize().unwrap().is_empty());
    assert!(closure.graph().is_empty());
    assert!(components.graph().is_empty());
}
