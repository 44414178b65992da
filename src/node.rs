//! Dataflow node driving a [`GraphStore`] and a [`GraphAlgorithm`] from an
//! upstream edge-delta stream.

use std::collections::{BTreeMap, BTreeSet};

use ahash::HashMap;

use crate::algorithm::{Change, GraphAlgorithm};
use crate::closure::CountingClosure;
use crate::components::ComponentElection;
use crate::delta::{Delta, Direction, Timeline, Timestamp, Tuple};
use crate::error::{EngineError, Result};
use crate::graph::{GraphStore, NodeId};
use crate::tracer::{NoopTracer, Tracer};

/// Lifecycle of a [`DeltaPropagationNode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeState {
    /// Accepting deltas.
    Active,
    /// Reset to empty by [`DeltaPropagationNode::clear`]; becomes active again on the next update.
    Cleared,
    /// Torn down by the owning network. Terminal.
    Disposed,
}

/// Where a node sits in the surrounding dataflow network.
///
/// Supplied by the network when the node is built, and again whenever the
/// network structure changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct WiringContext {
    /// The network evaluates with timestamp-aware (differential) semantics.
    pub timely_evaluation: bool,
    /// The node is part of a cyclic region requiring fixpoint evaluation.
    pub in_recursive_group: bool,
}

impl WiringContext {
    /// A node outside any recursive group.
    pub fn standalone() -> Self {
        Self::default()
    }

    /// A node inside a recursive group of a timely network.
    pub fn recursive() -> Self {
        Self {
            timely_evaluation: true,
            in_recursive_group: true,
        }
    }

    fn requires_timestamp_revision(&self) -> bool {
        self.timely_evaluation && self.in_recursive_group
    }
}

/// Node maintaining the transitive closure of its input relation.
pub type ClosureNode<N, T = NoopTracer> = DeltaPropagationNode<CountingClosure<N>, N, T>;

/// Node maintaining `(node, representative)` tuples of weakly connected components.
pub type ComponentNode<N, T = NoopTracer> = DeltaPropagationNode<ComponentElection<N>, N, T>;

/// Builder for [`DeltaPropagationNode`].
///
/// # Example
///
/// ```
/// use relation_flow::{ComponentNode, EngineError, NodeBuilder, WiringContext};
///
/// let result: Result<ComponentNode<u32>, _> = NodeBuilder::new()
///     .wiring(WiringContext::recursive())
///     .build();
/// assert!(matches!(result, Err(EngineError::RecursiveGroup { .. })));
/// ```
#[derive(Debug, Clone, Default)]
pub struct NodeBuilder<T = NoopTracer> {
    tracer: T,
    wiring: WiringContext,
}

impl NodeBuilder<NoopTracer> {
    /// A builder with no tracer and a standalone placement.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<T: Tracer> NodeBuilder<T> {
    /// Observe the node with `tracer`.
    pub fn tracer<U: Tracer>(self, tracer: U) -> NodeBuilder<U> {
        NodeBuilder {
            tracer,
            wiring: self.wiring,
        }
    }

    /// Place the node according to `wiring`.
    pub fn wiring(mut self, wiring: WiringContext) -> Self {
        self.wiring = wiring;
        self
    }

    /// Build an empty node, refusing placements the algorithm cannot support.
    pub fn build<A, N>(self) -> Result<DeltaPropagationNode<A, N, T>>
    where
        A: GraphAlgorithm<N>,
        N: NodeId,
    {
        check_wiring::<A, N, T>(&self.wiring, &self.tracer)?;
        let graph = GraphStore::new();
        let algorithm = A::from_graph(&graph);
        Ok(DeltaPropagationNode {
            graph,
            algorithm,
            state: NodeState::Active,
            wiring: self.wiring,
            tracer: self.tracer,
            valid_since: HashMap::default(),
        })
    }
}

fn check_wiring<A, N, T>(wiring: &WiringContext, tracer: &T) -> Result<()>
where
    A: GraphAlgorithm<N>,
    N: NodeId,
    T: Tracer,
{
    if wiring.requires_timestamp_revision() && !A::TIMELY {
        tracer.on_wiring_rejected(A::NAME, *wiring);
        return Err(EngineError::RecursiveGroup { algorithm: A::NAME });
    }
    Ok(())
}

/// Push-based dataflow node wrapping one incremental graph algorithm.
///
/// Consumes deltas over an edge relation, keeps its own [`GraphStore`] in
/// sync (nodes appear with their first edge and disappear once isolated), and
/// returns the deltas the algorithm produced over the derived relation. Each
/// call to [`apply`](Self::apply) runs to completion before returning, and the
/// node owns all of its state.
pub struct DeltaPropagationNode<A, N, T = NoopTracer> {
    graph: GraphStore<N>,
    algorithm: A,
    state: NodeState,
    wiring: WiringContext,
    tracer: T,
    /// Start of validity of every derived tuple. Only maintained for timely algorithms.
    valid_since: HashMap<Tuple<N>, Timestamp>,
}

impl<A, N> DeltaPropagationNode<A, N, NoopTracer>
where
    A: GraphAlgorithm<N>,
    N: NodeId,
{
    /// An empty node placed according to `wiring`.
    pub fn new(wiring: WiringContext) -> Result<Self> {
        NodeBuilder::new().wiring(wiring).build()
    }
}

impl<A, N, T> DeltaPropagationNode<A, N, T>
where
    A: GraphAlgorithm<N>,
    N: NodeId,
    T: Tracer,
{
    /// Current lifecycle state.
    pub fn state(&self) -> NodeState {
        self.state
    }

    /// The node's copy of the input relation.
    pub fn graph(&self) -> &GraphStore<N> {
        &self.graph
    }

    /// The wrapped algorithm.
    pub fn algorithm(&self) -> &A {
        &self.algorithm
    }

    /// The current placement.
    pub fn wiring(&self) -> WiringContext {
        self.wiring
    }

    /// The tracer.
    pub fn tracer(&self) -> &T {
        &self.tracer
    }

    /// React to a change of the network structure.
    ///
    /// Fails without changing the placement if the algorithm cannot be used
    /// in the new position.
    pub fn rewire(&mut self, wiring: WiringContext) -> Result<()> {
        self.ensure_not_disposed()?;
        check_wiring::<A, N, T>(&wiring, &self.tracer)?;
        self.wiring = wiring;
        Ok(())
    }

    /// Apply one upstream delta and return the resulting downstream deltas.
    pub fn apply(&mut self, delta: Delta<N>) -> Result<Vec<Delta<N>>> {
        self.ensure_not_disposed()?;
        let Delta {
            direction,
            tuple: (source, target),
            timestamp,
        } = delta;
        self.tracer
            .on_delta_received(direction, &(&source, &target), timestamp);

        let mut changes = Vec::new();
        match direction {
            Direction::Insert => self.insert_edge(source, target, &mut changes)?,
            Direction::Delete => self.delete_edge(&source, &target, &mut changes)?,
        }
        self.state = NodeState::Active;

        let stamp = if A::TIMELY { timestamp } else { Timestamp::ZERO };
        let outputs: Vec<Delta<N>> = changes
            .into_iter()
            .map(|change| self.emit(change, stamp))
            .collect();
        self.tracer.on_delta_applied(outputs.len());
        Ok(outputs)
    }

    /// Apply deltas in order and concatenate their outputs.
    pub fn apply_all<I>(&mut self, deltas: I) -> Result<Vec<Delta<N>>>
    where
        I: IntoIterator<Item = Delta<N>>,
    {
        let mut outputs = Vec::new();
        for delta in deltas {
            outputs.extend(self.apply(delta)?);
        }
        Ok(outputs)
    }

    /// Replace the whole input relation with `tuples`.
    ///
    /// The algorithm is rebuilt from the new graph in one pass instead of
    /// replaying every edge. No deltas are produced.
    pub fn reinitialize_with<I>(&mut self, tuples: I) -> Result<()>
    where
        I: IntoIterator<Item = Tuple<N>>,
    {
        self.ensure_not_disposed()?;
        self.algorithm.dispose();
        self.graph = GraphStore::from_edges(tuples);
        self.algorithm = A::from_graph(&self.graph);
        self.reset_timelines();
        self.state = NodeState::Active;
        self.tracer
            .on_reinitialized(A::NAME, self.graph.edge_count());
        Ok(())
    }

    /// Reset graph and algorithm to empty. The node stays usable.
    pub fn clear(&mut self) -> Result<()> {
        self.ensure_not_disposed()?;
        self.algorithm.dispose();
        self.graph = GraphStore::new();
        self.algorithm = A::from_graph(&self.graph);
        self.valid_since.clear();
        self.state = NodeState::Cleared;
        self.tracer.on_cleared(A::NAME);
        Ok(())
    }

    /// Tear the node down. Every later operation fails with [`EngineError::Disposed`].
    pub fn dispose(&mut self) {
        if self.state == NodeState::Disposed {
            return;
        }
        self.algorithm.dispose();
        self.graph = GraphStore::new();
        self.valid_since.clear();
        self.state = NodeState::Disposed;
        self.tracer.on_disposed(A::NAME);
    }

    /// Every currently derived tuple, once.
    pub fn materialize(&self) -> Result<BTreeSet<Tuple<N>>> {
        self.ensure_not_disposed()?;
        Ok(self.algorithm.tuples().into_iter().collect())
    }

    /// Every currently derived tuple with its validity timeline.
    ///
    /// Algorithms without timestamp support report every tuple as valid from
    /// [`Timestamp::ZERO`]; such nodes are never placed in recursive groups, so
    /// no consumer can observe the difference.
    pub fn materialize_timestamped(&self) -> Result<BTreeMap<Tuple<N>, Timeline>> {
        self.ensure_not_disposed()?;
        Ok(self
            .algorithm
            .tuples()
            .into_iter()
            .map(|tuple| {
                let timeline = match self.valid_since.get(&tuple) {
                    Some(&since) => Timeline::since(since),
                    None => Timeline::from_beginning(),
                };
                (tuple, timeline)
            })
            .collect())
    }

    fn ensure_not_disposed(&self) -> Result<()> {
        if self.state == NodeState::Disposed {
            return Err(EngineError::Disposed);
        }
        Ok(())
    }

    fn insert_edge(&mut self, source: N, target: N, changes: &mut Vec<Change<N>>) -> Result<()> {
        self.insert_node(&source, changes);
        self.insert_node(&target, changes);
        if self.graph.insert_edge(&source, &target)? {
            self.algorithm
                .edge_inserted(&self.graph, &source, &target, changes);
        }
        Ok(())
    }

    fn insert_node(&mut self, node: &N, changes: &mut Vec<Change<N>>) {
        if self.graph.insert_node(node.clone()) {
            self.tracer.on_graph_node_inserted(node);
            self.algorithm.node_inserted(&self.graph, node, changes);
        }
    }

    fn delete_edge(&mut self, source: &N, target: &N, changes: &mut Vec<Change<N>>) -> Result<()> {
        if self.graph.delete_edge_if_exists(source, target) {
            self.algorithm
                .edge_deleted(&self.graph, source, target, changes);
        }
        self.delete_node_if_isolated(source, changes)?;
        if source != target {
            self.delete_node_if_isolated(target, changes)?;
        }
        Ok(())
    }

    fn delete_node_if_isolated(&mut self, node: &N, changes: &mut Vec<Change<N>>) -> Result<()> {
        if !self.graph.contains_node(node) || !self.graph.is_isolated(node) {
            return Ok(());
        }
        self.graph.delete_node(node)?;
        self.tracer.on_graph_node_deleted(node);
        self.algorithm.node_deleted(&self.graph, node, changes);
        Ok(())
    }

    fn emit(&mut self, change: Change<N>, timestamp: Timestamp) -> Delta<N> {
        if A::TIMELY {
            match change.direction {
                Direction::Insert => {
                    self.valid_since.insert(change.tuple.clone(), timestamp);
                }
                Direction::Delete => {
                    self.valid_since.remove(&change.tuple);
                }
            }
        }
        self.tracer
            .on_output(change.direction, &change.tuple, timestamp);
        Delta {
            direction: change.direction,
            tuple: change.tuple,
            timestamp,
        }
    }

    fn reset_timelines(&mut self) {
        self.valid_since.clear();
        if A::TIMELY {
            for tuple in self.algorithm.tuples() {
                self.valid_since.insert(tuple, Timestamp::ZERO);
            }
        }
    }
}

impl<A, N, T> std::fmt::Debug for DeltaPropagationNode<A, N, T>
where
    A: GraphAlgorithm<N>,
    N: NodeId,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeltaPropagationNode")
            .field("algorithm", &A::NAME)
            .field("state", &self.state)
            .field("wiring", &self.wiring)
            .field("nodes", &self.graph.node_count())
            .field("edges", &self.graph.edge_count())
            .finish()
    }
}
