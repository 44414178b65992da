//! The capability set shared by the incremental graph algorithms.

use crate::delta::{Direction, Tuple};
use crate::graph::{GraphStore, NodeId};

/// A change to an algorithm's derived relation, before it is timestamped.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Change<N> {
    /// The derived tuple.
    pub tuple: Tuple<N>,
    /// Whether it appeared or disappeared.
    pub direction: Direction,
}

impl<N> Change<N> {
    /// A tuple that appeared.
    pub fn insert(first: N, second: N) -> Self {
        Self {
            tuple: (first, second),
            direction: Direction::Insert,
        }
    }

    /// A tuple that disappeared.
    pub fn delete(first: N, second: N) -> Self {
        Self {
            tuple: (first, second),
            direction: Direction::Delete,
        }
    }
}

/// An incrementally maintained relation derived from a [`GraphStore`].
///
/// The owner mutates the graph first and then reports the mutation, so every
/// hook sees the graph *after* the change. Hooks append the changes they cause
/// to `out` instead of calling back into listeners.
pub trait GraphAlgorithm<N: NodeId>: Sized {
    /// Name used in diagnostics.
    const NAME: &'static str;

    /// Whether output changes may carry the timestamp of the delta that caused
    /// them. Algorithms without this capability must stay out of recursive
    /// groups.
    const TIMELY: bool;

    /// Build the derived relation for an existing graph in one pass.
    fn from_graph(graph: &GraphStore<N>) -> Self;

    /// A node was added to the graph.
    fn node_inserted(&mut self, graph: &GraphStore<N>, node: &N, out: &mut Vec<Change<N>>);

    /// An isolated node was removed from the graph.
    fn node_deleted(&mut self, graph: &GraphStore<N>, node: &N, out: &mut Vec<Change<N>>);

    /// A new edge was added to the graph.
    fn edge_inserted(
        &mut self,
        graph: &GraphStore<N>,
        source: &N,
        target: &N,
        out: &mut Vec<Change<N>>,
    );

    /// An existing edge was removed from the graph.
    fn edge_deleted(
        &mut self,
        graph: &GraphStore<N>,
        source: &N,
        target: &N,
        out: &mut Vec<Change<N>>,
    );

    /// Every tuple currently in the derived relation, once.
    fn tuples(&self) -> Vec<Tuple<N>>;

    /// Release internal indices. The algorithm is empty afterwards.
    fn dispose(&mut self);
}
