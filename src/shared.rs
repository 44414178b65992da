//! Shareable handle serializing access to a node.

use std::collections::BTreeSet;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::algorithm::GraphAlgorithm;
use crate::delta::{Delta, Tuple};
use crate::error::Result;
use crate::graph::NodeId;
use crate::node::DeltaPropagationNode;
use crate::tracer::{NoopTracer, Tracer};

/// A [`DeltaPropagationNode`] behind a mutex.
///
/// Cheap to clone. Deltas delivered through any clone are applied one at a
/// time, each to completion, in the order the lock is acquired.
pub struct SharedNode<A, N, T = NoopTracer> {
    inner: Arc<Mutex<DeltaPropagationNode<A, N, T>>>,
}

impl<A, N, T> Clone for SharedNode<A, N, T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<A, N, T> SharedNode<A, N, T>
where
    A: GraphAlgorithm<N>,
    N: NodeId,
    T: Tracer,
{
    /// Wrap a node.
    pub fn new(node: DeltaPropagationNode<A, N, T>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(node)),
        }
    }

    /// See [`DeltaPropagationNode::apply`].
    pub fn apply(&self, delta: Delta<N>) -> Result<Vec<Delta<N>>> {
        self.inner.lock().apply(delta)
    }

    /// See [`DeltaPropagationNode::materialize`].
    pub fn materialize(&self) -> Result<BTreeSet<Tuple<N>>> {
        self.inner.lock().materialize()
    }

    /// Lock the node for a sequence of operations.
    pub fn lock(&self) -> MutexGuard<'_, DeltaPropagationNode<A, N, T>> {
        self.inner.lock()
    }
}
