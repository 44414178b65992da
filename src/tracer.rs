//! Tracer trait for observing dataflow node activity.
//!
//! Every hook has an empty default body, so [`NoopTracer`] costs nothing and
//! custom tracers override only the events they care about. Node identifiers
//! are handed over as `&dyn Debug` so that tracers stay independent of the
//! node type.
//!
//! # Example
//!
//! ```
//! use std::fmt::Debug;
//! use relation_flow::{Direction, Timestamp, Tracer};
//!
//! struct PrintTracer;
//!
//! impl Tracer for PrintTracer {
//!     fn on_output(&self, direction: Direction, tuple: &dyn Debug, timestamp: Timestamp) {
//!         println!("{direction:?} {tuple:?} @ {}", timestamp.0);
//!     }
//! }
//! ```

use std::fmt::Debug;

use crate::delta::{Direction, Timestamp};
use crate::node::WiringContext;

/// Observer of a [`DeltaPropagationNode`](crate::DeltaPropagationNode).
///
/// Implementations must be `Send + Sync` so that nodes stay shareable through
/// [`SharedNode`](crate::SharedNode).
pub trait Tracer: Send + Sync + 'static {
    /// An input delta was accepted.
    #[inline]
    fn on_delta_received(&self, _direction: Direction, _tuple: &dyn Debug, _timestamp: Timestamp) {}

    /// A node appeared in the graph.
    #[inline]
    fn on_graph_node_inserted(&self, _node: &dyn Debug) {}

    /// An isolated node was dropped from the graph.
    #[inline]
    fn on_graph_node_deleted(&self, _node: &dyn Debug) {}

    /// A derived tuple is being emitted downstream.
    #[inline]
    fn on_output(&self, _direction: Direction, _tuple: &dyn Debug, _timestamp: Timestamp) {}

    /// An input delta was fully processed.
    #[inline]
    fn on_delta_applied(&self, _outputs: usize) {}

    /// The node was rebuilt from a bulk edge set.
    #[inline]
    fn on_reinitialized(&self, _algorithm: &'static str, _edges: usize) {}

    /// The node was reset to empty.
    #[inline]
    fn on_cleared(&self, _algorithm: &'static str) {}

    /// The node was torn down.
    #[inline]
    fn on_disposed(&self, _algorithm: &'static str) {}

    /// A placement was refused because the algorithm cannot revise timestamps.
    #[inline]
    fn on_wiring_rejected(&self, _algorithm: &'static str, _wiring: WiringContext) {}
}

/// Tracer that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTracer;

impl Tracer for NoopTracer {}

/// Tracer forwarding events to the `tracing` crate.
#[cfg(feature = "tracing")]
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingTracer;

#[cfg(feature = "tracing")]
impl Tracer for TracingTracer {
    fn on_delta_received(&self, direction: Direction, tuple: &dyn Debug, timestamp: Timestamp) {
        tracing::debug!(?direction, ?tuple, timestamp = timestamp.0, "delta received");
    }

    fn on_graph_node_inserted(&self, node: &dyn Debug) {
        tracing::trace!(?node, "graph node inserted");
    }

    fn on_graph_node_deleted(&self, node: &dyn Debug) {
        tracing::trace!(?node, "graph node deleted");
    }

    fn on_output(&self, direction: Direction, tuple: &dyn Debug, timestamp: Timestamp) {
        tracing::trace!(?direction, ?tuple, timestamp = timestamp.0, "output");
    }

    fn on_delta_applied(&self, outputs: usize) {
        tracing::debug!(outputs, "delta applied");
    }

    fn on_reinitialized(&self, algorithm: &'static str, edges: usize) {
        tracing::debug!(algorithm, edges, "reinitialized");
    }

    fn on_cleared(&self, algorithm: &'static str) {
        tracing::debug!(algorithm, "cleared");
    }

    fn on_disposed(&self, algorithm: &'static str) {
        tracing::debug!(algorithm, "disposed");
    }

    fn on_wiring_rejected(&self, algorithm: &'static str, wiring: WiringContext) {
        tracing::warn!(algorithm, ?wiring, "placement in recursive group rejected");
    }
}
