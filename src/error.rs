//! Error types for graph and dataflow node operations.

/// Errors surfaced by the engine.
///
/// Every variant other than [`EngineError::RecursiveGroup`] is a contract
/// violation: the caller wired or drove the engine incorrectly. They are
/// detected before any state is touched, so the graph and the derived relation
/// stay consistent with each other after a rejected operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// An edge referenced a node that is not in the graph.
    #[error("cannot insert edge {source_repr} -> {target_repr}: {role} node is not in the graph")]
    MissingNode {
        /// Which endpoint was absent.
        role: EdgeEnd,
        /// Debug representation of the edge source.
        source_repr: String,
        /// Debug representation of the edge target.
        target_repr: String,
    },

    /// A node was deleted while it still had incident edges.
    #[error("cannot delete node {node}: it still has {incoming} incoming and {outgoing} outgoing edges")]
    NodeNotIsolated {
        /// Debug representation of the node.
        node: String,
        /// Number of incoming edges left.
        incoming: usize,
        /// Number of outgoing edges left.
        outgoing: usize,
    },

    /// A raw multiplicity did not name a direction.
    #[error("invalid delta direction: multiplicity {0} is neither an insertion nor a deletion")]
    InvalidDirection(i64),

    /// A node without timestamp revision support was placed in a recursive group.
    #[error("{algorithm} cannot be used in recursive differential dataflow evaluation")]
    RecursiveGroup {
        /// Name of the offending algorithm.
        algorithm: &'static str,
    },

    /// The node has been torn down by its network.
    #[error("node has been disposed")]
    Disposed,
}

/// Endpoint of an edge, used for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeEnd {
    /// The edge source.
    Source,
    /// The edge target.
    Target,
}

impl std::fmt::Display for EdgeEnd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EdgeEnd::Source => f.write_str("source"),
            EdgeEnd::Target => f.write_str("target"),
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T, E = EngineError> = std::result::Result<T, E>;
