#![deny(missing_docs)]
#![doc = include_str!("../README.md")]

mod algorithm;
mod closure;
mod components;
mod delta;
mod error;
mod graph;
mod node;
#[cfg(feature = "concurrent")]
mod shared;
pub mod tracer;
mod validator;

pub use algorithm::{Change, GraphAlgorithm};
pub use closure::{CountingClosure, TcRelation};
pub use components::ComponentElection;
pub use delta::{Delta, Direction, Timeline, Timestamp, Tuple};
pub use error::{EdgeEnd, EngineError, Result};
pub use graph::{GraphStore, NodeId};
pub use node::{ClosureNode, ComponentNode, DeltaPropagationNode, NodeBuilder, NodeState, WiringContext};
#[cfg(feature = "concurrent")]
pub use shared::SharedNode;
pub use tracer::{NoopTracer, Tracer};
#[cfg(feature = "tracing")]
pub use tracer::TracingTracer;
pub use validator::{ValidationFailure, Validator};
