//! Ground-truth validation of derived relations.
//!
//! The incremental state of a node must always equal what a from-scratch
//! computation over the node's current graph produces. These checks recompute
//! that ground truth and report every difference.

use std::collections::BTreeSet;

use anyhow::{bail, ensure};

use crate::algorithm::GraphAlgorithm;
use crate::closure::{CountingClosure, TcRelation};
use crate::components::ComponentElection;
use crate::delta::Tuple;
use crate::graph::{GraphStore, NodeId};
use crate::node::{ClosureNode, ComponentNode};
use crate::tracer::Tracer;

/// A closure pair whose support count differs from the ground truth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure<N> {
    /// The pair.
    pub tuple: Tuple<N>,
    /// Count computed from scratch; zero if the pair should be absent.
    pub expected: usize,
    /// Count held by the incremental relation; zero if absent.
    pub actual: usize,
}

/// Checks incremental relations against from-scratch computation.
pub struct Validator;

impl Validator {
    /// Every pair on which `actual` disagrees with the closure of `graph`.
    pub fn closure_failures<N: NodeId>(
        graph: &GraphStore<N>,
        actual: &TcRelation<N>,
    ) -> Vec<ValidationFailure<N>> {
        let expected = TcRelation::from_graph(graph).entries();
        let actual = actual.entries();
        let keys: BTreeSet<&Tuple<N>> = expected.keys().chain(actual.keys()).collect();
        keys.into_iter()
            .filter_map(|tuple| {
                let expected = expected.get(tuple).copied().unwrap_or(0);
                let actual = actual.get(tuple).copied().unwrap_or(0);
                (expected != actual).then(|| ValidationFailure {
                    tuple: tuple.clone(),
                    expected,
                    actual,
                })
            })
            .collect()
    }

    /// Fail if the closure maintained by `node` differs from its ground truth.
    pub fn check_closure<N, T>(node: &ClosureNode<N, T>) -> anyhow::Result<()>
    where
        N: NodeId,
        T: Tracer,
    {
        Self::check_closure_of(node.graph(), node.algorithm())
    }

    /// Fail if `closure` differs from the closure of `graph`.
    pub fn check_closure_of<N: NodeId>(
        graph: &GraphStore<N>,
        closure: &CountingClosure<N>,
    ) -> anyhow::Result<()> {
        let failures = Self::closure_failures(graph, closure.query());
        if let Some(first) = failures.first() {
            bail!(
                "{} closure pair(s) differ from ground truth; first {:?}: expected count {}, got {}",
                failures.len(),
                first.tuple,
                first.expected,
                first.actual
            );
        }
        Ok(())
    }

    /// Fail if the components maintained by `node` differ from those built
    /// from scratch over its graph.
    pub fn check_components<N, T>(node: &ComponentNode<N, T>) -> anyhow::Result<()>
    where
        N: NodeId,
        T: Tracer,
    {
        Self::check_components_of(node.graph(), node.algorithm())
    }

    /// Fail if `election` differs from the components of `graph` built from
    /// scratch, representatives included, or if any representative is not a
    /// self-representing member of its own component.
    pub fn check_components_of<N: NodeId>(
        graph: &GraphStore<N>,
        election: &ComponentElection<N>,
    ) -> anyhow::Result<()> {
        for (rep, members) in election.components() {
            ensure!(
                members.contains(rep),
                "representative {rep:?} is not a member of its component {members:?}"
            );
            for member in members {
                ensure!(
                    election.representative(member) == Some(rep),
                    "{member:?} is listed under {rep:?} but maps to {:?}",
                    election.representative(member)
                );
            }
        }
        for node in graph.nodes() {
            ensure!(
                election.representative(node).is_some(),
                "graph node {node:?} has no representative"
            );
        }

        let fresh = ComponentElection::from_graph(graph);
        let (expected, actual) = (fresh.components(), election.components());
        ensure!(
            expected == actual,
            "components differ from ground truth: expected {expected:?}, got {actual:?}"
        );
        Ok(())
    }

    /// Fail if `tuples` is not exactly the tuple set of `algorithm`.
    pub fn check_materialized<A, N>(algorithm: &A, tuples: &BTreeSet<Tuple<N>>) -> anyhow::Result<()>
    where
        A: GraphAlgorithm<N>,
        N: NodeId,
    {
        let expected: BTreeSet<Tuple<N>> = algorithm.tuples().into_iter().collect();
        ensure!(
            &expected == tuples,
            "materialized tuples differ: expected {expected:?}, got {tuples:?}"
        );
        Ok(())
    }
}
