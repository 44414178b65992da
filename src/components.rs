//! Weakly connected components with one elected representative each.
//!
//! Every component is represented by its smallest member. Incremental
//! updates keep that invariant, so replaying edges one by one and building
//! from scratch elect the same representatives:
//! - a new node represents itself;
//! - on a merge, the smaller of the two representatives wins;
//! - on a split, the part holding the old representative keeps it and the
//!   other part elects its smallest member.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use ahash::HashSet;

use crate::algorithm::{Change, GraphAlgorithm};
use crate::delta::Tuple;
use crate::graph::{GraphStore, NodeId};

/// Incrementally maintained weakly-connected-component partition.
///
/// Output tuples are `(node, representative)`. A node whose representative
/// changes is reported as a deletion of the old tuple followed by an insertion
/// of the new one.
#[derive(Debug, Clone)]
pub struct ComponentElection<N> {
    representatives: BTreeMap<N, N>,
    components: BTreeMap<N, BTreeSet<N>>,
}

impl<N> Default for ComponentElection<N> {
    fn default() -> Self {
        Self {
            representatives: BTreeMap::new(),
            components: BTreeMap::new(),
        }
    }
}

impl<N: NodeId> ComponentElection<N> {
    /// An algorithm over an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Representative of every component, mapped to the component's members.
    pub fn components(&self) -> &BTreeMap<N, BTreeSet<N>> {
        &self.components
    }

    /// The representative of `node`, if the node is known.
    pub fn representative(&self, node: &N) -> Option<&N> {
        self.representatives.get(node)
    }

    /// Members of the component containing `node`.
    pub fn component_of(&self, node: &N) -> Option<&BTreeSet<N>> {
        self.representatives
            .get(node)
            .and_then(|rep| self.components.get(rep))
    }

    /// Number of components.
    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    /// Discard all state and rebuild the partition from `edges` in one pass.
    pub fn reinitialize<I>(&mut self, edges: I)
    where
        I: IntoIterator<Item = (N, N)>,
    {
        *self = Self::from_graph(&GraphStore::from_edges(edges));
    }

    fn ensure_node(&mut self, node: &N, out: &mut Vec<Change<N>>) {
        if self.representatives.contains_key(node) {
            return;
        }
        self.representatives.insert(node.clone(), node.clone());
        self.components
            .insert(node.clone(), BTreeSet::from([node.clone()]));
        out.push(Change::insert(node.clone(), node.clone()));
    }

    /// Move every member of `members` from `from` to `to`, reporting each move.
    fn reassign(&mut self, members: &BTreeSet<N>, from: &N, to: &N, out: &mut Vec<Change<N>>) {
        for member in members {
            self.representatives.insert(member.clone(), to.clone());
            out.push(Change::delete(member.clone(), from.clone()));
            out.push(Change::insert(member.clone(), to.clone()));
        }
    }
}

impl<N: NodeId> GraphAlgorithm<N> for ComponentElection<N> {
    const NAME: &'static str = "ComponentElection";
    const TIMELY: bool = false;

    fn from_graph(graph: &GraphStore<N>) -> Self {
        let mut election = Self::new();
        let mut nodes: Vec<&N> = graph.nodes().collect();
        nodes.sort();
        for start in nodes {
            if election.representatives.contains_key(start) {
                continue;
            }
            let members = collect_component(graph, start);
            // Nodes are visited in ascending order, so `start` is the smallest member.
            for member in &members {
                election
                    .representatives
                    .insert(member.clone(), start.clone());
            }
            election.components.insert(start.clone(), members);
        }
        election
    }

    fn node_inserted(&mut self, _: &GraphStore<N>, node: &N, out: &mut Vec<Change<N>>) {
        self.ensure_node(node, out);
    }

    fn node_deleted(&mut self, _: &GraphStore<N>, node: &N, out: &mut Vec<Change<N>>) {
        let Some(rep) = self.representatives.remove(node) else {
            return;
        };
        if let Some(members) = self.components.get_mut(&rep) {
            members.remove(node);
            if members.is_empty() {
                self.components.remove(&rep);
            }
        }
        out.push(Change::delete(node.clone(), rep));
    }

    fn edge_inserted(
        &mut self,
        _: &GraphStore<N>,
        source: &N,
        target: &N,
        out: &mut Vec<Change<N>>,
    ) {
        self.ensure_node(source, out);
        self.ensure_node(target, out);
        let source_rep = self.representatives[source].clone();
        let target_rep = self.representatives[target].clone();
        if source_rep == target_rep {
            return;
        }

        let (winner, loser) = if source_rep < target_rep {
            (source_rep, target_rep)
        } else {
            (target_rep, source_rep)
        };
        let mut absorbed = self.components.remove(&loser).unwrap_or_default();
        self.reassign(&absorbed, &loser, &winner, out);
        let mut members = self.components.remove(&winner).unwrap_or_default();
        // Fold the smaller set into the larger one.
        if members.len() < absorbed.len() {
            std::mem::swap(&mut members, &mut absorbed);
        }
        members.extend(absorbed);
        self.components.insert(winner, members);
    }

    fn edge_deleted(
        &mut self,
        graph: &GraphStore<N>,
        source: &N,
        target: &N,
        out: &mut Vec<Change<N>>,
    ) {
        if source == target {
            return;
        }
        let Some(rep) = self.representatives.get(source).cloned() else {
            return;
        };
        let Some(split) = split_off(graph, source, target) else {
            return;
        };

        let Some(mut remaining) = self.components.remove(&rep) else {
            return;
        };
        remaining.retain(|member| !split.contains(member));
        let (kept, moved) = if split.contains(&rep) {
            (split, remaining)
        } else {
            (remaining, split)
        };
        let Some(elected) = moved.first().cloned() else {
            self.components.insert(rep, kept);
            return;
        };
        self.reassign(&moved, &rep, &elected, out);
        self.components.insert(rep, kept);
        self.components.insert(elected, moved);
    }

    fn tuples(&self) -> Vec<Tuple<N>> {
        self.components
            .iter()
            .flat_map(|(rep, members)| members.iter().map(move |m| (m.clone(), rep.clone())))
            .collect()
    }

    fn dispose(&mut self) {
        self.representatives.clear();
        self.components.clear();
    }
}

/// Every node weakly connected to `start`.
fn collect_component<N: NodeId>(graph: &GraphStore<N>, start: &N) -> BTreeSet<N> {
    let mut members = BTreeSet::from([start.clone()]);
    let mut queue = VecDeque::from([start]);
    while let Some(node) = queue.pop_front() {
        for next in graph.undirected_neighbors(node) {
            if members.insert(next.clone()) {
                queue.push_back(next);
            }
        }
    }
    members
}

/// Breadth-first search state for one side of a split check.
struct Frontier<N> {
    seen: HashSet<N>,
    queue: VecDeque<N>,
}

enum Expansion {
    Continue,
    Met,
    Exhausted,
}

impl<N: NodeId> Frontier<N> {
    fn new(start: &N) -> Self {
        let mut seen = HashSet::default();
        seen.insert(start.clone());
        Self {
            seen,
            queue: VecDeque::from([start.clone()]),
        }
    }

    fn expand(&mut self, graph: &GraphStore<N>, other: &Frontier<N>) -> Expansion {
        let Some(node) = self.queue.pop_front() else {
            return Expansion::Exhausted;
        };
        for next in graph.undirected_neighbors(&node) {
            if other.seen.contains(next) {
                return Expansion::Met;
            }
            if self.seen.insert(next.clone()) {
                self.queue.push_back(next.clone());
            }
        }
        Expansion::Continue
    }
}

/// After removing the edge between `a` and `b`, find the part of their old
/// component that is no longer connected to the rest.
///
/// Searches from both endpoints in lock step and stops as soon as either the
/// two searches meet (still connected, `None`) or one of them runs out of
/// nodes. The exhausted side is the smaller part, so the cost is bounded by
/// the size of the smaller part rather than the whole component.
fn split_off<N: NodeId>(graph: &GraphStore<N>, a: &N, b: &N) -> Option<BTreeSet<N>> {
    let mut side_a = Frontier::new(a);
    let mut side_b = Frontier::new(b);
    loop {
        match side_a.expand(graph, &side_b) {
            Expansion::Met => return None,
            Expansion::Exhausted => return Some(side_a.seen.into_iter().collect()),
            Expansion::Continue => {}
        }
        match side_b.expand(graph, &side_a) {
            Expansion::Met => return None,
            Expansion::Exhausted => return Some(side_b.seen.into_iter().collect()),
            Expansion::Continue => {}
        }
    }
}
