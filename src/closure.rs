//! Transitive closure maintained with per-pair support counts.
//!
//! The support count of a reachable pair `(x, y)` is the number of outgoing
//! edges `x -> w` such that `w == y` or `w` reaches `y`. Counts are a function
//! of the current graph alone, so the incrementally maintained relation and one
//! built with [`TcRelation::from_graph`] compare equal entry by entry.

use std::collections::{BTreeMap, VecDeque};

use ahash::{HashMap, HashSet};

use crate::algorithm::{Change, GraphAlgorithm};
use crate::delta::Tuple;
use crate::graph::{GraphStore, NodeId};

/// Reachable pairs with their support counts.
///
/// Indexed both by source and by target so that ancestors and descendants of a
/// node can be enumerated without scanning the whole relation.
#[derive(Debug, Clone)]
pub struct TcRelation<N> {
    forward: HashMap<N, HashMap<N, usize>>,
    backward: HashMap<N, HashSet<N>>,
    len: usize,
}

impl<N> Default for TcRelation<N> {
    fn default() -> Self {
        Self {
            forward: HashMap::default(),
            backward: HashMap::default(),
            len: 0,
        }
    }
}

impl<N: NodeId> TcRelation<N> {
    /// Create an empty relation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute the closure of `graph` directly, by a search from every node.
    ///
    /// This is the ground truth the incremental algorithm is checked against.
    pub fn from_graph(graph: &GraphStore<N>) -> Self {
        let reach: HashMap<&N, HashSet<&N>> = graph
            .nodes()
            .map(|node| (node, reachable_from(graph, node)))
            .collect();

        let mut relation = Self::new();
        for (&x, targets) in &reach {
            for &y in targets {
                let count = graph
                    .out_neighbors(x)
                    .filter(|w| *w == y || reach[w].contains(y))
                    .count();
                relation.add_support(x.clone(), y.clone(), count);
            }
        }
        relation
    }

    /// Number of reachable pairs.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if nothing is reachable.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Support count of `(from, to)`; zero when `to` is not reachable.
    pub fn count(&self, from: &N, to: &N) -> usize {
        self.forward
            .get(from)
            .and_then(|targets| targets.get(to))
            .copied()
            .unwrap_or(0)
    }

    /// Returns true if `to` is reachable from `from`.
    pub fn contains(&self, from: &N, to: &N) -> bool {
        self.count(from, to) > 0
    }

    /// Nodes reachable from `from`.
    pub fn targets<'a>(&'a self, from: &N) -> impl Iterator<Item = &'a N> + 'a {
        self.forward.get(from).into_iter().flat_map(|t| t.keys())
    }

    /// Nodes that reach `to`.
    pub fn sources<'a>(&'a self, to: &N) -> impl Iterator<Item = &'a N> + 'a {
        self.backward.get(to).into_iter().flatten()
    }

    /// Iterate over `((from, to), count)`.
    pub fn pairs(&self) -> impl Iterator<Item = ((&N, &N), usize)> + '_ {
        self.forward.iter().flat_map(|(from, targets)| {
            targets.iter().map(move |(to, &count)| ((from, to), count))
        })
    }

    /// Ordered copy of the relation, convenient for assertions and display.
    pub fn entries(&self) -> BTreeMap<Tuple<N>, usize> {
        self.pairs()
            .map(|((from, to), count)| ((from.clone(), to.clone()), count))
            .collect()
    }

    /// Add `amount` units of support. Returns true if the pair is new.
    fn add_support(&mut self, from: N, to: N, amount: usize) -> bool {
        if amount == 0 {
            return false;
        }
        let targets = self.forward.entry(from.clone()).or_default();
        if let Some(count) = targets.get_mut(&to) {
            *count += amount;
            return false;
        }
        targets.insert(to.clone(), amount);
        self.backward.entry(to).or_default().insert(from);
        self.len += 1;
        true
    }

    /// Withdraw one unit of support. Returns true if the pair disappeared.
    fn withdraw_support(&mut self, from: &N, to: &N) -> bool {
        let Some(count) = self.forward.get_mut(from).and_then(|t| t.get_mut(to)) else {
            debug_assert!(false, "withdrawing support from absent pair {from:?} -> {to:?}");
            return false;
        };
        *count -= 1;
        if *count > 0 {
            return false;
        }
        self.remove(from, to);
        true
    }

    /// Overwrite the count of an existing pair. A zero count removes it.
    fn set_count(&mut self, from: &N, to: &N, count: usize) {
        if count == 0 {
            self.remove(from, to);
        } else if let Some(slot) = self.forward.get_mut(from).and_then(|t| t.get_mut(to)) {
            *slot = count;
        }
    }

    fn remove(&mut self, from: &N, to: &N) -> Option<usize> {
        let targets = self.forward.get_mut(from)?;
        let count = targets.remove(to)?;
        if targets.is_empty() {
            self.forward.remove(from);
        }
        if let Some(sources) = self.backward.get_mut(to) {
            sources.remove(from);
            if sources.is_empty() {
                self.backward.remove(to);
            }
        }
        self.len -= 1;
        Some(count)
    }

    /// `node` together with everything that reaches it.
    fn ancestors_inclusive(&self, node: &N) -> Vec<N> {
        let mut nodes: Vec<N> = self.sources(node).cloned().collect();
        if !self.contains(node, node) {
            nodes.push(node.clone());
        }
        nodes
    }

    /// `node` together with everything it reaches.
    fn descendants_inclusive(&self, node: &N) -> Vec<N> {
        let mut nodes: Vec<N> = self.targets(node).cloned().collect();
        if !self.contains(node, node) {
            nodes.push(node.clone());
        }
        nodes
    }
}

impl<N: NodeId> PartialEq for TcRelation<N> {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len
            && self
                .pairs()
                .all(|((from, to), count)| other.count(from, to) == count)
    }
}

impl<N: NodeId> Eq for TcRelation<N> {}

/// Nodes reachable from `start` by one or more edges.
fn reachable_from<'a, N: NodeId>(graph: &'a GraphStore<N>, start: &N) -> HashSet<&'a N> {
    let mut seen: HashSet<&N> = HashSet::default();
    let mut stack: Vec<&N> = graph.out_neighbors(start).collect();
    while let Some(node) = stack.pop() {
        if seen.insert(node) {
            stack.extend(graph.out_neighbors(node));
        }
    }
    seen
}

/// Incrementally maintained transitive closure.
///
/// Insertions add one unit of support to every pair justified through the new
/// edge. Deletions withdraw that support and cascade through pairs whose count
/// reaches zero. Counting alone cannot retract a pair that supports itself
/// around a cycle, so when an ancestor of the deleted edge lies on a cycle the
/// affected pairs are over-deleted and re-derived instead.
#[derive(Debug, Clone)]
pub struct CountingClosure<N> {
    relation: TcRelation<N>,
}

impl<N> Default for CountingClosure<N> {
    fn default() -> Self {
        Self {
            relation: TcRelation::default(),
        }
    }
}

impl<N: NodeId> CountingClosure<N> {
    /// An algorithm over an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// The current relation.
    pub fn query(&self) -> &TcRelation<N> {
        &self.relation
    }

    fn withdraw_cascading(
        &mut self,
        graph: &GraphStore<N>,
        source: &N,
        descendants: &[N],
        out: &mut Vec<Change<N>>,
    ) {
        let mut removed: VecDeque<Tuple<N>> = VecDeque::new();
        for to in descendants {
            if self.relation.withdraw_support(source, to) {
                removed.push_back((source.clone(), to.clone()));
            }
        }
        while let Some((via, to)) = removed.pop_front() {
            // A node is its own justification for `w == y`, so losing (y, y) costs nothing upstream.
            if via != to {
                for from in graph.in_neighbors(&via) {
                    if self.relation.withdraw_support(from, &to) {
                        removed.push_back((from.clone(), to.clone()));
                    }
                }
            }
            out.push(Change::delete(via, to));
        }
    }

    fn rederive(
        &mut self,
        graph: &GraphStore<N>,
        ancestors: &[N],
        descendants: &[N],
        out: &mut Vec<Change<N>>,
    ) {
        let affected: HashSet<Tuple<N>> = ancestors
            .iter()
            .flat_map(|from| descendants.iter().map(move |to| (from, to)))
            .filter(|(from, to)| self.relation.contains(from, to))
            .map(|(from, to)| (from.clone(), to.clone()))
            .collect();

        // Seed with pairs justified by an edge or by a pair outside the affected rectangle.
        let mut alive: HashSet<Tuple<N>> = HashSet::default();
        let mut stack: Vec<Tuple<N>> = Vec::new();
        for pair in &affected {
            let (from, to) = pair;
            let justified = graph.out_neighbors(from).any(|via| {
                via == to
                    || (self.relation.contains(via, to)
                        && !affected.contains(&(via.clone(), to.clone())))
            });
            if justified {
                alive.insert(pair.clone());
                stack.push(pair.clone());
            }
        }
        while let Some((via, to)) = stack.pop() {
            for from in graph.in_neighbors(&via) {
                let pair = (from.clone(), to.clone());
                if affected.contains(&pair) && alive.insert(pair.clone()) {
                    stack.push(pair);
                }
            }
        }

        for pair in affected {
            if !alive.contains(&pair) {
                let (from, to) = pair;
                self.relation.remove(&from, &to);
                out.push(Change::delete(from, to));
            }
        }
        for (from, to) in &alive {
            let count = graph
                .out_neighbors(from)
                .filter(|via| *via == to || self.relation.contains(via, to))
                .count();
            self.relation.set_count(from, to, count);
        }
    }
}

impl<N: NodeId> GraphAlgorithm<N> for CountingClosure<N> {
    const NAME: &'static str = "CountingClosure";
    const TIMELY: bool = true;

    fn from_graph(graph: &GraphStore<N>) -> Self {
        Self {
            relation: TcRelation::from_graph(graph),
        }
    }

    fn node_inserted(&mut self, _: &GraphStore<N>, _: &N, _: &mut Vec<Change<N>>) {}

    fn node_deleted(&mut self, _: &GraphStore<N>, _: &N, _: &mut Vec<Change<N>>) {}

    fn edge_inserted(
        &mut self,
        graph: &GraphStore<N>,
        source: &N,
        target: &N,
        out: &mut Vec<Change<N>>,
    ) {
        let ancestors = self.relation.ancestors_inclusive(source);
        let descendants = self.relation.descendants_inclusive(target);

        let mut created: Vec<Tuple<N>> = Vec::new();
        for from in &ancestors {
            for to in &descendants {
                if !self.relation.contains(from, to) {
                    created.push((from.clone(), to.clone()));
                }
            }
        }

        let mut support: HashMap<Tuple<N>, usize> = HashMap::default();
        for (via, to) in &created {
            if via == to {
                continue;
            }
            for from in graph.in_neighbors(via) {
                // The new edge is accounted for below.
                if from == source && via == target {
                    continue;
                }
                *support.entry((from.clone(), to.clone())).or_default() += 1;
            }
        }

        let mut reached_by_target: HashSet<&N> = descendants.iter().collect();
        reached_by_target.extend(
            created
                .iter()
                .filter(|(from, _)| from == target)
                .map(|(_, to)| to),
        );
        for to in reached_by_target {
            *support.entry((source.clone(), to.clone())).or_default() += 1;
        }

        for ((from, to), amount) in support {
            self.relation.add_support(from, to, amount);
        }
        out.extend(created.into_iter().map(|(from, to)| Change::insert(from, to)));
    }

    fn edge_deleted(
        &mut self,
        graph: &GraphStore<N>,
        source: &N,
        target: &N,
        out: &mut Vec<Change<N>>,
    ) {
        let ancestors = self.relation.ancestors_inclusive(source);
        let descendants = self.relation.descendants_inclusive(target);
        let cyclic = ancestors.iter().any(|node| self.relation.contains(node, node));
        if cyclic {
            self.rederive(graph, &ancestors, &descendants, out);
        } else {
            self.withdraw_cascading(graph, source, &descendants, out);
        }
    }

    fn tuples(&self) -> Vec<Tuple<N>> {
        self.relation
            .pairs()
            .map(|((from, to), _)| (from.clone(), to.clone()))
            .collect()
    }

    fn dispose(&mut self) {
        self.relation = TcRelation::new();
    }
}
