//! Mutable directed graph with incoming and outgoing adjacency indices.

use std::fmt::Debug;
use std::hash::Hash;

use ahash::{HashMap, HashSet};
use slab::Slab;

use crate::error::{EdgeEnd, EngineError, Result};

/// Requirements on caller-supplied node identifiers.
///
/// The engine never looks inside an identifier. Ordering is only used to make
/// representative elections reproducible.
pub trait NodeId: Clone + Eq + Ord + Hash + Debug {}

impl<T: Clone + Eq + Ord + Hash + Debug> NodeId for T {}

/// One arena slot per node. Adjacency refers to other slots by key.
#[derive(Debug, Clone)]
struct Slot<N> {
    id: N,
    outgoing: HashSet<usize>,
    incoming: HashSet<usize>,
}

/// Node set plus per-node outgoing and incoming neighbour sets.
///
/// Nodes live in a slab arena and edges are stored as slot keys on both
/// endpoints, so an edge `(u, v)` exists iff `v` is an outgoing neighbour of
/// `u` and `u` is an incoming neighbour of `v`. Every operation is amortized
/// O(1) set bookkeeping; nothing derived is recomputed here.
#[derive(Debug, Clone)]
pub struct GraphStore<N> {
    slots: Slab<Slot<N>>,
    index: HashMap<N, usize>,
    edge_count: usize,
}

impl<N> Default for GraphStore<N> {
    fn default() -> Self {
        Self {
            slots: Slab::new(),
            index: HashMap::default(),
            edge_count: 0,
        }
    }
}

impl<N> GraphStore<N> {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.slots.len()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Returns true if the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Iterate over all nodes.
    pub fn nodes(&self) -> impl Iterator<Item = &N> + '_ {
        self.slots.iter().map(|(_, slot)| &slot.id)
    }

    /// Iterate over all edges as `(source, target)`.
    pub fn edges(&self) -> impl Iterator<Item = (&N, &N)> + '_ {
        self.slots.iter().flat_map(move |(_, slot)| {
            slot.outgoing
                .iter()
                .map(move |&target| (&slot.id, &self.slots[target].id))
        })
    }
}

impl<N: NodeId> GraphStore<N> {
    /// Build a graph holding exactly the given edges and their endpoints.
    pub fn from_edges<I>(edges: I) -> Self
    where
        I: IntoIterator<Item = (N, N)>,
    {
        let mut graph = Self::new();
        for (source, target) in edges {
            graph.insert_node(source.clone());
            graph.insert_node(target.clone());
            // Both endpoints were just inserted.
            let source_key = graph.index[&source];
            let target_key = graph.index[&target];
            graph.link(source_key, target_key);
        }
        graph
    }

    /// Insert a node. Returns false if it was already present.
    pub fn insert_node(&mut self, node: N) -> bool {
        if self.index.contains_key(&node) {
            return false;
        }
        let key = self.slots.insert(Slot {
            id: node.clone(),
            outgoing: HashSet::default(),
            incoming: HashSet::default(),
        });
        self.index.insert(node, key);
        true
    }

    /// Returns true if the node is present.
    pub fn contains_node(&self, node: &N) -> bool {
        self.index.contains_key(node)
    }

    /// Insert the edge `source -> target`. Returns false if it was already present.
    ///
    /// Both endpoints must already be in the graph.
    pub fn insert_edge(&mut self, source: &N, target: &N) -> Result<bool> {
        let missing = |role| EngineError::MissingNode {
            role,
            source_repr: format!("{source:?}"),
            target_repr: format!("{target:?}"),
        };
        let source_key = *self.index.get(source).ok_or_else(|| missing(EdgeEnd::Source))?;
        let target_key = *self.index.get(target).ok_or_else(|| missing(EdgeEnd::Target))?;
        Ok(self.link(source_key, target_key))
    }

    fn link(&mut self, source_key: usize, target_key: usize) -> bool {
        if !self.slots[source_key].outgoing.insert(target_key) {
            return false;
        }
        self.slots[target_key].incoming.insert(source_key);
        self.edge_count += 1;
        true
    }

    /// Delete the edge `source -> target` if present. Returns whether it existed.
    pub fn delete_edge_if_exists(&mut self, source: &N, target: &N) -> bool {
        let (Some(&source_key), Some(&target_key)) = (self.index.get(source), self.index.get(target))
        else {
            return false;
        };
        if !self.slots[source_key].outgoing.remove(&target_key) {
            return false;
        }
        self.slots[target_key].incoming.remove(&source_key);
        self.edge_count -= 1;
        true
    }

    /// Delete an isolated node. Returns false if it was not present.
    pub fn delete_node(&mut self, node: &N) -> Result<bool> {
        let Some(&key) = self.index.get(node) else {
            return Ok(false);
        };
        let slot = &self.slots[key];
        if !slot.incoming.is_empty() || !slot.outgoing.is_empty() {
            return Err(EngineError::NodeNotIsolated {
                node: format!("{node:?}"),
                incoming: slot.incoming.len(),
                outgoing: slot.outgoing.len(),
            });
        }
        self.index.remove(node);
        self.slots.remove(key);
        Ok(true)
    }

    /// Returns true if the edge `source -> target` is present.
    pub fn contains_edge(&self, source: &N, target: &N) -> bool {
        match (self.index.get(source), self.index.get(target)) {
            (Some(&s), Some(t)) => self.slots[s].outgoing.contains(t),
            _ => false,
        }
    }

    /// Targets of the edges leaving `node`. Empty for an absent node.
    pub fn out_neighbors<'a>(&'a self, node: &N) -> impl Iterator<Item = &'a N> + 'a {
        self.index
            .get(node)
            .map(|&key| &self.slots[key].outgoing)
            .into_iter()
            .flatten()
            .map(move |&key| &self.slots[key].id)
    }

    /// Sources of the edges entering `node`. Empty for an absent node.
    pub fn in_neighbors<'a>(&'a self, node: &N) -> impl Iterator<Item = &'a N> + 'a {
        self.index
            .get(node)
            .map(|&key| &self.slots[key].incoming)
            .into_iter()
            .flatten()
            .map(move |&key| &self.slots[key].id)
    }

    /// Neighbours ignoring edge direction. A node adjacent both ways is yielded twice.
    pub fn undirected_neighbors<'a>(&'a self, node: &N) -> impl Iterator<Item = &'a N> + 'a {
        self.out_neighbors(node).chain(self.in_neighbors(node))
    }

    /// Number of outgoing edges.
    pub fn out_degree(&self, node: &N) -> usize {
        self.index
            .get(node)
            .map_or(0, |&key| self.slots[key].outgoing.len())
    }

    /// Number of incoming edges.
    pub fn in_degree(&self, node: &N) -> usize {
        self.index
            .get(node)
            .map_or(0, |&key| self.slots[key].incoming.len())
    }

    /// Returns true if no edge touches `node`. Absent nodes are isolated.
    pub fn is_isolated(&self, node: &N) -> bool {
        self.out_degree(node) == 0 && self.in_degree(node) == 0
    }
}
