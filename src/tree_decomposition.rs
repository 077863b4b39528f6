use crate::datastructures::BitSet;
use crate::graph::BaseGraph;
use fxhash::FxHashSet;
use std::cmp::max;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeDecompositionValidationError {
    #[error("has cycle")]
    HasCycle,
    #[error("not connected")]
    NotConnected,
    #[error("missing vertex: {0}")]
    MissingVertex(usize),
    #[error("missing edge: ({0}, {1})")]
    MissingEdge(usize, usize),
    #[error("bags containing {0} do not induce a subtree")]
    NotInducingSubtree(usize),
}

#[derive(Debug, Default, Clone)]
pub struct Bag {
    pub id: usize,
    pub vertex_set: FxHashSet<usize>,
    pub neighbors: FxHashSet<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct TreeDecomposition {
    pub bags: Vec<Bag>,
    pub root: Option<usize>,
    pub max_bag_size: usize,
}

impl TreeDecomposition {
    pub fn with_root(vertex_set: FxHashSet<usize>) -> Self {
        let mut td = Self::default();
        td.add_bag(vertex_set);
        td
    }

    /// Largest bag size minus one. An empty decomposition has width 0.
    pub fn width(&self) -> usize {
        self.max_bag_size.saturating_sub(1)
    }

    pub fn bags(&self) -> &[Bag] {
        &self.bags
    }

    pub fn add_bag(&mut self, vertex_set: FxHashSet<usize>) -> usize {
        let id = self.bags.len();
        if id == 0 {
            self.root = Some(id);
        }
        self.max_bag_size = max(self.max_bag_size, vertex_set.len());
        self.bags.push(Bag {
            id,
            vertex_set,
            neighbors: FxHashSet::default(),
        });
        id
    }

    pub fn add_edge(&mut self, b1: usize, b2: usize) {
        debug_assert!(b1 < self.bags.len() && b2 < self.bags.len());
        debug_assert_ne!(b1, b2);
        self.bags[b1].neighbors.insert(b2);
        self.bags[b2].neighbors.insert(b1);
    }

    /// Hangs a new bag below the first bag that contains `anchor`. Returns the id of the new
    /// bag, or `None` if no bag covers `anchor`.
    pub fn attach(
        &mut self,
        vertex_set: FxHashSet<usize>,
        anchor: &FxHashSet<usize>,
    ) -> Option<usize> {
        if self.bags.is_empty() {
            return Some(self.add_bag(vertex_set));
        }
        let parent = self
            .bags
            .iter()
            .find(|b| b.vertex_set.is_superset(anchor))?
            .id;
        let id = self.add_bag(vertex_set);
        self.add_edge(parent, id);
        Some(id)
    }

    /// Merges every bag into a neighbouring superset bag.
    pub fn flatten(&mut self) {
        while let Some((parent, child)) = self.find_combinable() {
            self.reroute(child, parent);
            self.remove_bag(child);
        }
    }

    fn find_combinable(&self) -> Option<(usize, usize)> {
        self.bags.iter().find_map(|b| {
            b.neighbors
                .iter()
                .find(|n| self.bags[**n].vertex_set.is_subset(&b.vertex_set))
                .map(|n| (b.id, *n))
        })
    }

    fn reroute(&mut self, old_bag: usize, parent: usize) {
        let old_neighbors = std::mem::take(&mut self.bags[old_bag].neighbors);
        for neighbor in old_neighbors {
            self.bags[neighbor].neighbors.remove(&old_bag);
            if neighbor != parent {
                self.add_edge(parent, neighbor);
            }
        }
        if self.root == Some(old_bag) {
            self.root = Some(parent);
        }
    }

    fn remove_bag(&mut self, id: usize) {
        debug_assert!(self.bags[id].neighbors.is_empty());
        let last = self.bags.len() - 1;
        self.bags.swap_remove(id);
        if id != last {
            self.bags[id].id = id;
            for neighbor in self.bags[id].neighbors.clone() {
                self.bags[neighbor].neighbors.remove(&last);
                self.bags[neighbor].neighbors.insert(id);
            }
            if self.root == Some(last) {
                self.root = Some(id);
            }
        }
        if self.bags.is_empty() {
            self.root = None;
        }
    }

    pub fn combine_with_or_replace(&mut self, glue_point: usize, other: TreeDecomposition) {
        if self.bags.is_empty() || (self.bags.len() == 1 && self.bags[0].vertex_set.is_empty()) {
            *self = other;
        } else {
            self.combine_with(glue_point, other);
        }
    }

    /// Connects `other` to the bag `glue_point`, through the first bag of `other` that contains
    /// every vertex of the glue bag. Falls back to the root of `other` when no such bag exists,
    /// which keeps the tree connected; `verify` reports any coverage problem this causes.
    pub fn combine_with(&mut self, glue_point: usize, mut other: TreeDecomposition) {
        if other.bags.is_empty() {
            return;
        }
        self.max_bag_size = max(self.max_bag_size, other.max_bag_size);
        let offset = self.bags.len();
        for b in other.bags.iter_mut() {
            b.id += offset;
            b.neighbors = b.neighbors.iter().map(|n| *n + offset).collect();
        }
        let glue = &self.bags[glue_point].vertex_set;
        let other_glue_point = other
            .bags
            .iter()
            .find(|b| b.vertex_set.is_superset(glue))
            .map(|b| b.id)
            .or_else(|| other.root.map(|r| r + offset))
            .unwrap_or(offset);
        self.bags.extend(other.bags.drain(..));
        self.add_edge(glue_point, other_glue_point);
    }

    pub fn dfs(&self) -> TreeDecompositionIterator<'_> {
        let mut visited = BitSet::new(self.bags.len());
        let stack = match self.root {
            Some(root) => {
                visited.set_bit(root);
                vec![root]
            }
            None => vec![],
        };
        TreeDecompositionIterator {
            td: self,
            stack,
            visited,
        }
    }

    pub fn verify<G: BaseGraph>(&self, graph: &G) -> Result<(), TreeDecompositionValidationError> {
        if !self.is_connected() {
            return Err(TreeDecompositionValidationError::NotConnected);
        }
        if self.is_cyclic() {
            return Err(TreeDecompositionValidationError::HasCycle);
        }
        if let Some(v) = self.missing_vertex(graph) {
            return Err(TreeDecompositionValidationError::MissingVertex(v));
        }
        if let Some(e) = self.missing_edge(graph) {
            return Err(TreeDecompositionValidationError::MissingEdge(e.0, e.1));
        }
        if let Some(v) = self.vertex_not_inducing_subtree(graph) {
            return Err(TreeDecompositionValidationError::NotInducingSubtree(v));
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.dfs().count() == self.bags.len()
    }

    // a connected graph with |V| - 1 edges is a tree
    fn is_cyclic(&self) -> bool {
        let edges: usize = self.bags.iter().map(|b| b.neighbors.len()).sum::<usize>() / 2;
        !self.bags.is_empty() && edges != self.bags.len() - 1
    }

    fn missing_vertex<G: BaseGraph>(&self, graph: &G) -> Option<usize> {
        graph
            .vertices()
            .find(|v| !self.bags.iter().any(|b| b.vertex_set.contains(v)))
    }

    fn missing_edge<G: BaseGraph>(&self, graph: &G) -> Option<(usize, usize)> {
        graph
            .vertices()
            .flat_map(|u| graph.neighborhood(u).filter(move |v| u < *v).map(move |v| (u, v)))
            .find(|(u, v)| {
                !self
                    .bags
                    .iter()
                    .any(|b| b.vertex_set.contains(u) && b.vertex_set.contains(v))
            })
    }

    fn vertex_not_inducing_subtree<G: BaseGraph>(&self, graph: &G) -> Option<usize> {
        graph.vertices().find(|u| {
            let mut containing = BitSet::new(self.bags.len());
            for b in self.bags.iter().filter(|b| b.vertex_set.contains(u)) {
                containing.set_bit(b.id);
            }
            let first = match containing.get_first_set() {
                Some(first) => first,
                None => return false,
            };
            containing.unset_bit(first);
            let mut stack = vec![first];
            while let Some(c) = stack.pop() {
                for n in self.bags[c].neighbors.iter().copied() {
                    if containing.unset_bit(n) {
                        stack.push(n);
                    }
                }
            }
            !containing.is_empty()
        })
    }
}

pub struct TreeDecompositionIterator<'a> {
    td: &'a TreeDecomposition,
    stack: Vec<usize>,
    visited: BitSet,
}

impl<'a> Iterator for TreeDecompositionIterator<'a> {
    type Item = &'a Bag;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.stack.pop()?;
        for c in self.td.bags[current].neighbors.iter().copied() {
            if !self.visited.set_bit(c) {
                self.stack.push(c);
            }
        }
        self.td.bags.get(current)
    }
}
