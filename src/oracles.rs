//! Preprocessing collaborators of the exact search.
//!
//! Editable graphs keep the vertex ids of the input, so reduced graphs, separator parts and
//! the decompositions built for them all live in one id space. Only
//! [`EditableGraph::reduce`](crate::graph::EditableGraph::reduce) compacts ids, and the search
//! translates back through the map it returns.

use crate::datastructures::BitSet;
use crate::graph::{BaseGraph, EditableGraph, MutableGraph};
use crate::tree_decomposition::TreeDecomposition;
use fxhash::FxHashSet;
use log::debug;
use std::cmp::max;

/// Bag removed by a reduction rule, to be hung below a bag containing `anchor`.
#[derive(Debug, Clone)]
pub struct SplicedBag {
    pub vertex_set: FxHashSet<usize>,
    pub anchor: FxHashSet<usize>,
}

#[derive(Debug, Clone)]
pub struct Reduction {
    pub graph: EditableGraph,
    /// In elimination order; splice them back in reverse.
    pub bags: Vec<SplicedBag>,
    /// Treewidth lower bound certified by the eliminated bags.
    pub lowerbound: usize,
}

impl Reduction {
    /// Extends a decomposition of the reduced graph to one of the original graph.
    pub fn splice_into(&self, td: &mut TreeDecomposition) -> Option<()> {
        for bag in self.bags.iter().rev() {
            td.attach(bag.vertex_set.clone(), &bag.anchor)?;
        }
        Some(())
    }
}

pub trait ReductionOracle {
    fn reduce(&self, graph: &EditableGraph) -> Reduction;
}

#[derive(Debug, Clone)]
pub struct SeparatorSplit {
    pub separator: BitSet,
    /// Subgraphs induced by each component together with the separator.
    pub parts: Vec<EditableGraph>,
}

pub trait SeparatorOracle {
    fn find(&self, graph: &EditableGraph) -> Option<SeparatorSplit>;
}

pub trait RecombineOracle {
    fn recombine(&self, separator: &BitSet, parts: Vec<TreeDecomposition>) -> TreeDecomposition;
}

/// Eliminates islets, degree one vertices, simplicial vertices and almost simplicial vertices
/// whose degree is at most the running lower bound.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimplicialReducer {
    lowerbound: usize,
}

impl SimplicialReducer {
    impl_setter!(self, lowerbound, usize);

    fn is_almost_simplicial(graph: &EditableGraph, v: usize) -> bool {
        let neighbors = graph.neighborhood_set(v);
        neighbors.iter().any(|w| {
            let rest: Vec<_> = neighbors.iter().filter(|u| *u != w).collect();
            graph.is_clique(&rest)
        })
    }
}

impl ReductionOracle for SimplicialReducer {
    fn reduce(&self, graph: &EditableGraph) -> Reduction {
        let mut graph = graph.clone();
        let mut bags = Vec::new();
        let mut lowerbound = self.lowerbound;
        let mut changed = true;
        while changed {
            changed = false;
            let vertices: Vec<_> = graph.vertices().collect();
            for v in vertices {
                let degree = graph.degree(v);
                let eliminate = if degree <= 1 || graph.is_simplicial(v) {
                    lowerbound = max(lowerbound, degree);
                    true
                } else {
                    degree <= lowerbound && Self::is_almost_simplicial(&graph, v)
                };
                if eliminate {
                    let anchor: FxHashSet<usize> = graph.neighborhood(v).collect();
                    let mut vertex_set = anchor.clone();
                    vertex_set.insert(v);
                    bags.push(SplicedBag { vertex_set, anchor });
                    graph.eliminate_vertex(v);
                    changed = true;
                }
            }
        }
        debug!(
            "reduction removed {} vertices, lower bound {}",
            bags.len(),
            lowerbound
        );
        Reduction {
            graph,
            bags,
            lowerbound,
        }
    }
}

fn split_at(graph: &EditableGraph, separator: BitSet) -> SeparatorSplit {
    let parts = graph
        .separate(&separator)
        .into_iter()
        .map(|mut component| {
            component.or(&separator);
            graph.vertex_induced(&component)
        })
        .collect();
    SeparatorSplit { separator, parts }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CutVertexSeparator;

impl SeparatorOracle for CutVertexSeparator {
    fn find(&self, graph: &EditableGraph) -> Option<SeparatorSplit> {
        let v = graph.find_cut_vertex()?;
        Some(split_at(graph, BitSet::from_slice(graph.capacity(), &[v])))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CliqueSeparator;

impl SeparatorOracle for CliqueSeparator {
    fn find(&self, graph: &EditableGraph) -> Option<SeparatorSplit> {
        let separator = graph.find_clique_minimal_separator()?;
        Some(split_at(graph, separator))
    }
}

/// Glues every part to a bag holding exactly the separator, then merges that bag away.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlueRecombiner;

impl RecombineOracle for GlueRecombiner {
    fn recombine(&self, separator: &BitSet, parts: Vec<TreeDecomposition>) -> TreeDecomposition {
        let mut td = TreeDecomposition::with_root(separator.iter().collect());
        for part in parts {
            td.combine_with(0, part);
        }
        td.flatten();
        td
    }
}
