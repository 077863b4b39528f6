use crate::graph::{BaseGraph, EditableGraph, MutableGraph};
use crate::tree_decomposition::TreeDecomposition;
use fxhash::FxHashSet;
use rand::prelude::*;
use rand::rngs::StdRng;
use std::cmp::max;

/// Scores vertices of a graph that is eliminated step by step. Lower values are eliminated first.
pub trait Selector: From<EditableGraph> {
    fn graph(&self) -> &EditableGraph;
    fn value(&self, v: usize) -> usize;
    fn eliminate_vertex(&mut self, v: usize);
}

pub struct MinDegreeSelector {
    graph: EditableGraph,
}

impl From<EditableGraph> for MinDegreeSelector {
    fn from(graph: EditableGraph) -> Self {
        Self { graph }
    }
}

impl Selector for MinDegreeSelector {
    fn graph(&self) -> &EditableGraph {
        &self.graph
    }

    fn value(&self, v: usize) -> usize {
        self.graph.degree(v)
    }

    fn eliminate_vertex(&mut self, v: usize) {
        self.graph.eliminate_vertex(v);
    }
}

pub struct MinFillSelector {
    graph: EditableGraph,
}

impl From<EditableGraph> for MinFillSelector {
    fn from(graph: EditableGraph) -> Self {
        Self { graph }
    }
}

impl Selector for MinFillSelector {
    fn graph(&self) -> &EditableGraph {
        &self.graph
    }

    fn value(&self, v: usize) -> usize {
        self.graph.fill_in_count(v)
    }

    fn eliminate_vertex(&mut self, v: usize) {
        self.graph.eliminate_vertex(v);
    }
}

pub type MinFillDecomposer = HeuristicEliminationDecomposer<MinFillSelector>;
pub type MinDegreeDecomposer = HeuristicEliminationDecomposer<MinDegreeSelector>;

/// Greedy elimination ordering. Ties are broken by a seeded random choice, so equal seeds give
/// equal decompositions.
pub struct HeuristicEliminationDecomposer<S: Selector> {
    selector: S,
    upperbound: Option<usize>,
    seed: u64,
}

impl<S: Selector> HeuristicEliminationDecomposer<S> {
    pub fn new(graph: &EditableGraph) -> Self {
        Self {
            selector: S::from(graph.clone()),
            upperbound: None,
            seed: 0,
        }
    }

    impl_setter!(self, upperbound, Option<usize>);
    impl_setter!(self, seed, u64);

    /// Returns `None` if some elimination step would exceed the upper bound.
    pub fn compute(self) -> Option<TreeDecomposition> {
        let mut selector = self.selector;
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut stack: Vec<(usize, FxHashSet<usize>)> = Vec::new();
        let mut max_bag = 0;

        while selector.graph().order() > max_bag {
            let best = selector
                .graph()
                .vertices()
                .map(|v| selector.value(v))
                .min()?;
            let candidates: Vec<_> = selector
                .graph()
                .vertices()
                .filter(|v| selector.value(*v) == best)
                .collect();
            let u = *candidates.choose(&mut rng)?;
            let degree = selector.graph().degree(u);
            if self.upperbound.map_or(false, |ub| degree > ub) {
                return None;
            }
            max_bag = max(max_bag, degree + 1);
            stack.push((u, selector.graph().neighborhood(u).collect()));
            selector.eliminate_vertex(u);
        }

        let mut td = TreeDecomposition::default();
        if selector.graph().order() > 0 {
            td.add_bag(selector.graph().vertices().collect());
        }
        for (v, mut neighbors) in stack.into_iter().rev() {
            let parent = td
                .bags()
                .iter()
                .find(|bag| bag.vertex_set.is_superset(&neighbors))
                .map(|bag| bag.id);
            neighbors.insert(v);
            let id = td.add_bag(neighbors);
            if let Some(parent) = parent {
                td.add_edge(parent, id);
            }
        }
        Some(td)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cycle(n: usize) -> EditableGraph {
        let edges: Vec<_> = (0..n).map(|i| (i, (i + 1) % n)).collect();
        EditableGraph::from_edges(n, &edges)
    }

    fn grid(rows: usize, cols: usize) -> EditableGraph {
        let mut edges = Vec::new();
        for r in 0..rows {
            for c in 0..cols {
                let v = r * cols + c;
                if c + 1 < cols {
                    edges.push((v, v + 1));
                }
                if r + 1 < rows {
                    edges.push((v, v + cols));
                }
            }
        }
        EditableGraph::from_edges(rows * cols, &edges)
    }

    #[test]
    fn cycle_has_width_two() {
        let graph = cycle(7);
        let td = MinDegreeDecomposer::new(&graph).compute().unwrap();
        assert_eq!(td.width(), 2);
        assert_eq!(td.verify(&graph), Ok(()));

        let td = MinFillDecomposer::new(&graph).seed(3).compute().unwrap();
        assert_eq!(td.width(), 2);
        assert_eq!(td.verify(&graph), Ok(()));
    }

    #[test]
    fn valid_on_grid() {
        let graph = grid(4, 5);
        for seed in 0..4 {
            let td = MinFillDecomposer::new(&graph).seed(seed).compute().unwrap();
            assert!(td.width() >= 4);
            assert_eq!(td.verify(&graph), Ok(()));
        }
    }

    #[test]
    fn seed_is_deterministic() {
        let graph = grid(4, 4);
        let a = MinDegreeDecomposer::new(&graph).seed(11).compute().unwrap();
        let b = MinDegreeDecomposer::new(&graph).seed(11).compute().unwrap();
        assert_eq!(a.bags().len(), b.bags().len());
        for (x, y) in a.bags().iter().zip(b.bags()) {
            assert_eq!(x.vertex_set, y.vertex_set);
        }
    }

    #[test]
    fn gives_up_above_upperbound() {
        let graph = cycle(5);
        assert!(MinDegreeDecomposer::new(&graph)
            .upperbound(Some(1))
            .compute()
            .is_none());
        assert!(MinDegreeDecomposer::new(&graph)
            .upperbound(Some(2))
            .compute()
            .is_some());
    }

    #[test]
    fn edgeless_and_empty() {
        let graph = EditableGraph::new(3);
        let td = MinFillDecomposer::new(&graph).compute().unwrap();
        assert_eq!(td.width(), 0);
        assert_eq!(td.verify(&graph), Ok(()));

        let td = MinFillDecomposer::new(&EditableGraph::new(0)).compute().unwrap();
        assert!(td.bags().is_empty());
    }
}
