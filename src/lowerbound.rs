use crate::graph::MutableGraph;
use std::cmp::max;

/// Contraction degeneracy bound: repeatedly contract a minimum degree vertex into its
/// minimum degree neighbour and record the largest minimum degree seen.
pub struct MinorMinWidth<G: MutableGraph> {
    graph: G,
}

impl<G: MutableGraph> MinorMinWidth<G> {
    pub fn with_graph(graph: &G) -> Self {
        Self {
            graph: graph.clone(),
        }
    }

    pub fn compute(self) -> usize {
        let mut graph = self.graph;
        let mut lb = 0;
        loop {
            let v = match graph
                .vertices()
                .filter(|v| graph.degree(*v) > 0)
                .min_by_key(|v| graph.degree(*v))
            {
                Some(v) => v,
                None => break,
            };
            lb = max(lb, graph.degree(v));
            let u = match graph.neighborhood(v).min_by_key(|u| graph.degree(*u)) {
                Some(u) => u,
                None => break,
            };
            graph.contract(v, u);
        }
        lb
    }
}
