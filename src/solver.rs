use crate::error::{Result, TreewidthError};
use crate::exact::{SearchConfig, TreewidthSearch};
use crate::graph::{BaseGraph, EditableGraph};
use crate::lowerbound::MinorMinWidth;
use crate::oracles::{
    CliqueSeparator, CutVertexSeparator, GlueRecombiner, RecombineOracle, ReductionOracle,
    SeparatorOracle, SimplicialReducer,
};
use crate::tree_decomposition::TreeDecomposition;
use crate::upperbound::{MinDegreeDecomposer, MinFillDecomposer};
use fxhash::FxHashSet;
use log::{debug, info};
use std::cmp::max;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpperboundHeuristicType {
    MinDegree,
    MinFill,
}

impl UpperboundHeuristicType {
    pub(crate) fn compute(&self, graph: &EditableGraph, seed: u64) -> Option<TreeDecomposition> {
        match self {
            UpperboundHeuristicType::MinDegree => {
                MinDegreeDecomposer::new(graph).seed(seed).compute()
            }
            UpperboundHeuristicType::MinFill => MinFillDecomposer::new(graph).seed(seed).compute(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SolveResult {
    pub width: usize,
    pub tree_decomposition: TreeDecomposition,
}

/// Exact treewidth of arbitrary graphs: splits off components, reduces, separates and runs the
/// exact search on what is left.
#[derive(Clone, Copy, Debug)]
pub struct Solver {
    apply_reduction_rules: bool,
    use_separators: bool,
    use_atom_width_as_lower_bound: bool,
    upperbound_heuristic: Option<UpperboundHeuristicType>,
    seed: u64,
    search_config: SearchConfig,
}

impl Default for Solver {
    fn default() -> Self {
        Self {
            apply_reduction_rules: true,
            use_separators: true,
            use_atom_width_as_lower_bound: true,
            upperbound_heuristic: None,
            seed: 0,
            search_config: SearchConfig::default(),
        }
    }
}

impl Solver {
    /// Only the exact search, on each connected component.
    pub fn plain() -> Self {
        Self::default()
            .apply_reduction_rules(false)
            .use_separators(false)
    }

    impl_setter!(self, apply_reduction_rules, bool);
    impl_setter!(self, use_separators, bool);
    impl_setter!(self, use_atom_width_as_lower_bound, bool);
    impl_setter!(self, upperbound_heuristic, Option<UpperboundHeuristicType>);
    impl_setter!(self, seed, u64);
    impl_setter!(self, search_config, SearchConfig);

    pub fn solve(&self, graph: &EditableGraph) -> Result<SolveResult> {
        info!(
            "solving graph with {} vertices and {} edges",
            graph.order(),
            graph.edge_count()
        );
        let components = graph.connected_components();
        info!("obtained {} components", components.len());

        let mut td = TreeDecomposition::with_root(FxHashSet::default());
        let mut lowerbound = 0;
        for component in components {
            let sub_graph = graph.vertex_induced(&component);
            let partial = self.solve_component(&sub_graph, &mut lowerbound)?;
            td.combine_with_or_replace(0, partial);
        }
        td.flatten();
        td.verify(graph).map_err(|e| {
            TreewidthError::inconsistent(format!("computed decomposition is invalid: {}", e))
        })?;
        info!("treewidth {}", td.width());
        Ok(SolveResult {
            width: td.width(),
            tree_decomposition: td,
        })
    }

    fn solve_component(
        &self,
        graph: &EditableGraph,
        lowerbound: &mut usize,
    ) -> Result<TreeDecomposition> {
        if !self.apply_reduction_rules {
            return self.solve_separated(graph, lowerbound);
        }
        let reduction = SimplicialReducer::default()
            .lowerbound(*lowerbound)
            .reduce(graph);
        *lowerbound = max(*lowerbound, reduction.lowerbound);
        debug!(
            "reduced component from {} to {} vertices",
            graph.order(),
            reduction.graph.order()
        );
        let mut td = if reduction.graph.order() > 0 {
            self.solve_separated(&reduction.graph, lowerbound)?
        } else {
            TreeDecomposition::default()
        };
        reduction.splice_into(&mut td).ok_or_else(|| {
            TreewidthError::inconsistent("no bag covers the neighbourhood of a reduced vertex")
        })?;
        Ok(td)
    }

    fn solve_separated(
        &self,
        graph: &EditableGraph,
        lowerbound: &mut usize,
    ) -> Result<TreeDecomposition> {
        if self.use_separators {
            let split = CutVertexSeparator
                .find(graph)
                .or_else(|| CliqueSeparator.find(graph));
            if let Some(split) = split {
                debug!(
                    "separator {:?} splits {} vertices into {} parts",
                    split.separator,
                    graph.order(),
                    split.parts.len()
                );
                let parts = split
                    .parts
                    .iter()
                    .map(|part| self.solve_separated(part, lowerbound))
                    .collect::<Result<Vec<_>>>()?;
                return Ok(GlueRecombiner.recombine(&split.separator, parts));
            }
        }
        let td = self.solve_atom(graph, *lowerbound)?;
        if self.use_atom_width_as_lower_bound {
            *lowerbound = max(*lowerbound, td.width());
        }
        Ok(td)
    }

    fn solve_atom(&self, graph: &EditableGraph, lowerbound: usize) -> Result<TreeDecomposition> {
        let lowerbound = max(lowerbound, MinorMinWidth::with_graph(graph).compute());
        if graph.order() <= lowerbound + 1 {
            return Ok(TreeDecomposition::with_root(graph.vertices().collect()));
        }
        debug!(
            "solving atom with {} vertices, lower bound {}",
            graph.order(),
            lowerbound
        );

        let (frozen, reindex) = graph.reduce();
        let mut search = TreewidthSearch::with_config(frozen, self.search_config);
        let heuristic = self
            .upperbound_heuristic
            .and_then(|heuristic| heuristic.compute(graph, self.seed));
        let (width, ptd) = match heuristic {
            Some(td) if td.width() <= lowerbound => {
                debug!("heuristic decomposition meets the lower bound {}", lowerbound);
                return Ok(td);
            }
            Some(td) => match search.search(lowerbound, td.width())? {
                Some(found) => found,
                None => {
                    debug!("heuristic decomposition of width {} is optimal", td.width());
                    return Ok(td);
                }
            },
            None => search.decompose(lowerbound)?,
        };
        debug!(
            "atom solved at width {} with {} accepted blocks",
            width,
            search.accepted()
        );
        Ok(ptd.to_tree_decomposition(&reindex))
    }
}

/// Convenience wrapper around [`Solver::default`].
pub fn treewidth(graph: &EditableGraph) -> Result<SolveResult> {
    Solver::default().solve(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::MutableGraph;

    fn reference_graph() -> EditableGraph {
        EditableGraph::from_edges(
            6,
            &[
                (0, 1),
                (0, 2),
                (1, 2),
                (1, 3),
                (1, 4),
                (2, 3),
                (2, 4),
                (3, 4),
                (4, 5),
            ],
        )
    }

    fn configurations() -> Vec<Solver> {
        vec![
            Solver::default(),
            Solver::plain(),
            Solver::default().use_separators(false),
            Solver::default().upperbound_heuristic(Some(UpperboundHeuristicType::MinFill)),
            Solver::plain()
                .upperbound_heuristic(Some(UpperboundHeuristicType::MinDegree))
                .seed(7),
        ]
    }

    fn check(graph: &EditableGraph, expected: usize) {
        for solver in configurations() {
            let result = solver.solve(graph).unwrap();
            assert_eq!(result.width, expected, "{:?}", solver);
            assert_eq!(result.tree_decomposition.verify(graph), Ok(()));
        }
    }

    #[test]
    fn trivial_graphs() {
        check(&EditableGraph::new(0), 0);
        check(&EditableGraph::new(1), 0);
        check(&EditableGraph::new(4), 0);
        check(&EditableGraph::from_edges(4, &[(0, 1), (1, 2), (2, 3)]), 1);
    }

    #[test]
    fn reference() {
        check(&reference_graph(), 3);
    }

    #[test]
    fn disconnected() {
        // triangle, 5-cycle and an isolated vertex
        let graph = EditableGraph::from_edges(
            9,
            &[(0, 1), (1, 2), (2, 0), (3, 4), (4, 5), (5, 6), (6, 7), (7, 3)],
        );
        check(&graph, 2);
    }

    #[test]
    fn separators_and_reductions() {
        // two wheels sharing their hub, joined by the edge 1-5, plus a pendant path
        let mut edges = vec![(0, 1), (1, 2), (2, 3), (3, 4), (4, 1)];
        edges.extend([(0, 2), (0, 3), (0, 4)].iter().copied());
        edges.extend([(5, 6), (6, 7), (7, 8), (8, 5)].iter().copied());
        edges.extend([(0, 5), (0, 6), (0, 7), (0, 8), (1, 5)].iter().copied());
        edges.extend([(8, 9), (9, 10)].iter().copied());
        check(&EditableGraph::from_edges(11, &edges), 3);
    }

    #[test]
    fn complete_graph() {
        let mut graph = EditableGraph::new(6);
        let vertices: Vec<_> = (0..6).collect();
        graph.make_clique(&vertices);
        check(&graph, 5);
    }

    #[test]
    fn deterministic() {
        let graph = reference_graph();
        let solver = Solver::default();
        let first = solver.solve(&graph).unwrap();
        for _ in 0..3 {
            let again = solver.solve(&graph).unwrap();
            assert_eq!(again.width, first.width);
            assert_eq!(
                again.tree_decomposition.bags().len(),
                first.tree_decomposition.bags().len()
            );
        }
    }
}
