use crate::datastructures::BitSet;
use crate::error::{Result, TreewidthError};
use crate::exact::ptd::Ptd;
use crate::exact::sieve::{BlockSieve, LayeredSieve};
use crate::graph::{BaseGraph, FrozenGraph};
use fxhash::{FxHashMap, FxHashSet};
use log::{debug, info, trace};
use std::collections::VecDeque;
use std::rc::Rc;

#[derive(Clone, Copy, Debug)]
pub struct SearchConfig {
    sieve_capacity: usize,
    candidate_limit: Option<usize>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            sieve_capacity: BlockSieve::DEFAULT_CAPACITY,
            candidate_limit: None,
        }
    }
}

impl SearchConfig {
    impl_setter!(self, sieve_capacity, usize);
    impl_setter!(self, candidate_limit, Option<usize>);
}

/// Result of deciding a single width.
#[derive(Debug, Clone)]
pub enum WidthOutcome {
    Feasible(Rc<Ptd>),
    Infeasible,
}

/// A potential maximal clique waiting for the PTDs of its inbound components.
#[derive(Debug, Clone)]
struct Endorser {
    bag: BitSet,
    inbounds: Vec<BitSet>,
    /// Largest neighbourhood of an outbound component, `None` for a root bag.
    outbound_separator: Option<BitSet>,
}

/// Positive-instance driven search for a tree decomposition of bounded width.
///
/// Every accepted PTD is rooted at a potential maximal clique and resolves exactly one inbound
/// component of its outlet. Accepted PTDs stay valid for larger widths and are kept between
/// calls to [`TreewidthSearch::decide`]. The graph must be connected.
pub struct TreewidthSearch {
    graph: FrozenGraph,
    config: SearchConfig,
    width: usize,
    ignore: BitSet,
    accepted: FxHashMap<BitSet, Rc<Ptd>>,
    frontier: VecDeque<Rc<Ptd>>,
    pending: Vec<Endorser>,
    offered: FxHashSet<BitSet>,
    separators: FxHashSet<BitSet>,
    sieve: LayeredSieve,
    candidates: usize,
    solution: Option<Rc<Ptd>>,
}

impl TreewidthSearch {
    pub fn new(graph: FrozenGraph) -> Self {
        Self::with_config(graph, SearchConfig::default())
    }

    pub fn with_config(graph: FrozenGraph, config: SearchConfig) -> Self {
        let n = graph.order();
        let ignore = graph.universal_vertices();
        Self {
            sieve: LayeredSieve::with_capacity(n, 0, ignore.clone(), config.sieve_capacity),
            graph,
            config,
            width: 0,
            ignore,
            accepted: FxHashMap::default(),
            frontier: VecDeque::new(),
            pending: Vec::new(),
            offered: FxHashSet::default(),
            separators: FxHashSet::default(),
            candidates: 0,
            solution: None,
        }
    }

    pub fn graph(&self) -> &FrozenGraph {
        &self.graph
    }

    /// Number of PTDs accepted so far, over all widths.
    pub fn accepted(&self) -> usize {
        self.accepted.len()
    }

    /// Tries widths `lowerbound..upperbound` in order and returns the first feasible one.
    pub fn search(
        &mut self,
        lowerbound: usize,
        upperbound: usize,
    ) -> Result<Option<(usize, Rc<Ptd>)>> {
        for width in lowerbound..upperbound {
            if let WidthOutcome::Feasible(ptd) = self.decide(width)? {
                return Ok(Some((width, ptd)));
            }
        }
        Ok(None)
    }

    /// Exact treewidth starting from `lowerbound`.
    pub fn decompose(&mut self, lowerbound: usize) -> Result<(usize, Rc<Ptd>)> {
        let n = self.graph.order();
        self.search(lowerbound, n.max(1))?.ok_or_else(|| {
            TreewidthError::inconsistent(format!(
                "no decomposition of width below {} on {} vertices",
                n.max(1),
                n
            ))
        })
    }

    pub fn decide(&mut self, width: usize) -> Result<WidthOutcome> {
        let n = self.graph.order();
        if n == 0 {
            return Ok(WidthOutcome::Feasible(Rc::new(Ptd::leaf(
                BitSet::new(0),
                BitSet::new(0),
            ))));
        }
        info!("deciding width {} on {} vertices", width, n);
        self.width = width;
        self.sieve =
            LayeredSieve::with_capacity(n, width, self.ignore.clone(), self.config.sieve_capacity);
        self.separators.clear();
        self.offered.clear();
        self.pending.clear();
        self.candidates = 0;
        self.solution = None;
        self.frontier = self.accepted.values().cloned().collect();

        for v in 0..n {
            let closed = self.graph.closed_neighborhood(v).clone();
            self.offer(closed)?;
            if let Some(solution) = self.solution.take() {
                return Ok(WidthOutcome::Feasible(solution));
            }
        }

        loop {
            while let Some(ptd) = self.frontier.pop_front() {
                self.process(&ptd)?;
                if let Some(solution) = self.solution.take() {
                    debug!(
                        "width {} feasible after {} candidates",
                        width, self.candidates
                    );
                    return Ok(WidthOutcome::Feasible(solution));
                }
            }
            self.retry_pending()?;
            if let Some(solution) = self.solution.take() {
                return Ok(WidthOutcome::Feasible(solution));
            }
            if self.frontier.is_empty() {
                break;
            }
        }
        let (cliquish, pmcs) = self.graph.cache_sizes();
        debug!(
            "width {} infeasible: {} candidates, {} accepted, {} in sieve, {} pending, memo {}/{}",
            width,
            self.candidates,
            self.accepted.len(),
            self.sieve.len(),
            self.pending.len(),
            cliquish,
            pmcs
        );
        Ok(WidthOutcome::Infeasible)
    }

    fn retry_pending(&mut self) -> Result<()> {
        let pending = std::mem::take(&mut self.pending);
        for endorser in pending {
            if self.solution.is_some() {
                break;
            }
            if self.is_ready(&endorser) {
                self.endorse(&endorser)?;
            } else {
                self.pending.push(endorser);
            }
        }
        Ok(())
    }

    fn is_ready(&self, endorser: &Endorser) -> bool {
        endorser
            .inbounds
            .iter()
            .all(|c| self.accepted.contains_key(c))
    }

    /// Candidate bag: accepted once it is a potential maximal clique whose inbound components
    /// all have PTDs.
    fn offer(&mut self, bag: BitSet) -> Result<()> {
        if bag.cardinality() > self.width + 1 || self.offered.contains(&bag) {
            return Ok(());
        }
        self.offered.insert(bag.clone());
        self.candidates += 1;
        if let Some(limit) = self.config.candidate_limit {
            if self.candidates > limit {
                return Err(TreewidthError::ResourceExhausted {
                    width: self.width,
                    candidates: self.candidates,
                });
            }
        }
        if !self.graph.is_pot_max_clique(&bag) {
            return Ok(());
        }

        let components = self.graph.components_and_neighbors(&bag);
        // separators of outbound components are nested, the largest one faces the root
        let graph = &mut self.graph;
        let outbound_separator = components
            .iter()
            .filter(|c| graph.outbound_component(&c.neighbors).as_ref() == Some(&c.vertices))
            .map(|c| c.neighbors.clone())
            .max_by_key(|separator| separator.cardinality());
        let inbounds = components
            .into_iter()
            .filter(|c| match &outbound_separator {
                Some(separator) => !c.neighbors.is_subset_of(separator),
                None => true,
            })
            .map(|c| c.vertices)
            .collect();
        let endorser = Endorser {
            bag,
            inbounds,
            outbound_separator,
        };
        if self.is_ready(&endorser) {
            self.endorse(&endorser)
        } else {
            self.pending.push(endorser);
            Ok(())
        }
    }

    fn endorse(&mut self, endorser: &Endorser) -> Result<()> {
        let children = endorser
            .inbounds
            .iter()
            .filter_map(|c| self.accepted.get(c).cloned())
            .collect();
        let ptd = self.graph.finish(endorser.bag.clone(), children);
        match &endorser.outbound_separator {
            None => {
                if !ptd.outlet.is_empty() {
                    return Err(TreewidthError::inconsistent(format!(
                        "root bag {:?} leaves {:?} unresolved",
                        ptd.bag, ptd.outlet
                    )));
                }
                self.solution = Some(Rc::new(ptd));
            }
            Some(separator) => {
                if self.accepted.contains_key(&ptd.inlet) {
                    return Ok(());
                }
                if &ptd.outlet != separator {
                    return Err(TreewidthError::inconsistent(format!(
                        "bag {:?} has outlet {:?} instead of {:?}",
                        ptd.bag, ptd.outlet, separator
                    )));
                }
                if !ptd.is_possibly_usable(self.width) {
                    return Ok(());
                }
                trace!("accepted {:?}", ptd);
                let ptd = Rc::new(ptd);
                self.accepted.insert(ptd.inlet.clone(), Rc::clone(&ptd));
                self.frontier.push_back(ptd);
            }
        }
        Ok(())
    }

    fn process(&mut self, ptd: &Rc<Ptd>) -> Result<()> {
        let separator = &ptd.outlet;
        if self.separators.insert(separator.clone()) {
            let open = self.graph.outbound_component(separator).ok_or_else(|| {
                TreewidthError::inconsistent(format!(
                    "outlet {:?} of an accepted PTD is not a minimal separator",
                    separator
                ))
            })?;
            let ptdur = self.graph.open_toward(Ptd::root_from_child(ptd), &open);
            self.register(ptdur)?;
        }

        let matches: Vec<Rc<Ptd>> = self
            .sieve
            .query(&ptd.inlet, &ptd.outlet, 1)
            .cloned()
            .collect();
        let mut fresh = Vec::new();
        for ptdur in matches {
            let joined = Ptd::append_child(&ptdur, ptd, &self.graph);
            let mut full = self.graph.full_components(&joined.bag);
            match full.len() {
                0 => self.offer(joined.bag)?,
                1 if joined.bag.cardinality() <= self.width
                    && !self.separators.contains(&joined.bag) =>
                {
                    self.separators.insert(joined.bag.clone());
                    if let Some(open) = full.pop() {
                        fresh.push(self.graph.open_toward(joined, &open));
                    }
                }
                _ => {}
            }
            if self.solution.is_some() {
                return Ok(());
            }
        }
        for ptdur in fresh {
            self.register(ptdur)?;
        }
        Ok(())
    }

    /// Stores a PTDUR and offers the bags its extensions produce.
    fn register(&mut self, ptdur: Ptd) -> Result<()> {
        let ptdur = Rc::new(ptdur);
        if !self.sieve.add(Rc::clone(&ptdur))?.stored() {
            return Ok(());
        }

        let bag_vertices = ptdur.bag.to_vec();
        for v in bag_vertices.iter().copied() {
            let augmented = Ptd::extend_via_bag_augment(&ptdur, v, &self.graph);
            self.offer(augmented.bag)?;
        }

        if let Some(first) = bag_vertices.first().copied() {
            let mut open = self.graph.open_neighborhood(first).clone();
            open.and_not(&ptdur.inlet);
            open.and_not(&ptdur.bag);
            for v in open.iter().collect::<Vec<_>>() {
                if ptdur.bag.is_subset_of(self.graph.closed_neighborhood(v)) {
                    let extended = Ptd::extend_via_vertex(&ptdur, v, &self.graph);
                    self.offer(extended.bag)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::EditableGraph;
    use crate::solver::{Solver, UpperboundHeuristicType};
    use rand::prelude::*;
    use std::cmp::max;

    fn frozen(n: usize, edges: &[(usize, usize)]) -> (FrozenGraph, Vec<usize>) {
        EditableGraph::from_edges(n, edges).reduce()
    }

    fn treewidth(n: usize, edges: &[(usize, usize)]) -> usize {
        let (graph, reindex) = frozen(n, edges);
        let check = EditableGraph::from_edges(n, edges);
        let mut search = TreewidthSearch::new(graph);
        let (width, ptd) = search.decompose(0).unwrap();
        let td = ptd.to_tree_decomposition(&reindex);
        assert_eq!(td.verify(&check), Ok(()));
        assert_eq!(td.width(), width);
        width
    }

    fn cycle(n: usize) -> Vec<(usize, usize)> {
        (0..n).map(|i| (i, (i + 1) % n)).collect()
    }

    fn grid(rows: usize, cols: usize) -> Vec<(usize, usize)> {
        let mut edges = vec![];
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
        edges
    }

    #[test]
    fn small_graphs() {
        assert_eq!(treewidth(1, &[]), 0);
        assert_eq!(treewidth(2, &[(0, 1)]), 1);
        assert_eq!(treewidth(4, &[(0, 1), (1, 2), (2, 3)]), 1);
        assert_eq!(treewidth(6, &cycle(6)), 2);
        let k5: Vec<_> = (0..5)
            .flat_map(|u| (u + 1..5).map(move |v| (u, v)))
            .collect();
        assert_eq!(treewidth(5, &k5), 4);
    }

    #[test]
    fn reference_graph() {
        let edges = [
            (0, 1),
            (0, 2),
            (1, 2),
            (1, 3),
            (1, 4),
            (2, 3),
            (2, 4),
            (3, 4),
            (4, 5),
        ];
        assert_eq!(treewidth(6, &edges), 3);
    }

    #[test]
    fn grids() {
        assert_eq!(treewidth(9, &grid(3, 3)), 3);
        assert_eq!(treewidth(12, &grid(3, 4)), 3);
        assert_eq!(treewidth(16, &grid(4, 4)), 4);
    }

    #[test]
    fn widths_below_treewidth_are_infeasible() {
        let (graph, _) = frozen(9, &grid(3, 3));
        let mut search = TreewidthSearch::new(graph);
        for width in 0..3 {
            assert!(matches!(search.decide(width), Ok(WidthOutcome::Infeasible)));
        }
        assert!(matches!(search.decide(3), Ok(WidthOutcome::Feasible(_))));
        assert!(search.accepted() > 0);
        assert!(search.graph().cache_sizes().1 > 0);
    }

    #[test]
    fn bounded_search_gives_up_quietly() {
        let (graph, _) = frozen(9, &grid(3, 3));
        let mut search = TreewidthSearch::new(graph);
        assert!(search.search(0, 3).unwrap().is_none());
    }

    #[test]
    fn candidate_limit() {
        let (graph, _) = frozen(16, &grid(4, 4));
        let config = SearchConfig::default().candidate_limit(Some(3));
        let mut search = TreewidthSearch::with_config(graph, config);
        match search.decompose(0) {
            Err(TreewidthError::ResourceExhausted { candidates, .. }) => assert_eq!(candidates, 4),
            other => panic!("unexpected {:?}", other.map(|(w, _)| w)),
        }
    }

    #[test]
    fn tiny_sieve_nodes_agree() {
        let edges = grid(4, 4);
        let (graph, _) = frozen(16, &edges);
        let config = SearchConfig::default().sieve_capacity(2);
        let mut search = TreewidthSearch::with_config(graph, config);
        assert_eq!(search.decompose(0).unwrap().0, 4);
    }

    #[test]
    fn outbound_side_with_largest_separator() {
        // {1, 3, 5} has outbound components {0} for {1} and {2} for {1, 3}
        let edges = [(0, 1), (1, 2), (2, 3), (1, 4), (3, 5), (1, 3), (1, 5)];
        assert_eq!(treewidth(6, &edges), 2);
    }

    /// Treewidth by the recurrence TW(S) = min over v in S of max(TW(S - v), |Q(S - v, v)|),
    /// where Q(S, v) are the vertices outside S reachable from v through S.
    fn subset_treewidth(n: usize, edges: &[(usize, usize)]) -> usize {
        let mut adjacency = vec![0u32; n];
        for (u, v) in edges {
            adjacency[*u] |= 1 << *v;
            adjacency[*v] |= 1 << *u;
        }
        let q = |set: u32, v: usize| {
            let mut reached = 1u32 << v;
            let mut frontier = reached;
            let mut outside = 0u32;
            while frontier != 0 {
                let w = frontier.trailing_zeros() as usize;
                frontier &= frontier - 1;
                let fresh = adjacency[w] & !reached;
                reached |= fresh;
                outside |= fresh & !set;
                frontier |= fresh & set;
            }
            outside.count_ones() as usize
        };
        let mut tw = vec![0usize; 1 << n];
        for set in 1..(1u32 << n) {
            tw[set as usize] = (0..n)
                .filter(|v| set & (1 << *v) != 0)
                .map(|v| {
                    let rest = set & !(1 << v);
                    max(tw[rest as usize], q(rest, v))
                })
                .min()
                .unwrap();
        }
        tw[(1 << n) - 1]
    }

    /// Random spanning tree plus independent extra edges.
    fn random_connected(rng: &mut StdRng, n: usize, p: f64) -> Vec<(usize, usize)> {
        let mut edges: Vec<_> = (1..n).map(|v| (rng.gen_range(0..v), v)).collect();
        for u in 0..n {
            for v in u + 1..n {
                if rng.gen_bool(p) {
                    edges.push((u, v));
                }
            }
        }
        edges
    }

    #[test]
    fn matches_subset_recurrence() {
        let mut rng = StdRng::seed_from_u64(17);
        for _ in 0..200 {
            let n = rng.gen_range(1..=10);
            let p = *[0.1, 0.25, 0.4, 0.6].choose(&mut rng).unwrap();
            let edges = random_connected(&mut rng, n, p);
            let expected = subset_treewidth(n, &edges);
            assert_eq!(treewidth(n, &edges), expected, "{} {:?}", n, edges);

            let graph = EditableGraph::from_edges(n, &edges);
            let solvers = [
                Solver::plain(),
                Solver::default(),
                Solver::default().upperbound_heuristic(Some(UpperboundHeuristicType::MinFill)),
            ];
            for solver in solvers.iter() {
                let result = solver.solve(&graph).unwrap();
                assert_eq!(result.width, expected, "{:?} {} {:?}", solver, n, edges);
                assert_eq!(result.tree_decomposition.verify(&graph), Ok(()));
            }
        }
    }
}
