use crate::datastructures::BitSet;
use crate::exact::Ptd;
use crate::graph::base_graph::BaseGraph;
use fxhash::FxHashMap;
use std::rc::Rc;

/// A connected piece of `G \ separator` together with its exact neighbourhood.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Component {
    pub vertices: BitSet,
    pub neighbors: BitSet,
}

impl Component {
    /// Full with respect to `separator`: adjacent to every separator vertex.
    pub fn is_full(&self, separator: &BitSet) -> bool {
        &self.neighbors == separator
    }
}

/// Immutable graph on the dense id space `0..n` used by the exact search.
///
/// Owns the memo tables of the predicates the search evaluates over and over. They are keyed by
/// the vertex set in question and live exactly as long as the graph.
#[derive(Clone, Debug)]
pub struct FrozenGraph {
    open: Vec<BitSet>,
    closed: Vec<BitSet>,
    all: BitSet,
    cliquish_cache: FxHashMap<BitSet, bool>,
    pmc_cache: FxHashMap<BitSet, bool>,
    outbound_cache: FxHashMap<BitSet, Option<BitSet>>,
}

impl FrozenGraph {
    /// `open[v]` must be symmetric and must not contain `v`.
    pub fn new(open: Vec<BitSet>) -> Self {
        let n = open.len();
        let closed = open
            .iter()
            .enumerate()
            .map(|(v, nb)| {
                let mut closed = nb.clone();
                closed.set_bit(v);
                closed
            })
            .collect();
        Self {
            open,
            closed,
            all: BitSet::new_all_set(n),
            cliquish_cache: FxHashMap::default(),
            pmc_cache: FxHashMap::default(),
            outbound_cache: FxHashMap::default(),
        }
    }

    #[inline]
    pub fn open_neighborhood(&self, v: usize) -> &BitSet {
        &self.open[v]
    }

    #[inline]
    pub fn closed_neighborhood(&self, v: usize) -> &BitSet {
        &self.closed[v]
    }

    #[inline]
    pub fn all_vertices(&self) -> &BitSet {
        &self.all
    }

    pub fn empty_set(&self) -> BitSet {
        BitSet::new(self.open.len())
    }

    /// Vertices adjacent to every other vertex.
    pub fn universal_vertices(&self) -> BitSet {
        let mut universal = self.empty_set();
        for (v, closed) in self.closed.iter().enumerate() {
            if closed.full() {
                universal.set_bit(v);
            }
        }
        universal
    }

    /// `N(set) \ set`.
    pub fn neighbors(&self, set: &BitSet) -> BitSet {
        let mut neighbors = self.empty_set();
        for v in set.iter() {
            neighbors.or(&self.open[v]);
        }
        neighbors.and_not(set);
        neighbors
    }

    /// Lazily floods the components of `G \ separator` in order of their smallest vertex.
    pub fn components<'a>(&'a self, separator: &'a BitSet) -> Components<'a> {
        let mut remaining = self.all.clone();
        remaining.and_not(separator);
        Components {
            graph: self,
            separator,
            remaining,
        }
    }

    pub fn components_and_neighbors(&self, separator: &BitSet) -> Vec<Component> {
        self.components(separator).collect()
    }

    pub fn full_components(&self, separator: &BitSet) -> Vec<BitSet> {
        self.components(separator)
            .filter(|c| c.is_full(separator))
            .map(|c| c.vertices)
            .collect()
    }

    pub fn is_minimal_separator(&self, separator: &BitSet) -> bool {
        self.components(separator)
            .filter(|c| c.is_full(separator))
            .nth(1)
            .is_some()
    }

    /// Components of `G \ separator` if it is a minimal separator.
    pub fn minimal_separator_components(&self, separator: &BitSet) -> Option<Vec<Component>> {
        let components = self.components_and_neighbors(separator);
        if components.iter().filter(|c| c.is_full(separator)).count() >= 2 {
            Some(components)
        } else {
            None
        }
    }

    /// Full component of `separator` holding the smallest vertex, provided `separator` is a
    /// minimal separator. A PTD with outlet `separator` never resolves this component.
    pub fn outbound_component(&mut self, separator: &BitSet) -> Option<BitSet> {
        if let Some(cached) = self.outbound_cache.get(separator) {
            return cached.clone();
        }
        let mut full = self.components(separator).filter(|c| c.is_full(separator));
        let outbound = match (full.next(), full.next()) {
            (Some(first), Some(_)) => Some(first.vertices),
            _ => None,
        };
        self.outbound_cache
            .insert(separator.clone(), outbound.clone());
        outbound
    }

    fn cliquish_against(&self, bag: &BitSet, neighborhoods: &[&BitSet]) -> bool {
        bag.iter().all(|v| {
            let mut missing = bag.clone();
            missing.and_not(&self.closed[v]);
            for nb in neighborhoods.iter().filter(|nb| nb.at(v)) {
                if missing.is_empty() {
                    break;
                }
                missing.and_not(nb);
            }
            missing.is_empty()
        })
    }

    /// Every non-adjacent pair of `bag` lies in the neighbourhood of a common component of
    /// `G \ bag`.
    pub fn is_cliquish(&mut self, bag: &BitSet) -> bool {
        if let Some(cached) = self.cliquish_cache.get(bag) {
            return *cached;
        }
        let components = self.components_and_neighbors(bag);
        let neighborhoods: Vec<&BitSet> = components.iter().map(|c| &c.neighbors).collect();
        let result = self.cliquish_against(bag, &neighborhoods);
        self.cliquish_cache.insert(bag.clone(), result);
        result
    }

    /// Potential maximal clique test: no full component and cliquish, from a single component
    /// scan.
    pub fn is_pot_max_clique(&mut self, bag: &BitSet) -> bool {
        if let Some(cached) = self.pmc_cache.get(bag) {
            return *cached;
        }
        if bag.is_empty() {
            return false;
        }
        let components = self.components_and_neighbors(bag);
        let result = if components.iter().any(|c| c.is_full(bag)) {
            false
        } else if let Some(cliquish) = self.cliquish_cache.get(bag).copied() {
            cliquish
        } else {
            let neighborhoods: Vec<&BitSet> = components.iter().map(|c| &c.neighbors).collect();
            let cliquish = self.cliquish_against(bag, &neighborhoods);
            self.cliquish_cache.insert(bag.clone(), cliquish);
            cliquish
        };
        self.pmc_cache.insert(bag.clone(), result);
        result
    }

    /// Vertices of `bag` with a neighbour outside `vertices`.
    pub fn outlet(&self, bag: &BitSet, vertices: &BitSet) -> BitSet {
        let mut outlet = self.empty_set();
        for v in bag.iter() {
            if !self.open[v].is_subset_of(vertices) {
                outlet.set_bit(v);
            }
        }
        outlet
    }

    /// Outlet of `bag` against everything `bag` and `inlets` resolve.
    pub fn union_outlet<'a>(
        &self,
        bag: &BitSet,
        inlets: impl Iterator<Item = &'a BitSet>,
    ) -> BitSet {
        let mut resolved = bag.clone();
        for inlet in inlets {
            resolved.or(inlet);
        }
        self.outlet(bag, &resolved)
    }

    /// Builds a PTD from its bag and children: everything the bag and the children's inlets
    /// resolve is split into the outlet and the new inlet.
    pub fn finish(&self, bag: BitSet, children: Vec<Rc<Ptd>>) -> Ptd {
        let mut resolved = bag.clone();
        for child in &children {
            resolved.or(&child.inlet);
        }
        let outlet = self.outlet(&bag, &resolved);
        resolved.and_not(&outlet);
        Ptd {
            bag,
            inlet: resolved,
            outlet,
            children,
        }
    }

    /// Re-anchors a root-lifted PTD on its open component: the bag becomes the outlet and every
    /// vertex outside `open` and the bag counts as resolved.
    pub fn open_toward(&self, ptdur: Ptd, open: &BitSet) -> Ptd {
        let mut inlet = self.all.clone();
        inlet.and_not(open);
        inlet.and_not(&ptdur.bag);
        Ptd {
            outlet: ptdur.bag.clone(),
            bag: ptdur.bag,
            inlet,
            children: ptdur.children,
        }
    }

    pub fn cache_sizes(&self) -> (usize, usize) {
        (self.cliquish_cache.len(), self.pmc_cache.len())
    }
}

pub struct Components<'a> {
    graph: &'a FrozenGraph,
    separator: &'a BitSet,
    remaining: BitSet,
}

impl<'a> Iterator for Components<'a> {
    type Item = Component;

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.remaining.get_first_set()?;
        self.remaining.unset_bit(start);
        let mut vertices = self.graph.empty_set();
        vertices.set_bit(start);
        let mut neighbors = self.graph.empty_set();
        let mut frontier = vertices.clone();
        while !frontier.is_empty() {
            let mut next = self.graph.empty_set();
            for v in frontier.drain() {
                next.or(&self.graph.open[v]);
            }
            neighbors.or(&next);
            next.and(&self.remaining);
            self.remaining.and_not(&next);
            vertices.or(&next);
            frontier = next;
        }
        neighbors.and(self.separator);
        Some(Component {
            vertices,
            neighbors,
        })
    }
}

impl BaseGraph for FrozenGraph {
    fn degree(&self, u: usize) -> usize {
        self.open[u].cardinality()
    }

    fn order(&self) -> usize {
        self.open.len()
    }

    fn has_vertex(&self, u: usize) -> bool {
        u < self.open.len()
    }

    fn has_edge(&self, u: usize, v: usize) -> bool {
        self.open[u][v]
    }

    fn vertices(&self) -> Box<dyn Iterator<Item = usize> + '_> {
        Box::new(0..self.open.len())
    }

    fn neighborhood(&self, u: usize) -> Box<dyn Iterator<Item = usize> + '_> {
        Box::new(self.open[u].iter())
    }
}
