use crate::datastructures::{BitSet, BitSetIterator};
use crate::graph::base_graph::BaseGraph;
use crate::graph::frozen_graph::FrozenGraph;
use crate::graph::mutable_graph::MutableGraph;
use std::cmp::min;

/// Graph over the fixed id space `0..capacity` with a set of live vertices.
///
/// Removed vertices keep their id but lose all edges, so subgraphs and reduced graphs can be
/// related back to the input without translation tables.
#[derive(Clone, Debug)]
pub struct EditableGraph {
    adjacency: Vec<BitSet>,
    live: BitSet,
}

impl EditableGraph {
    pub fn new(capacity: usize) -> Self {
        Self {
            adjacency: vec![BitSet::new(capacity); capacity],
            live: BitSet::new_all_set(capacity),
        }
    }

    pub fn from_edges(capacity: usize, edges: &[(usize, usize)]) -> Self {
        let mut graph = Self::new(capacity);
        for (u, v) in edges {
            graph.add_edge(*u, *v);
        }
        graph
    }

    pub fn capacity(&self) -> usize {
        self.adjacency.len()
    }

    pub fn live_vertices(&self) -> &BitSet {
        &self.live
    }

    pub fn neighborhood_set(&self, u: usize) -> &BitSet {
        &self.adjacency[u]
    }

    pub fn closed_neighborhood(&self, u: usize) -> BitSet {
        let mut closed = self.adjacency[u].clone();
        closed.set_bit(u);
        closed
    }

    pub fn edge_count(&self) -> usize {
        self.live
            .iter()
            .map(|v| self.adjacency[v].cardinality())
            .sum::<usize>()
            / 2
    }

    pub fn edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.live.iter().flat_map(move |u| {
            self.adjacency[u]
                .iter()
                .filter(move |v| u < *v)
                .map(move |v| (u, v))
        })
    }

    /// Subgraph induced by `vertices`, in the same id space.
    pub fn vertex_induced(&self, vertices: &BitSet) -> Self {
        let mut live = self.live.clone();
        live.and(vertices);
        let mut adjacency = vec![BitSet::new(self.capacity()); self.capacity()];
        for v in live.iter() {
            adjacency[v].or(&self.adjacency[v]);
            adjacency[v].and(&live);
        }
        Self { adjacency, live }
    }

    /// Connected components of the live graph minus `separator`, ordered by their smallest vertex.
    pub fn separate(&self, separator: &BitSet) -> Vec<BitSet> {
        let mut rest = self.live.clone();
        rest.and_not(separator);
        let mut components = Vec::new();
        while let Some(start) = rest.get_first_set() {
            let mut component = BitSet::new(self.capacity());
            component.set_bit(start);
            rest.unset_bit(start);
            let mut frontier = component.clone();
            while !frontier.is_empty() {
                let mut next = BitSet::new(self.capacity());
                for v in frontier.drain() {
                    next.or(&self.adjacency[v]);
                }
                next.and(&rest);
                rest.and_not(&next);
                component.or(&next);
                frontier = next;
            }
            components.push(component);
        }
        components
    }

    pub fn connected_components(&self) -> Vec<BitSet> {
        self.separate(&BitSet::new(self.capacity()))
    }

    /// Articulation point of the component holding the smallest live vertex.
    pub fn find_cut_vertex(&self) -> Option<usize> {
        let root = self.live.get_first_set()?;
        let n = self.capacity();
        let mut discovered = vec![usize::MAX; n];
        let mut low = vec![0; n];
        let mut parent = vec![usize::MAX; n];
        discovered[root] = 0;
        let mut counter = 1;
        let mut root_children = 0;
        let mut stack: Vec<(usize, BitSetIterator<'_>)> = vec![(root, self.adjacency[root].iter())];
        loop {
            let (v, next) = match stack.last_mut() {
                Some((v, neighbors)) => (*v, neighbors.next()),
                None => break,
            };
            match next {
                Some(w) if discovered[w] == usize::MAX => {
                    parent[w] = v;
                    discovered[w] = counter;
                    low[w] = counter;
                    counter += 1;
                    if v == root {
                        root_children += 1;
                    }
                    stack.push((w, self.adjacency[w].iter()));
                }
                Some(w) => {
                    if w != parent[v] {
                        low[v] = min(low[v], discovered[w]);
                    }
                }
                None => {
                    stack.pop();
                    if let Some((p, _)) = stack.last() {
                        let p = *p;
                        low[p] = min(low[p], low[v]);
                        if p != root && low[v] >= discovered[p] {
                            return Some(p);
                        }
                    }
                }
            }
        }
        if root_children > 1 {
            Some(root)
        } else {
            None
        }
    }

    /// Finds a clique minimal separator with MCS-M followed by the atom scan over the minimal
    /// triangulation it produces (Berry, Pogorelcnik, Simonet).
    pub fn find_clique_minimal_separator(&self) -> Option<BitSet> {
        let order = self.order();
        if order < 3 {
            return None;
        }
        let n = self.capacity();
        let mut unnumbered = self.live.clone();
        let mut labels = vec![0usize; n];
        let mut triangulated = self.adjacency.clone();
        let mut alpha = Vec::with_capacity(order);
        let mut generators = BitSet::new(n);
        let mut previous_label: Option<usize> = None;

        for _ in 0..order {
            let x = unnumbered.iter().max_by(|a, b| {
                labels[*a].cmp(&labels[*b]).then_with(|| b.cmp(a))
            })?;
            if matches!(previous_label, Some(p) if labels[x] <= p) {
                generators.set_bit(x);
            }
            previous_label = Some(labels[x]);
            unnumbered.unset_bit(x);

            let mut reached = BitSet::new(n);
            reached.set_bit(x);
            let mut reach: Vec<Vec<usize>> = vec![Vec::new(); order];
            let mut y = BitSet::new(n);
            for w in self.adjacency[x].iter().filter(|w| unnumbered[*w]) {
                reached.set_bit(w);
                y.set_bit(w);
                reach[labels[w]].push(w);
            }
            for j in 0..order {
                while let Some(r) = reach[j].pop() {
                    for z in self.adjacency[r].iter() {
                        if !unnumbered[z] || reached.set_bit(z) {
                            continue;
                        }
                        if labels[z] > j {
                            y.set_bit(z);
                            reach[labels[z]].push(z);
                        } else {
                            reach[j].push(z);
                        }
                    }
                }
            }
            for w in y.iter() {
                triangulated[x].set_bit(w);
                triangulated[w].set_bit(x);
                labels[w] += 1;
            }
            alpha.push(x);
        }

        let mut remaining = self.live.clone();
        for x in alpha.iter().rev().copied() {
            remaining.unset_bit(x);
            if !generators[x] {
                continue;
            }
            let mut separator = triangulated[x].clone();
            separator.and(&remaining);
            let vertices = separator.to_vec();
            if !vertices.is_empty()
                && self.is_clique(&vertices)
                && self.separate(&separator).len() > 1
            {
                return Some(separator);
            }
        }
        None
    }

    /// Compacts the live vertices into `0..order()` and freezes the result.
    ///
    /// The returned vector maps each dense id back to its id in this graph.
    pub fn reduce(&self) -> (FrozenGraph, Vec<usize>) {
        let reindex: Vec<usize> = self.live.iter().collect();
        let mut dense = vec![usize::MAX; self.capacity()];
        for (i, v) in reindex.iter().enumerate() {
            dense[*v] = i;
        }
        let open: Vec<BitSet> = reindex
            .iter()
            .map(|v| {
                let mut nb = BitSet::new(reindex.len());
                for u in self.adjacency[*v].iter() {
                    nb.set_bit(dense[u]);
                }
                nb
            })
            .collect();
        (FrozenGraph::new(open), reindex)
    }
}

impl BaseGraph for EditableGraph {
    fn degree(&self, u: usize) -> usize {
        self.adjacency[u].cardinality()
    }

    fn order(&self) -> usize {
        self.live.cardinality()
    }

    fn has_vertex(&self, u: usize) -> bool {
        u < self.capacity() && self.live[u]
    }

    fn has_edge(&self, u: usize, v: usize) -> bool {
        self.adjacency[u][v]
    }

    fn vertices(&self) -> Box<dyn Iterator<Item = usize> + '_> {
        Box::new(self.live.iter())
    }

    fn neighborhood(&self, u: usize) -> Box<dyn Iterator<Item = usize> + '_> {
        Box::new(self.adjacency[u].iter())
    }

    fn is_simplicial(&self, u: usize) -> bool {
        self.adjacency[u].iter().all(|v| {
            let mut rest = self.adjacency[u].clone();
            rest.and_not(&self.adjacency[v]);
            rest.unset_bit(v);
            rest.is_empty()
        })
    }

    fn fill_in_count(&self, u: usize) -> usize {
        let nb = &self.adjacency[u];
        let degree = nb.cardinality();
        let present: usize = nb
            .iter()
            .map(|v| {
                let mut common = nb.clone();
                common.and(&self.adjacency[v]);
                common.cardinality()
            })
            .sum::<usize>()
            / 2;
        degree * degree.saturating_sub(1) / 2 - present
    }
}

impl MutableGraph for EditableGraph {
    fn remove_vertex(&mut self, u: usize) {
        let capacity = self.capacity();
        let nb = std::mem::replace(&mut self.adjacency[u], BitSet::new(capacity));
        for v in nb.iter() {
            self.adjacency[v].unset_bit(u);
        }
        self.live.unset_bit(u);
    }

    fn add_edge(&mut self, u: usize, v: usize) {
        if u == v || !self.live[u] || !self.live[v] {
            return;
        }
        self.adjacency[u].set_bit(v);
        self.adjacency[v].set_bit(u);
    }

    fn remove_edge(&mut self, u: usize, v: usize) {
        self.adjacency[u].unset_bit(v);
        self.adjacency[v].unset_bit(u);
    }

    fn eliminate_vertex(&mut self, u: usize) {
        let nb = self.adjacency[u].to_vec();
        self.make_clique(&nb);
        self.remove_vertex(u);
    }

    fn contract(&mut self, u: usize, v: usize) {
        let capacity = self.capacity();
        let mut nb = std::mem::replace(&mut self.adjacency[v], BitSet::new(capacity));
        for w in nb.drain() {
            self.adjacency[w].unset_bit(v);
            if w != u {
                self.adjacency[w].set_bit(u);
                self.adjacency[u].set_bit(w);
            }
        }
        self.live.unset_bit(v);
    }
}
