use std::fmt::Debug;

pub trait BaseGraph: Clone + Debug {
    fn degree(&self, u: usize) -> usize;
    /// Number of live vertices.
    fn order(&self) -> usize;
    fn has_vertex(&self, u: usize) -> bool;
    fn has_edge(&self, u: usize, v: usize) -> bool;
    fn vertices(&self) -> Box<dyn Iterator<Item = usize> + '_>;
    fn neighborhood(&self, u: usize) -> Box<dyn Iterator<Item = usize> + '_>;

    fn is_clique(&self, vertices: &[usize]) -> bool {
        vertices
            .iter()
            .enumerate()
            .all(|(i, u)| vertices[i + 1..].iter().all(|v| self.has_edge(*u, *v)))
    }

    fn is_simplicial(&self, u: usize) -> bool {
        let nb: Vec<_> = self.neighborhood(u).collect();
        self.is_clique(&nb)
    }

    /// Missing edges among the neighbours of `u`.
    fn fill_in_count(&self, u: usize) -> usize {
        let nb: Vec<_> = self.neighborhood(u).collect();
        nb.iter()
            .enumerate()
            .map(|(i, x)| nb[i + 1..].iter().filter(|y| !self.has_edge(*x, **y)).count())
            .sum()
    }
}
