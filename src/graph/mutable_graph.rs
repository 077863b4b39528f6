use crate::graph::base_graph::BaseGraph;

pub trait MutableGraph: BaseGraph {
    fn remove_vertex(&mut self, u: usize);
    fn add_edge(&mut self, u: usize, v: usize);
    fn remove_edge(&mut self, u: usize, v: usize);
    /// Turns the neighbourhood of `u` into a clique, then removes `u`.
    fn eliminate_vertex(&mut self, u: usize);
    /// Merges `v` into `u`; self loops and parallel edges are dropped.
    fn contract(&mut self, u: usize, v: usize);
    fn make_clique(&mut self, vertices: &[usize]) {
        for (i, v) in vertices.iter().enumerate() {
            for u in vertices.iter().skip(i + 1) {
                self.add_edge(*u, *v);
            }
        }
    }
}
