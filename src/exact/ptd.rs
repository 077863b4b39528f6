use crate::datastructures::BitSet;
use crate::graph::FrozenGraph;
use crate::tree_decomposition::TreeDecomposition;
use std::fmt;
use std::fmt::{Debug, Formatter};
use std::rc::Rc;

/// Partial tree decomposition.
///
/// `inlet` holds the vertices resolved below the root bag, `outlet` the root bag vertices that
/// still have neighbours outside `bag ∪ inlet`. A root-lifted PTD (PTDUR) has `bag == outlet`.
/// Nodes are immutable once built and shared through `Rc`.
#[derive(Clone, PartialEq, Eq)]
pub struct Ptd {
    pub bag: BitSet,
    pub inlet: BitSet,
    pub outlet: BitSet,
    pub children: Vec<Rc<Ptd>>,
}

impl Debug for Ptd {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Ptd{{bag: {:?}, inlet: {:?}, outlet: {:?}, children: {}}}",
            self.bag,
            self.inlet,
            self.outlet,
            self.children.len()
        )
    }
}

impl Ptd {
    pub fn leaf(bag: BitSet, outlet: BitSet) -> Self {
        let mut inlet = bag.clone();
        inlet.and_not(&outlet);
        Self {
            bag,
            inlet,
            outlet,
            children: Vec::new(),
        }
    }

    pub fn root_from_child(child: &Rc<Ptd>) -> Self {
        Self {
            bag: child.outlet.clone(),
            inlet: child.inlet.clone(),
            outlet: child.outlet.clone(),
            children: vec![Rc::clone(child)],
        }
    }

    pub fn append_child(ptdur: &Ptd, child: &Rc<Ptd>, graph: &FrozenGraph) -> Self {
        let mut bag = ptdur.bag.clone();
        bag.or(&child.outlet);
        let mut children = ptdur.children.clone();
        children.push(Rc::clone(child));
        graph.finish(bag, children)
    }

    /// Replaces the bag by `N[v]`.
    pub fn extend_via_vertex(ptdur: &Ptd, v: usize, graph: &FrozenGraph) -> Self {
        graph.finish(
            graph.closed_neighborhood(v).clone(),
            ptdur.children.clone(),
        )
    }

    /// Adds the unresolved neighbours of the bag vertex `v`.
    pub fn extend_via_bag_augment(ptdur: &Ptd, v: usize, graph: &FrozenGraph) -> Self {
        debug_assert!(ptdur.bag.at(v));
        let mut bag = graph.open_neighborhood(v).clone();
        bag.and_not(&ptdur.inlet);
        bag.or(&ptdur.bag);
        graph.finish(bag, ptdur.children.clone())
    }

    pub fn width(&self) -> usize {
        self.bag.cardinality().saturating_sub(1)
    }

    pub fn is_possibly_usable(&self, k: usize) -> bool {
        if self.bag.cardinality() > k + 1 {
            return false;
        }
        let mut seen = BitSet::new(self.bag.len());
        for child in &self.children {
            if child.inlet.intersects_with(&seen) {
                return false;
            }
            seen.or(&child.inlet);
        }
        true
    }

    pub fn equivalent(&self, other: &Ptd) -> bool {
        self.inlet == other.inlet
    }

    /// Everything below or in the root bag.
    pub fn resolved(&self) -> BitSet {
        let mut resolved = self.inlet.clone();
        resolved.or(&self.bag);
        resolved
    }

    /// Expands the PTD into a tree decomposition, translating vertex ids through `reindex`.
    pub fn to_tree_decomposition(&self, reindex: &[usize]) -> TreeDecomposition {
        let mut td = TreeDecomposition::default();
        let root = td.add_bag(self.bag.iter().map(|v| reindex[v]).collect());
        let mut stack: Vec<(&Ptd, usize)> = vec![(self, root)];
        while let Some((node, id)) = stack.pop() {
            for child in &node.children {
                let child_id = td.add_bag(child.bag.iter().map(|v| reindex[v]).collect());
                td.add_edge(id, child_id);
                stack.push((child.as_ref(), child_id));
            }
        }
        td
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{EditableGraph, FrozenGraph};

    fn reference_graph() -> FrozenGraph {
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
        .reduce()
        .0
    }

    fn set(vertices: &[usize]) -> BitSet {
        BitSet::from_slice(6, vertices)
    }

    fn identity() -> Vec<usize> {
        (0..6).collect()
    }

    #[test]
    fn leaf_and_root() {
        let graph = reference_graph();
        let leaf = Rc::new(graph.finish(set(&[4, 5]), vec![]));
        assert_eq!(leaf.inlet.to_vec(), vec![5]);
        assert_eq!(leaf.outlet.to_vec(), vec![4]);
        assert_eq!(*leaf, Ptd::leaf(set(&[4, 5]), set(&[4])));

        let ptdur = Ptd::root_from_child(&leaf);
        assert_eq!(ptdur.bag, ptdur.outlet);
        assert!(ptdur.equivalent(&leaf));
        assert!(ptdur.is_possibly_usable(0));
    }

    #[test]
    fn combinators_recompute_inlet_and_outlet() {
        let graph = reference_graph();
        let left = Rc::new(graph.finish(set(&[0, 1, 2]), vec![]));
        assert_eq!(left.outlet.to_vec(), vec![1, 2]);
        let right = Rc::new(graph.finish(set(&[4, 5]), vec![]));

        let ptdur = Ptd::root_from_child(&left);
        let joined = Ptd::append_child(&ptdur, &right, &graph);
        assert_eq!(joined.bag.to_vec(), vec![1, 2, 4]);
        assert_eq!(joined.inlet.to_vec(), vec![0, 5]);
        assert_eq!(joined.outlet.to_vec(), vec![1, 2, 4]);
        assert!(joined.is_possibly_usable(2));
        assert!(!joined.is_possibly_usable(1));

        let augmented = Ptd::extend_via_bag_augment(&joined, 4, &graph);
        assert_eq!(augmented.bag.to_vec(), vec![1, 2, 3, 4]);
        assert!(augmented.outlet.is_empty());
        assert_eq!(augmented.resolved(), *graph.all_vertices());

        let around_three = Ptd::extend_via_vertex(&joined, 3, &graph);
        assert_eq!(around_three.bag.to_vec(), vec![1, 2, 3, 4]);
        assert_eq!(around_three.width(), 3);
    }

    #[test]
    fn overlapping_children_are_unusable() {
        let graph = reference_graph();
        let a = Rc::new(graph.finish(set(&[0, 1, 2]), vec![]));
        let ptdur = Ptd::root_from_child(&a);
        let twice = Ptd::append_child(&ptdur, &a, &graph);
        assert!(!twice.is_possibly_usable(5));
    }

    #[test]
    fn expands_to_valid_decomposition() {
        let graph = reference_graph();
        let left = Rc::new(graph.finish(set(&[0, 1, 2]), vec![]));
        let right = Rc::new(graph.finish(set(&[4, 5]), vec![]));
        let root = graph.finish(set(&[1, 2, 3, 4]), vec![left, right]);
        assert!(root.outlet.is_empty());
        let td = root.to_tree_decomposition(&identity());
        assert_eq!(td.bags().len(), 3);
        assert_eq!(td.width(), 3);
        assert_eq!(td.verify(&graph), Ok(()));
    }
}
