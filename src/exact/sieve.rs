use crate::datastructures::BitSet;
use crate::error::{Result, TreewidthError};
use crate::exact::Ptd;
use std::rc::Rc;

/// Outcome of inserting a candidate into a sieve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insertion {
    Added,
    /// An equivalent candidate with a larger bag was replaced.
    Replaced,
    /// An equivalent candidate with a bag no larger than the new one is already stored.
    Dominated,
}

impl Insertion {
    pub fn stored(self) -> bool {
        self != Insertion::Dominated
    }
}

enum Next {
    Node(Box<Node>),
    Leaf(Rc<Ptd>),
}

struct Child {
    pattern: BitSet,
    next: Next,
}

/// Children of a node have pairwise distinct patterns on `[from, to)`. Intervals along a path
/// from the root partition `[0, n)`, and leaves only hang below nodes with `to == n`.
struct Node {
    from: usize,
    to: usize,
    children: Vec<Child>,
}

impl Node {
    fn new(from: usize, to: usize) -> Self {
        Self {
            from,
            to,
            children: Vec::new(),
        }
    }
}

/// Index of root-lifted PTDs keyed by the vertices they resolve.
///
/// A stored candidate matches a query when the query's inlet avoids everything the candidate
/// resolves and the union of the candidate bag with the query outlet fits into `width + 1`
/// vertices. Subtrees are pruned as soon as either condition fails on the interval of a node,
/// the latter against `margin`, the largest slack any candidate of this sieve has.
pub struct BlockSieve {
    root: Node,
    n: usize,
    width: usize,
    margin: usize,
    ignore: BitSet,
    capacity: usize,
    size: usize,
}

impl BlockSieve {
    pub const DEFAULT_CAPACITY: usize = 32;

    pub fn new(n: usize, width: usize, margin: usize, ignore: BitSet) -> Self {
        Self::with_capacity(n, width, margin, ignore, Self::DEFAULT_CAPACITY)
    }

    pub fn with_capacity(
        n: usize,
        width: usize,
        margin: usize,
        ignore: BitSet,
        capacity: usize,
    ) -> Self {
        Self {
            root: Node::new(0, n),
            n,
            width,
            margin,
            ignore,
            capacity: capacity.max(2),
            size: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    fn key(&self, ptd: &Ptd) -> BitSet {
        let mut key = ptd.resolved();
        key.and_not(&self.ignore);
        key
    }

    pub fn add(&mut self, ptd: Rc<Ptd>) -> Result<Insertion> {
        let key = self.key(&ptd);
        let result = Self::insert(&mut self.root, key, ptd, self.n, self.capacity)?;
        if result == Insertion::Added {
            self.size += 1;
        }
        Ok(result)
    }

    fn insert(
        node: &mut Node,
        key: BitSet,
        ptd: Rc<Ptd>,
        n: usize,
        capacity: usize,
    ) -> Result<Insertion> {
        let (from, to) = (node.from, node.to);
        let position = node
            .children
            .iter()
            .position(|c| c.pattern.equals_on_interval(&key, from, to));
        match position {
            None => {
                let next = if to == n {
                    Next::Leaf(ptd)
                } else {
                    let mut path = Node::new(to, n);
                    path.children.push(Child {
                        pattern: key.clone(),
                        next: Next::Leaf(ptd),
                    });
                    Next::Node(Box::new(path))
                };
                node.children.push(Child { pattern: key, next });
                Self::split(node, capacity);
                Ok(Insertion::Added)
            }
            Some(i) => match &mut node.children[i].next {
                Next::Node(child) => Self::insert(child, key, ptd, n, capacity),
                Next::Leaf(existing) => {
                    if ptd.bag.is_superset_of(&existing.bag) {
                        Ok(Insertion::Dominated)
                    } else if ptd.bag.is_subset_of(&existing.bag) {
                        *existing = ptd;
                        Ok(Insertion::Replaced)
                    } else {
                        Err(TreewidthError::inconsistent(format!(
                            "incomparable bags {:?} and {:?} resolve the same vertices",
                            existing.bag, ptd.bag
                        )))
                    }
                }
            },
        }
    }

    /// Halves the interval of an overfull node and regroups its children by their patterns on
    /// the lower half.
    fn split(node: &mut Node, capacity: usize) {
        if node.children.len() <= capacity || node.to - node.from < 2 {
            return;
        }
        let (from, to) = (node.from, node.to);
        let mid = (from + to) / 2;
        let mut groups: Vec<Child> = Vec::new();
        for child in std::mem::take(&mut node.children) {
            let group = groups
                .iter()
                .position(|g| g.pattern.equals_on_interval(&child.pattern, from, mid));
            match group {
                Some(j) => {
                    if let Next::Node(group) = &mut groups[j].next {
                        group.children.push(child);
                    }
                }
                None => {
                    let mut group = Node::new(mid, to);
                    let pattern = child.pattern.clone();
                    group.children.push(child);
                    groups.push(Child {
                        pattern,
                        next: Next::Node(Box::new(group)),
                    });
                }
            }
        }
        for group in groups.iter_mut() {
            if let Next::Node(group) = &mut group.next {
                Self::split(group, capacity);
            }
        }
        node.to = mid;
        node.children = groups;
        Self::split(node, capacity);
    }

    /// Candidates compatible with a PTD of the given inlet and outlet.
    pub fn query<'a>(&'a self, inlet: &'a BitSet, outlet: &'a BitSet) -> Query<'a> {
        let mut reduced_inlet = inlet.clone();
        reduced_inlet.and_not(&self.ignore);
        let mut reduced_outlet = outlet.clone();
        reduced_outlet.and_not(&self.ignore);
        Query {
            sieve: self,
            inlet,
            outlet,
            reduced_inlet,
            reduced_outlet,
            stack: vec![(&self.root, 0, 0)],
        }
    }
}

pub struct Query<'a> {
    sieve: &'a BlockSieve,
    inlet: &'a BitSet,
    outlet: &'a BitSet,
    reduced_inlet: BitSet,
    reduced_outlet: BitSet,
    stack: Vec<(&'a Node, usize, usize)>,
}

impl<'a> Iterator for Query<'a> {
    type Item = &'a Rc<Ptd>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((node, idx, acc)) = self.stack.pop() {
            if idx >= node.children.len() {
                continue;
            }
            self.stack.push((node, idx + 1, acc));
            let child = &node.children[idx];
            if !child
                .pattern
                .is_disjoint_on_interval(&self.reduced_inlet, node.from, node.to)
            {
                continue;
            }
            let acc = acc
                + self
                    .reduced_outlet
                    .count_on_interval_except(&child.pattern, node.from, node.to);
            if acc > self.sieve.margin {
                continue;
            }
            match &child.next {
                Next::Node(next) => self.stack.push((next.as_ref(), 0, acc)),
                Next::Leaf(ptd) => {
                    if ptd.resolved().is_disjoint_with(self.inlet)
                        && BitSet::count_union(&ptd.bag, self.outlet) <= self.sieve.width + 1
                    {
                        return Some(ptd);
                    }
                }
            }
        }
        None
    }
}

fn bit_length(x: usize) -> usize {
    (usize::BITS - x.leading_zeros()) as usize
}

/// Block sieves bucketed by slack: bucket `i` stores candidates whose margin
/// `width + 1 - |bag|` has bit length `i` and prunes against `2^i - 1`.
pub struct LayeredSieve {
    width: usize,
    sieves: Vec<BlockSieve>,
}

impl LayeredSieve {
    pub fn new(n: usize, width: usize, ignore: BitSet) -> Self {
        Self::with_capacity(n, width, ignore, BlockSieve::DEFAULT_CAPACITY)
    }

    pub fn with_capacity(n: usize, width: usize, ignore: BitSet, capacity: usize) -> Self {
        let sieves = (0..=bit_length(width + 1))
            .map(|i| {
                let margin = (1 << i) - 1;
                BlockSieve::with_capacity(n, width, margin, ignore.clone(), capacity)
            })
            .collect();
        Self { width, sieves }
    }

    pub fn add(&mut self, ptd: Rc<Ptd>) -> Result<Insertion> {
        let size = ptd.bag.cardinality();
        if size > self.width + 1 {
            return Err(TreewidthError::inconsistent(format!(
                "candidate bag of size {} exceeds width {}",
                size, self.width
            )));
        }
        let margin = self.width + 1 - size;
        self.sieves[bit_length(margin)].add(ptd)
    }

    /// Compatible candidates with margin at least `min_margin`, probing the buckets from the
    /// largest slack down to the one holding `min_margin`.
    pub fn query<'a>(
        &'a self,
        inlet: &'a BitSet,
        outlet: &'a BitSet,
        min_margin: usize,
    ) -> impl Iterator<Item = &'a Rc<Ptd>> + 'a {
        let lowest = bit_length(min_margin).min(self.sieves.len());
        let width = self.width;
        self.sieves[lowest..]
            .iter()
            .rev()
            .flat_map(move |sieve| sieve.query(inlet, outlet))
            // the lowest bucket also holds margins just below `min_margin`
            .filter(move |ptd| ptd.bag.cardinality() + min_margin <= width + 1)
    }

    pub fn len(&self) -> usize {
        self.sieves.iter().map(|s| s.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::prelude::*;

    fn random_set(rng: &mut StdRng, n: usize, p: f64) -> BitSet {
        let mut set = BitSet::new(n);
        for v in 0..n {
            if rng.gen_bool(p) {
                set.set_bit(v);
            }
        }
        set
    }

    /// Random PTDURs over `n` vertices with bag size at most `width + 1` and distinct resolved
    /// sets.
    fn random_ptdurs(rng: &mut StdRng, n: usize, width: usize, count: usize) -> Vec<Rc<Ptd>> {
        let mut seen = std::collections::HashSet::new();
        let mut ptdurs = Vec::new();
        while ptdurs.len() < count {
            let mut bag = random_set(rng, n, 0.1);
            while bag.cardinality() > width + 1 {
                let first = bag.get_first_set().unwrap();
                bag.unset_bit(first);
            }
            let mut inlet = random_set(rng, n, 0.3);
            inlet.and_not(&bag);
            let mut resolved = inlet.clone();
            resolved.or(&bag);
            if !seen.insert(resolved) {
                continue;
            }
            ptdurs.push(Rc::new(Ptd {
                outlet: bag.clone(),
                bag,
                inlet,
                children: vec![],
            }));
        }
        ptdurs
    }

    fn compatible(stored: &Ptd, inlet: &BitSet, outlet: &BitSet, width: usize) -> bool {
        stored.resolved().is_disjoint_with(inlet)
            && BitSet::count_union(&stored.bag, outlet) <= width + 1
    }

    fn check_against_linear_scan(n: usize, width: usize, capacity: usize, seed: u64) {
        let mut rng = StdRng::seed_from_u64(seed);
        let ptdurs = random_ptdurs(&mut rng, n, width, 300);
        let mut sieve = LayeredSieve::with_capacity(n, width, BitSet::new(n), capacity);
        for ptd in &ptdurs {
            assert_eq!(sieve.add(Rc::clone(ptd)).unwrap(), Insertion::Added);
        }
        assert_eq!(sieve.len(), ptdurs.len());

        for _ in 0..100 {
            let mut inlet = random_set(&mut rng, n, 0.15);
            let mut outlet = random_set(&mut rng, n, 0.08);
            outlet.and_not(&inlet);
            if rng.gen_bool(0.5) {
                inlet.unset_all();
            }
            let mut expected: Vec<BitSet> = ptdurs
                .iter()
                .filter(|p| compatible(p, &inlet, &outlet, width))
                .map(|p| p.resolved())
                .collect();
            let mut found: Vec<BitSet> = sieve
                .query(&inlet, &outlet, 0)
                .map(|p| {
                    assert!(compatible(p, &inlet, &outlet, width));
                    p.resolved()
                })
                .collect();
            expected.sort();
            found.sort();
            assert_eq!(found, expected);
        }
    }

    #[test]
    fn matches_linear_scan() {
        check_against_linear_scan(40, 5, BlockSieve::DEFAULT_CAPACITY, 1);
    }

    #[test]
    fn matches_linear_scan_with_deep_splits() {
        check_against_linear_scan(130, 9, 2, 7);
    }

    #[test]
    fn minimum_margin_is_exact() {
        let n = 8;
        let mut sieve = LayeredSieve::new(n, 4, BitSet::new(n));
        for bag in [&[0, 1, 2, 3][..], &[4, 5, 6], &[7]].iter() {
            let bag = BitSet::from_slice(n, bag);
            let ptdur = Ptd {
                outlet: bag.clone(),
                bag,
                inlet: BitSet::new(n),
                children: vec![],
            };
            assert_eq!(sieve.add(Rc::new(ptdur)).unwrap(), Insertion::Added);
        }
        let empty = BitSet::new(n);
        let sizes = |min_margin: usize| {
            let mut sizes: Vec<usize> = sieve
                .query(&empty, &empty, min_margin)
                .map(|p| p.bag.cardinality())
                .collect();
            sizes.sort_unstable();
            sizes
        };
        assert_eq!(sizes(0), vec![1, 3, 4]);
        assert_eq!(sizes(1), vec![1, 3, 4]);
        assert_eq!(sizes(2), vec![1, 3]);
        // margins 2 and 3 share a bucket
        assert_eq!(sizes(3), vec![1]);
        assert_eq!(sizes(4), vec![1]);
        assert!(sizes(5).is_empty());
    }

    #[test]
    fn smaller_bag_wins() {
        let n = 8;
        let ignore = BitSet::from_slice(n, &[7]);
        let mut sieve = BlockSieve::new(n, 4, 7, ignore);
        let ptdur = |bag: &[usize], inlet: &[usize]| {
            Rc::new(Ptd {
                bag: BitSet::from_slice(n, bag),
                inlet: BitSet::from_slice(n, inlet),
                outlet: BitSet::from_slice(n, bag),
                children: vec![],
            })
        };
        assert_eq!(sieve.add(ptdur(&[2, 3], &[0, 1])).unwrap(), Insertion::Added);
        assert_eq!(sieve.add(ptdur(&[1, 2, 3], &[0])).unwrap(), Insertion::Dominated);
        assert_eq!(sieve.add(ptdur(&[3], &[0, 1, 2])).unwrap(), Insertion::Replaced);
        // ignored vertices do not take part in the key
        assert_eq!(sieve.add(ptdur(&[3, 7], &[0, 1, 2])).unwrap(), Insertion::Dominated);
        assert!(sieve.add(ptdur(&[2], &[0, 1, 3])).is_err());
        assert_eq!(sieve.len(), 1);

        let inlet = BitSet::from_slice(n, &[5]);
        let outlet = BitSet::from_slice(n, &[3, 4]);
        let found: Vec<_> = sieve.query(&inlet, &outlet).collect();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].bag.to_vec(), vec![3]);
        let blocked = BitSet::from_slice(n, &[1]);
        assert_eq!(sieve.query(&blocked, &outlet).count(), 0);
    }
}
