use bitvec::prelude::*;
use core::mem;
use std::cmp::Ordering;
use std::fmt;
use std::fmt::{Debug, Formatter};
use std::hash::{Hash, Hasher};
use std::ops::Index;

const fn block_size() -> usize {
    mem::size_of::<usize>() * 8
}

/// Yields `(word index, mask)` for every word touched by `[from, to)`.
#[inline]
fn interval_words(from: usize, to: usize) -> impl Iterator<Item = (usize, usize)> {
    let first = from / block_size();
    let last = if from < to {
        (to + block_size() - 1) / block_size()
    } else {
        first
    };
    (first..last).map(move |i| {
        let mut mask = usize::MAX;
        if i == first {
            mask &= usize::MAX << (from % block_size());
        }
        if i + 1 == last && to % block_size() != 0 {
            mask &= (1usize << (to % block_size())) - 1;
        }
        (i, mask)
    })
}

/// Fixed capacity set of `usize` backed by a packed bit vector.
///
/// Bits past `len()` in the last storage word are kept at zero by every operation, so word level
/// comparisons and hashing never observe padding.
#[derive(Clone, Default)]
pub struct BitSet {
    bit_vec: BitVec<usize, Lsb0>,
}

impl Ord for BitSet {
    fn cmp(&self, other: &Self) -> Ordering {
        self.len()
            .cmp(&other.len())
            .then_with(|| self.words().cmp(other.words()))
    }
}

impl PartialOrd for BitSet {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Debug for BitSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl PartialEq for BitSet {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.words() == other.words()
    }
}
impl Eq for BitSet {}

impl Hash for BitSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.words().hash(state)
    }
}

impl BitSet {
    #[inline]
    pub fn new(size: usize) -> Self {
        Self {
            bit_vec: BitVec::repeat(false, size),
        }
    }

    pub fn from_slice(size: usize, slice: &[usize]) -> Self {
        let mut set = Self::new(size);
        for v in slice {
            set.set_bit(*v);
        }
        set
    }

    #[inline]
    pub fn new_all_set(size: usize) -> Self {
        let mut set = Self::new(size);
        set.not();
        set
    }

    #[inline]
    fn words(&self) -> &[usize] {
        self.bit_vec.as_raw_slice()
    }

    #[inline]
    fn words_mut(&mut self) -> &mut [usize] {
        self.bit_vec.as_raw_mut_slice()
    }

    #[inline]
    fn clear_padding(&mut self) {
        let tail = self.len() % block_size();
        if tail != 0 {
            if let Some(last) = self.words_mut().last_mut() {
                *last &= (1usize << tail) - 1;
            }
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bit_vec.len()
    }

    #[inline]
    pub fn cardinality(&self) -> usize {
        self.words().iter().map(|w| w.count_ones() as usize).sum()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.words().iter().all(|w| *w == 0)
    }

    #[inline]
    pub fn full(&self) -> bool {
        self.cardinality() == self.len()
    }

    #[inline]
    pub fn at(&self, idx: usize) -> bool {
        self.bit_vec[idx]
    }

    /// Sets `idx` and reports whether it was already set.
    #[inline]
    pub fn set_bit(&mut self, idx: usize) -> bool {
        let was = self.bit_vec[idx];
        self.bit_vec.set(idx, true);
        was
    }

    /// Clears `idx` and reports whether it was set.
    #[inline]
    pub fn unset_bit(&mut self, idx: usize) -> bool {
        let was = self.bit_vec[idx];
        self.bit_vec.set(idx, false);
        was
    }

    #[inline]
    pub fn set(&mut self, idx: usize, value: bool) {
        self.bit_vec.set(idx, value);
    }

    #[inline]
    pub fn or(&mut self, other: &BitSet) {
        for (x, y) in self.words_mut().iter_mut().zip(other.words()) {
            *x |= y;
        }
    }

    #[inline]
    pub fn and(&mut self, other: &BitSet) {
        for (x, y) in self.words_mut().iter_mut().zip(other.words()) {
            *x &= y;
        }
    }

    #[inline]
    pub fn and_not(&mut self, other: &BitSet) {
        for (x, y) in self.words_mut().iter_mut().zip(other.words()) {
            *x &= !y;
        }
    }

    /// Complement with respect to `0..len()`.
    #[inline]
    pub fn not(&mut self) {
        self.words_mut().iter_mut().for_each(|x| *x = !*x);
        self.clear_padding();
    }

    /// Complements only the bits in `0..len`.
    pub fn flip(&mut self, len: usize) {
        let len = len.min(self.len());
        for (i, mask) in interval_words(0, len) {
            self.words_mut()[i] ^= mask;
        }
    }

    #[inline]
    pub fn unset_all(&mut self) {
        self.words_mut().iter_mut().for_each(|x| *x = 0);
    }

    #[inline]
    pub fn is_disjoint_with(&self, other: &BitSet) -> bool {
        self.words()
            .iter()
            .zip(other.words())
            .fold(0, |acc, (x, y)| acc | (x & y))
            == 0
    }

    #[inline]
    pub fn intersects_with(&self, other: &BitSet) -> bool {
        !self.is_disjoint_with(other)
    }

    #[inline]
    pub fn is_subset_of(&self, other: &BitSet) -> bool {
        self.words()
            .iter()
            .zip(other.words())
            .fold(0, |acc, (x, y)| acc | (x & !y))
            == 0
    }

    #[inline]
    pub fn is_superset_of(&self, other: &BitSet) -> bool {
        other.is_subset_of(self)
    }

    pub fn equals_on_interval(&self, other: &BitSet, from: usize, to: usize) -> bool {
        interval_words(from, to)
            .all(|(i, mask)| (self.words()[i] ^ other.words()[i]) & mask == 0)
    }

    pub fn is_disjoint_on_interval(&self, other: &BitSet, from: usize, to: usize) -> bool {
        interval_words(from, to).all(|(i, mask)| self.words()[i] & other.words()[i] & mask == 0)
    }

    /// Number of elements of `self \ other` inside `[from, to)`.
    pub fn count_on_interval_except(&self, other: &BitSet, from: usize, to: usize) -> usize {
        interval_words(from, to)
            .map(|(i, mask)| (self.words()[i] & !other.words()[i] & mask).count_ones() as usize)
            .sum()
    }

    /// `|a ∪ b|` without building the union.
    pub fn count_union(a: &BitSet, b: &BitSet) -> usize {
        a.words()
            .iter()
            .zip(b.words())
            .map(|(x, y)| (x | y).count_ones() as usize)
            .sum()
    }

    #[inline]
    pub fn get_first_set(&self) -> Option<usize> {
        self.get_next_set(0)
    }

    #[inline]
    pub fn get_next_set(&self, idx: usize) -> Option<usize> {
        if idx >= self.len() {
            return None;
        }
        let words = self.words();
        let mut block_idx = idx / block_size();
        let mut block = words[block_idx] & (usize::MAX << (idx % block_size()));
        while block == 0 {
            block_idx += 1;
            block = *words.get(block_idx)?;
        }
        Some(block_idx * block_size() + block.trailing_zeros() as usize)
    }

    #[inline]
    pub fn to_vec(&self) -> Vec<usize> {
        self.iter().collect()
    }

    #[inline]
    pub fn iter(&self) -> BitSetIterator<'_> {
        BitSetIterator {
            words: self.words(),
            block_idx: 0,
            block: self.words().first().copied().unwrap_or(0),
        }
    }

    /// Iterates the elements in increasing order while removing them from the set.
    #[inline]
    pub fn drain(&mut self) -> Drain<'_> {
        Drain {
            set: self,
            block_idx: 0,
        }
    }
}

pub struct BitSetIterator<'a> {
    words: &'a [usize],
    block_idx: usize,
    block: usize,
}

impl<'a> Iterator for BitSetIterator<'a> {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        while self.block == 0 {
            self.block_idx += 1;
            self.block = *self.words.get(self.block_idx)?;
        }
        let offset = self.block.trailing_zeros() as usize;
        self.block &= self.block - 1;
        Some(self.block_idx * block_size() + offset)
    }
}

pub struct Drain<'a> {
    set: &'a mut BitSet,
    block_idx: usize,
}

impl<'a> Iterator for Drain<'a> {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let words = self.set.words_mut();
        loop {
            let block = words.get_mut(self.block_idx)?;
            if *block == 0 {
                self.block_idx += 1;
                continue;
            }
            let offset = block.trailing_zeros() as usize;
            *block &= *block - 1;
            return Some(self.block_idx * block_size() + offset);
        }
    }
}

impl Index<usize> for BitSet {
    type Output = bool;

    #[inline]
    fn index(&self, index: usize) -> &Self::Output {
        if self.bit_vec[index] {
            &true
        } else {
            &false
        }
    }
}
