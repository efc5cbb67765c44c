//! Dense sets of small integers.
//!
//! Dominator sets and reachability are computed over blocks numbered by their position in
//! the CFG's block order. One bit per block keeps every set operation of the iterative
//! dominator fixpoint at O(blocks / 64).
//!
//! # Example
//!
//! ```rust
//! use tacopt::utils::BitSet;
//!
//! let mut dom = BitSet::full(4);
//! let pred = BitSet::from_indices(4, [0, 2]);
//!
//! assert!(dom.intersect_with(&pred));
//! assert_eq!(dom.iter().collect::<Vec<_>>(), vec![0, 2]);
//! ```

const WORD: usize = u64::BITS as usize;

/// A fixed-capacity set of indices in `0..capacity()`.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct BitSet {
    words: Vec<u64>,
    capacity: usize,
}

impl BitSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            words: vec![0; capacity.div_ceil(WORD)],
            capacity,
        }
    }

    /// Creates a set holding every index below `capacity`.
    #[must_use]
    pub fn full(capacity: usize) -> Self {
        let mut words = vec![u64::MAX; capacity.div_ceil(WORD)];
        let tail = capacity % WORD;
        if tail != 0 {
            if let Some(last) = words.last_mut() {
                *last = (1 << tail) - 1;
            }
        }
        Self { words, capacity }
    }

    /// Creates a set holding exactly `indices`.
    ///
    /// # Panics
    ///
    /// Panics if an index is not below `capacity`.
    #[must_use]
    pub fn from_indices(capacity: usize, indices: impl IntoIterator<Item = usize>) -> Self {
        let mut set = Self::new(capacity);
        for index in indices {
            set.insert(index);
        }
        set
    }

    /// Returns the number of indices the set can hold.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns `true` if no index is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Adds `index` to the set.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not below the capacity.
    pub fn insert(&mut self, index: usize) {
        assert!(index < self.capacity, "index {index} out of range");
        self.words[index / WORD] |= 1 << (index % WORD);
    }

    /// Returns `true` if `index` is in the set. Indices beyond the capacity never are.
    #[must_use]
    pub fn contains(&self, index: usize) -> bool {
        index < self.capacity && self.words[index / WORD] & (1 << (index % WORD)) != 0
    }

    /// Returns the number of indices in the set.
    #[must_use]
    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Adds every index of `other`. Returns `true` if the set grew.
    pub fn union_with(&mut self, other: &Self) -> bool {
        self.combine(other, |a, b| a | b)
    }

    /// Keeps only the indices also in `other`. Returns `true` if the set shrank.
    pub fn intersect_with(&mut self, other: &Self) -> bool {
        self.combine(other, |a, b| a & b)
    }

    fn combine(&mut self, other: &Self, op: impl Fn(u64, u64) -> u64) -> bool {
        assert_eq!(self.capacity, other.capacity, "bit sets of different capacity");
        let mut changed = false;
        for (a, &b) in self.words.iter_mut().zip(&other.words) {
            let next = op(*a, b);
            changed |= next != *a;
            *a = next;
        }
        changed
    }

    /// Iterates over the indices in ascending order.
    pub fn iter(&self) -> BitSetIter<'_> {
        BitSetIter {
            words: &self.words,
            base: 0,
            current: self.words.first().copied().unwrap_or(0),
        }
    }
}

impl std::fmt::Debug for BitSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Ascending iterator over the indices of a [`BitSet`].
pub struct BitSetIter<'a> {
    words: &'a [u64],
    base: usize,
    current: u64,
}

impl Iterator for BitSetIter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        while self.current == 0 {
            self.base += WORD;
            self.current = *self.words.get(self.base / WORD)?;
        }
        let bit = self.current.trailing_zeros() as usize;
        self.current &= self.current - 1;
        Some(self.base + bit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_contains() {
        let mut set = BitSet::new(130);
        assert!(set.is_empty());

        set.insert(0);
        set.insert(64);
        set.insert(129);

        assert_eq!(set.count(), 3);
        assert!(set.contains(64));
        assert!(!set.contains(63));
        assert!(!set.contains(500));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![0, 64, 129]);
    }

    #[test]
    fn test_full_clears_tail() {
        let set = BitSet::full(65);
        assert_eq!(set.count(), 65);
        assert_eq!(set.iter().last(), Some(64));
        assert!(BitSet::full(0).is_empty());
    }

    #[test]
    fn test_union_reports_growth() {
        let mut a = BitSet::from_indices(10, [1, 2]);
        assert!(a.union_with(&BitSet::from_indices(10, [2, 7])));
        assert!(!a.union_with(&BitSet::from_indices(10, [7])));
        assert_eq!(a, BitSet::from_indices(10, [1, 2, 7]));
    }

    #[test]
    fn test_intersect_reports_shrink() {
        let mut a = BitSet::from_indices(8, [1, 3, 5]);
        assert!(a.intersect_with(&BitSet::from_indices(8, [3, 5, 6])));
        assert!(!a.intersect_with(&BitSet::full(8)));
        assert_eq!(format!("{a:?}"), "{3, 5}");
    }

    #[test]
    fn test_iter_empty_words() {
        let set = BitSet::from_indices(300, [257]);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![257]);
        assert_eq!(BitSet::new(0).iter().next(), None);
    }
}
