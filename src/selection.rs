//! Top-K thread selection.
//!
//! One bounded-heap routine serves both directions: the heap keeps the K
//! best entries seen so far with the worst on top, so each candidate costs
//! O(log K) and the whole scan O(N log K) instead of sorting every thread.
//!
//! # Example
//!
//! ```
//! use firststory::selection::{SizeOrder, TopKSelector};
//! use firststory::clustering::TopicThread;
//! use firststory::vector::SparseVector;
//!
//! let mut big = TopicThread::new(1);
//! big.add(2, &SparseVector::new([1, 2]), 0.1);
//! let small = TopicThread::new(3);
//!
//! let selector = TopKSelector::unfiltered(1);
//! let top = selector.select([&big, &small], SizeOrder::Largest);
//! assert_eq!(top[0].parent(), 1);
//! ```

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use crate::clustering::{ThreadSummary, TopicThread};
use crate::config::SelectionConfig;
use crate::vector::ItemId;

/// What the selector needs to know about a thread.
pub trait RankedThread {
    fn parent(&self) -> ItemId;
    fn size(&self) -> usize;
    fn entropy(&self) -> f64;
}

impl RankedThread for TopicThread {
    fn parent(&self) -> ItemId {
        TopicThread::parent(self)
    }

    fn size(&self) -> usize {
        TopicThread::size(self)
    }

    fn entropy(&self) -> f64 {
        TopicThread::entropy(self)
    }
}

impl RankedThread for ThreadSummary {
    fn parent(&self) -> ItemId {
        self.parent
    }

    fn size(&self) -> usize {
        self.size
    }

    fn entropy(&self) -> f64 {
        self.entropy
    }
}

impl<T: RankedThread + ?Sized> RankedThread for &T {
    fn parent(&self) -> ItemId {
        (**self).parent()
    }

    fn size(&self) -> usize {
        (**self).size()
    }

    fn entropy(&self) -> f64 {
        (**self).entropy()
    }
}

/// Which end of the size ranking to keep.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SizeOrder {
    /// The K largest threads, largest first.
    #[default]
    Largest,
    /// The K smallest threads, smallest first.
    Smallest,
}

impl SizeOrder {
    /// `Greater` means `a` ranks ahead of `b`. Equal sizes rank the lower
    /// parent ID first in both directions.
    fn rank(self, a: (usize, ItemId), b: (usize, ItemId)) -> Ordering {
        let by_size = match self {
            SizeOrder::Largest => a.0.cmp(&b.0),
            SizeOrder::Smallest => b.0.cmp(&a.0),
        };
        by_size.then_with(|| Reverse(a.1).cmp(&Reverse(b.1)))
    }
}

/// Heap entry ordered only by its rank key, so `T` needs no `Ord`.
/// Reversed so that `BinaryHeap` (a max-heap) keeps the worst on top.
struct HeapEntry<T> {
    key: (usize, ItemId),
    order: SizeOrder,
    item: T,
}

impl<T> PartialEq for HeapEntry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl<T> Eq for HeapEntry<T> {}

impl<T> PartialOrd for HeapEntry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for HeapEntry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.order.rank(other.key, self.key)
    }
}

/// Filters threads by size and entropy and keeps the K best by size.
#[derive(Clone, Debug, PartialEq)]
pub struct TopKSelector {
    k: usize,
    min_size: usize,
    min_entropy: f64,
}

impl TopKSelector {
    pub fn new(k: usize, min_size: usize, min_entropy: f64) -> Self {
        Self {
            k,
            min_size,
            min_entropy,
        }
    }

    /// No size or entropy cutoff.
    pub fn unfiltered(k: usize) -> Self {
        Self::new(k, 0, f64::NEG_INFINITY)
    }

    /// Per-set selector from config.
    pub fn from_config(config: &SelectionConfig) -> Self {
        Self::new(config.top_k, config.min_size, config.min_entropy)
    }

    /// Leaderboard selector across sets; threads already passed the
    /// per-set cutoffs.
    pub fn global_from_config(config: &SelectionConfig) -> Self {
        Self::new(config.global_top_k, config.min_size, config.min_entropy)
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// Whether a thread passes both cutoffs. Size is checked first since
    /// entropy walks the whole histogram.
    pub fn qualifies<T: RankedThread>(&self, thread: &T) -> bool {
        thread.size() >= self.min_size && thread.entropy() >= self.min_entropy
    }

    /// Keep the K qualifying threads that rank highest under `order`,
    /// returned best first.
    pub fn select<T, I>(&self, threads: I, order: SizeOrder) -> Vec<T>
    where
        T: RankedThread,
        I: IntoIterator<Item = T>,
    {
        if self.k == 0 {
            return Vec::new();
        }

        let mut heap: BinaryHeap<HeapEntry<T>> = BinaryHeap::with_capacity(self.k + 1);
        for thread in threads {
            if !self.qualifies(&thread) {
                continue;
            }
            heap.push(HeapEntry {
                key: (thread.size(), thread.parent()),
                order,
                item: thread,
            });
            if heap.len() > self.k {
                heap.pop();
            }
        }

        // Ascending in heap order is best first.
        heap.into_sorted_vec()
            .into_iter()
            .map(|entry| entry.item)
            .collect()
    }
}

impl Default for TopKSelector {
    fn default() -> Self {
        Self::from_config(&SelectionConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(parent: ItemId, size: usize, entropy: f64) -> ThreadSummary {
        ThreadSummary {
            parent,
            size,
            entropy,
            members: Vec::new(),
        }
    }

    fn parents(threads: &[ThreadSummary]) -> Vec<ItemId> {
        threads.iter().map(|t| t.parent).collect()
    }

    #[test]
    fn test_largest_first() {
        let threads = vec![
            summary(1, 5, 3.0),
            summary(2, 50, 3.0),
            summary(3, 20, 3.0),
            summary(4, 40, 3.0),
        ];
        let top = TopKSelector::unfiltered(3).select(threads, SizeOrder::Largest);
        assert_eq!(parents(&top), vec![2, 4, 3]);
    }

    #[test]
    fn test_smallest_first() {
        let threads = vec![
            summary(1, 5, 3.0),
            summary(2, 50, 3.0),
            summary(3, 20, 3.0),
        ];
        let top = TopKSelector::unfiltered(2).select(threads, SizeOrder::Smallest);
        assert_eq!(parents(&top), vec![1, 3]);
    }

    #[test]
    fn test_ties_break_on_lower_parent() {
        let threads = vec![
            summary(9, 10, 3.0),
            summary(3, 10, 3.0),
            summary(5, 10, 3.0),
            summary(1, 2, 3.0),
        ];
        let top = TopKSelector::unfiltered(2).select(threads.clone(), SizeOrder::Largest);
        assert_eq!(parents(&top), vec![3, 5]);

        let top = TopKSelector::unfiltered(4).select(threads, SizeOrder::Smallest);
        assert_eq!(parents(&top), vec![1, 3, 5, 9]);
    }

    #[test]
    fn test_cutoffs_filter() {
        let threads = vec![
            summary(1, 100, 1.0), // spam: low entropy
            summary(2, 10, 3.5),  // too small
            summary(3, 40, 3.0),
            summary(4, 35, 2.7), // exactly at both cutoffs
        ];
        let selector = TopKSelector::new(10, 35, 2.7);
        let top = selector.select(threads, SizeOrder::Largest);
        assert_eq!(parents(&top), vec![3, 4]);
    }

    #[test]
    fn test_fewer_than_k() {
        let top = TopKSelector::unfiltered(10).select(vec![summary(1, 3, 0.0)], SizeOrder::Largest);
        assert_eq!(top.len(), 1);
        assert!(TopKSelector::unfiltered(0)
            .select(vec![summary(1, 3, 0.0)], SizeOrder::Largest)
            .is_empty());
    }

    #[test]
    fn test_select_over_references() {
        let threads = [summary(1, 4, 2.0), summary(2, 8, 2.0)];
        let top = TopKSelector::unfiltered(1).select(threads.iter(), SizeOrder::Largest);
        assert_eq!(top[0].parent, 2);
    }

    #[test]
    fn test_default_uses_config_cutoffs() {
        let selector = TopKSelector::default();
        assert_eq!(selector.k(), 10);
        assert!(!selector.qualifies(&summary(1, 34, 5.0)));
        assert!(!selector.qualifies(&summary(1, 100, 2.69)));
        assert!(selector.qualifies(&summary(1, 35, 2.7)));
    }

    #[test]
    fn test_select_keeps_exactly_what_qualifies() {
        let threads = vec![
            summary(1, 34, 9.0),
            summary(2, 35, 2.69),
            summary(3, 35, 2.7),
            summary(4, 80, 4.0),
        ];
        let selector = TopKSelector::default();
        let expected: Vec<ItemId> = threads
            .iter()
            .filter(|t| selector.qualifies(*t))
            .map(|t| t.parent)
            .collect();

        let mut selected = parents(&selector.select(threads, SizeOrder::Smallest));
        selected.sort_unstable();
        assert_eq!(selected, expected);
        assert_eq!(selected, vec![3, 4]);
    }
}
