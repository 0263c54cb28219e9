//! Bounded top-K selector.
//!
//! Retains the `k` highest-scoring candidates from a stream of arbitrary length
//! using a min-heap of size `k`: O(k) memory, O(log k) per offer.
//!
//! Ties are resolved in favour of the candidate offered first. A full selector
//! only admits a candidate whose score is strictly greater than the current
//! minimum, and when several retained entries share that minimum the most
//! recently offered one is evicted.

use ordered_float::OrderedFloat;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::num::NonZeroUsize;

/// Upper bound on up-front heap allocation; larger selectors grow on demand.
const PREALLOC_LIMIT: usize = 4096;

struct Entry<T> {
    score: OrderedFloat<f64>,
    seq: u64,
    item: T,
}

// Ordered by score; among equal scores a later offer compares as smaller,
// so it sits nearer the top of the min-heap and is evicted first.
impl<T> Ord for Entry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .cmp(&other.score)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl<T> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T> Eq for Entry<T> {}

/// Size-bounded selector keeping the `k` best-scoring items.
pub struct TopK<T> {
    capacity: usize,
    next_seq: u64,
    heap: BinaryHeap<Reverse<Entry<T>>>,
}

impl<T> TopK<T> {
    /// Creates an empty selector holding at most `k` items.
    pub fn new(k: NonZeroUsize) -> Self {
        let capacity = k.get();
        Self {
            capacity,
            next_seq: 0,
            heap: BinaryHeap::with_capacity(capacity.min(PREALLOC_LIMIT)),
        }
    }

    /// Maximum number of items retained.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of items currently retained.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Returns `true` if nothing has been retained.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Lowest retained score, if any.
    pub fn min_score(&self) -> Option<f64> {
        self.heap.peek().map(|Reverse(e)| e.score.0)
    }

    /// Offers a candidate. Returns `true` if it was retained.
    ///
    /// A NaN score ranks below every real score and is reported as `-inf`.
    pub fn offer(&mut self, item: T, score: f64) -> bool {
        let score = if score.is_nan() { f64::NEG_INFINITY } else { score };
        let entry = Entry {
            score: OrderedFloat(score),
            seq: self.next_seq,
            item,
        };
        self.next_seq += 1;

        if self.heap.len() < self.capacity {
            self.heap.push(Reverse(entry));
            return true;
        }
        match self.heap.peek_mut() {
            Some(mut min) if entry.score > min.0.score => {
                *min = Reverse(entry);
                true
            }
            _ => false,
        }
    }

    /// Removes every retained item, returned in ascending score order.
    ///
    /// Equal scores come out most-recent-offer first, so reversing the result
    /// yields descending scores with earlier offers ahead of later ones.
    pub fn drain(&mut self) -> Vec<(T, f64)> {
        let mut out = Vec::with_capacity(self.heap.len());
        while let Some(Reverse(entry)) = self.heap.pop() {
            out.push((entry.item, entry.score.0));
        }
        out
    }

    /// Consumes the selector, returning items in descending score order.
    pub fn into_sorted_desc(mut self) -> Vec<(T, f64)> {
        let mut out = self.drain();
        out.reverse();
        out
    }
}
