//! Max-heap of open k-intervals for the LogMeans search.
//!
//! An interval is a pair of indices into the [`MseHistory`]. Its priority is
//! `mse(left) / mse(right)`, read from the history on every comparison, so the
//! heap never holds a stale key.

use crate::dataset::MseHistory;

/// An unresolved interval, as indices into the history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Interval {
    pub left: usize,
    pub right: usize,
}

impl Interval {
    /// Steepness of the error drop across the interval.
    pub fn promise(&self, history: &MseHistory) -> f64 {
        history[self.left].1 / history[self.right].1
    }
}

/// Binary max-heap, 0-indexed: children of `i` are `2i + 1` and `2i + 2`.
#[derive(Debug, Default)]
pub(crate) struct IntervalHeap {
    slots: Vec<Interval>,
}

impl IntervalHeap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn gt(&self, a: usize, b: usize, history: &MseHistory) -> bool {
        self.slots[a].promise(history) > self.slots[b].promise(history)
    }

    pub fn push(&mut self, interval: Interval, history: &MseHistory) {
        self.slots.push(interval);

        // Sift up
        let mut i = self.slots.len() - 1;
        while i > 0 {
            let parent = (i - 1) / 2;
            if !self.gt(i, parent, history) {
                break;
            }
            self.slots.swap(i, parent);
            i = parent;
        }
    }

    /// Remove and return the most promising interval.
    pub fn pop(&mut self, history: &MseHistory) -> Option<Interval> {
        if self.slots.is_empty() {
            return None;
        }
        let top = self.slots.swap_remove(0);

        // Sift down
        let len = self.slots.len();
        let mut i = 0;
        loop {
            let left = 2 * i + 1;
            if left >= len {
                break;
            }
            let right = left + 1;
            let child = if right < len && self.gt(right, left, history) {
                right
            } else {
                left
            };
            if !self.gt(child, i, history) {
                break;
            }
            self.slots.swap(child, i);
            i = child;
        }

        Some(top)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iv(left: usize, right: usize) -> Interval {
        Interval { left, right }
    }

    #[test]
    fn test_pop_order_follows_promise() {
        // mse values at history indices 0..6
        let history: MseHistory = vec![(1, 64.0), (2, 32.0), (3, 30.0), (4, 10.0), (5, 9.0), (6, 1.0)];
        let mut heap = IntervalHeap::new();

        heap.push(iv(0, 1), &history); // 2.0
        heap.push(iv(1, 2), &history); // ~1.07
        heap.push(iv(2, 3), &history); // 3.0
        heap.push(iv(3, 4), &history); // ~1.11
        heap.push(iv(4, 5), &history); // 9.0
        assert_eq!(heap.len(), 5);

        let order: Vec<Interval> = std::iter::from_fn(|| heap.pop(&history)).collect();
        assert_eq!(order, vec![iv(4, 5), iv(2, 3), iv(0, 1), iv(3, 4), iv(1, 2)]);
        assert!(heap.is_empty());
    }

    #[test]
    fn test_keys_are_read_live() {
        let mut history: MseHistory = vec![(1, 4.0), (2, 2.0), (3, 1.0)];
        let mut heap = IntervalHeap::new();

        heap.push(iv(0, 1), &history); // 2.0
        heap.push(iv(1, 2), &history); // 2.0

        // Make the first interval steeper after it was pushed
        history[0].1 = 100.0;
        heap.push(iv(0, 2), &history); // 100.0

        assert_eq!(heap.pop(&history), Some(iv(0, 2)));
        assert_eq!(heap.pop(&history), Some(iv(0, 1)));
        assert_eq!(heap.pop(&history), Some(iv(1, 2)));
        assert_eq!(heap.pop(&history), None);
    }

    #[test]
    fn test_interleaved_push_pop() {
        let history: MseHistory = (0..20).map(|i| (i + 1, 1.0 + (i * 7 % 13) as f64)).collect();
        let mut heap = IntervalHeap::new();
        let mut popped = Vec::new();

        for i in 0..19 {
            heap.push(iv(i, i + 1), &history);
            if i % 3 == 2 {
                popped.push(heap.pop(&history).unwrap());
            }
        }
        while let Some(top) = heap.pop(&history) {
            popped.push(top);
        }

        assert_eq!(popped.len(), 19);
        // After the last push, pops come out in non-increasing order
        let tail = &popped[6..];
        for w in tail.windows(2) {
            assert!(w[0].promise(&history) >= w[1].promise(&history));
        }
    }
}
