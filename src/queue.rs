// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use crate::results::ResultHandle;
use crate::types::Score;
use std::collections::BinaryHeap;

/// An entry of the [Queue]. The ordering is reversed (and extended over
/// all floats with `total_cmp`) to turn std's max-heap into a min-heap;
/// ties are broken by insertion sequence, earlier first, so a search
/// visits equal-priority entries in a deterministic order.
#[derive(Debug, Clone, Copy)]
struct QueueItem {
    sortby: Score,
    score: Score,
    handle: ResultHandle,
    seq: u64,
}

impl PartialEq for QueueItem {
    fn eq(&self, other: &Self) -> bool {
        self.sortby.total_cmp(&other.sortby).is_eq() && self.seq == other.seq
    }
}

impl Eq for QueueItem {}

impl PartialOrd for QueueItem {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueItem {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other
            .sortby
            .total_cmp(&self.sortby)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Priority queue of pending [Results](crate::results::Results) handles,
/// ordered by ascending `sortby` key.
///
/// Entries are not updated in place: relaxing a result pushes a new entry,
/// and the stale one is recognized on pop by its out-of-date score.
#[derive(Debug, Clone, Default)]
pub struct Queue {
    heap: BinaryHeap<QueueItem>,
    seq: u64,
}

impl Queue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, handle: ResultHandle, score: Score, sortby: Score) {
        self.heap.push(QueueItem {
            sortby,
            score,
            handle,
            seq: self.seq,
        });
        self.seq += 1;
    }

    /// Pops the entry with the lowest `sortby` key, returning its handle
    /// and the score it was pushed with.
    pub fn pop(&mut self) -> Option<(ResultHandle, Score)> {
        self.heap.pop().map(|item| (item.handle, item.score))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pops_in_ascending_order() {
        let mut q = Queue::new();
        q.push(0, 3.0, 3.0);
        q.push(1, 1.0, 1.0);
        q.push(2, 2.0, 2.0);

        assert_eq!(q.pop(), Some((1, 1.0)));
        assert_eq!(q.pop(), Some((2, 2.0)));
        assert_eq!(q.pop(), Some((0, 3.0)));
        assert_eq!(q.pop(), None);
    }

    #[test]
    fn test_ties_pop_in_insertion_order() {
        let mut q = Queue::new();
        for handle in 0..10 {
            q.push(handle, 1.0, 1.0);
        }
        for handle in 0..10 {
            assert_eq!(q.pop(), Some((handle, 1.0)));
        }
    }

    #[test]
    fn test_sortby_decides_not_score() {
        let mut q = Queue::new();
        q.push(0, 1.0, 5.0);
        q.push(1, 4.0, 4.5);
        assert_eq!(q.pop(), Some((1, 4.0)));
        assert_eq!(q.pop(), Some((0, 1.0)));
    }
}
