// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use crate::types::{NodeIndex, Score, SegmentIndex, NO_NODE, NO_SEGMENT};

/// Handle of a [RouteResult] inside a [Results] store. Handles are stable
/// for the lifetime of the store, also across growth.
pub type ResultHandle = u32;

const EMPTY_SLOT: u32 = u32::MAX;

/// State of one visit during a route search: a node together with the
/// segment it was arrived by. The same node may appear several times
/// under different arrival segments, as turn restrictions and U-turn
/// rules can make the best continuation depend on the arrival direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteResult {
    pub node: NodeIndex,

    /// Arrival segment, or [NO_SEGMENT] for the starting point.
    pub segment: SegmentIndex,

    /// Best known predecessor on the path from the start.
    pub prev: Option<ResultHandle>,

    /// Successor on the final route; filled in only once a route has been
    /// chosen (or, in a backward search, points toward the finish).
    pub next: Option<ResultHandle>,

    /// Best known cumulative score from the start.
    pub score: Score,

    /// Queue ordering key: `score` plus an optional distance-to-go bound.
    pub sortby: Score,
}

/// The visits of one route search, keyed by `(node, segment)`.
///
/// Entries live in an insertion-ordered arena indexed by [ResultHandle];
/// an open-addressed hash table on top provides the key lookup. Entries
/// are never removed, only relaxed to better scores.
#[derive(Debug, Clone)]
pub struct Results {
    arena: Vec<RouteResult>,
    slots: Vec<u32>,

    pub start_node: NodeIndex,
    /// Segment the start node was arrived by (from a previous leg),
    /// or [NO_SEGMENT].
    pub prev_segment: SegmentIndex,
    /// Finish node, or [NO_NODE] while no route has been completed.
    pub finish_node: NodeIndex,
    /// Segment the finish node was arrived by, or [NO_SEGMENT].
    pub last_segment: SegmentIndex,
}

impl Results {
    pub fn new(start_node: NodeIndex, prev_segment: SegmentIndex, capacity_hint: usize) -> Self {
        let slots = (capacity_hint.max(8) * 2).next_power_of_two();
        Self {
            arena: Vec::with_capacity(capacity_hint),
            slots: vec![EMPTY_SLOT; slots],
            start_node,
            prev_segment,
            finish_node: NO_NODE,
            last_segment: NO_SEGMENT,
        }
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn get(&self, handle: ResultHandle) -> &RouteResult {
        &self.arena[handle as usize]
    }

    pub fn get_mut(&mut self, handle: ResultHandle) -> &mut RouteResult {
        &mut self.arena[handle as usize]
    }

    fn hash(node: NodeIndex, segment: SegmentIndex) -> usize {
        (node ^ segment.wrapping_shl(4)) as usize
    }

    /// Looks up the entry for `(node, segment)`.
    pub fn find(&self, node: NodeIndex, segment: SegmentIndex) -> Option<ResultHandle> {
        let mask = self.slots.len() - 1;
        let mut i = Self::hash(node, segment) & mask;
        loop {
            let slot = self.slots[i];
            if slot == EMPTY_SLOT {
                return None;
            }
            let r = &self.arena[slot as usize];
            if r.node == node && r.segment == segment {
                return Some(slot);
            }
            i = (i + 1) & mask;
        }
    }

    /// Inserts a fresh entry for `(node, segment)` with an infinite score
    /// and no links. The key must not be present yet.
    pub fn insert(&mut self, node: NodeIndex, segment: SegmentIndex) -> ResultHandle {
        debug_assert!(self.find(node, segment).is_none());

        // Keep occupancy under 50% so probe runs stay short.
        if (self.arena.len() + 1) * 2 > self.slots.len() {
            self.grow();
        }

        let handle = self.arena.len() as ResultHandle;
        self.arena.push(RouteResult {
            node,
            segment,
            prev: None,
            next: None,
            score: Score::INFINITY,
            sortby: Score::INFINITY,
        });
        self.place(handle, node, segment);
        handle
    }

    fn place(&mut self, handle: ResultHandle, node: NodeIndex, segment: SegmentIndex) {
        let mask = self.slots.len() - 1;
        let mut i = Self::hash(node, segment) & mask;
        while self.slots[i] != EMPTY_SLOT {
            i = (i + 1) & mask;
        }
        self.slots[i] = handle;
    }

    fn grow(&mut self) {
        self.slots = vec![EMPTY_SLOT; self.slots.len() * 2];
        for handle in 0..self.arena.len() as ResultHandle {
            let r = self.arena[handle as usize];
            self.place(handle, r.node, r.segment);
        }
    }

    /// Iterates over all entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (ResultHandle, &RouteResult)> {
        self.arena
            .iter()
            .enumerate()
            .map(|(i, r)| (i as ResultHandle, r))
    }

    /// Walks the route along the `next` links, starting from the first
    /// inserted entry (the search origin). The origin is always yielded;
    /// entries beyond it follow only once a completed route has filled in
    /// the `next` links.
    pub fn route(&self) -> RouteIter<'_> {
        RouteIter {
            results: self,
            cur: if self.arena.is_empty() { None } else { Some(0) },
        }
    }
}

/// Iterator over the entries of a completed route. See [Results::route].
#[derive(Debug, Clone)]
pub struct RouteIter<'a> {
    results: &'a Results,
    cur: Option<ResultHandle>,
}

impl<'a> Iterator for RouteIter<'a> {
    type Item = &'a RouteResult;

    fn next(&mut self) -> Option<&'a RouteResult> {
        let handle = self.cur?;
        let r = self.results.get(handle);
        self.cur = r.next;
        Some(r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_find() {
        let mut results = Results::new(1, NO_SEGMENT, 4);
        let a = results.insert(1, NO_SEGMENT);
        let b = results.insert(2, 10);
        let c = results.insert(2, 11);

        assert_eq!(results.find(1, NO_SEGMENT), Some(a));
        assert_eq!(results.find(2, 10), Some(b));
        assert_eq!(results.find(2, 11), Some(c));
        assert_eq!(results.find(2, 12), None);
        assert_eq!(results.find(3, 10), None);

        assert_eq!(results.get(b).score, Score::INFINITY);
        results.get_mut(b).score = 1.5;
        assert_eq!(results.get(b).score, 1.5);
    }

    #[test]
    fn test_handles_stable_across_growth() {
        let mut results = Results::new(0, NO_SEGMENT, 4);
        let mut handles = Vec::new();
        for i in 0..1000u32 {
            handles.push(results.insert(i, i * 7));
        }
        for (i, &h) in handles.iter().enumerate() {
            let i = i as u32;
            assert_eq!(results.find(i, i * 7), Some(h));
            assert_eq!(results.get(h).node, i);
        }
        assert_eq!(results.len(), 1000);
    }

    #[test]
    fn test_insertion_order_iteration() {
        let mut results = Results::new(5, NO_SEGMENT, 4);
        results.insert(5, NO_SEGMENT);
        results.insert(3, 0);
        results.insert(9, 1);
        let nodes: Vec<_> = results.iter().map(|(_, r)| r.node).collect();
        assert_eq!(nodes, vec![5, 3, 9]);
    }

    #[test]
    fn test_route_walk() {
        let mut results = Results::new(1, NO_SEGMENT, 4);
        let a = results.insert(1, NO_SEGMENT);
        let b = results.insert(2, 0);
        let c = results.insert(3, 1);
        results.get_mut(a).next = Some(b);
        results.get_mut(b).next = Some(c);

        let nodes: Vec<_> = results.route().map(|r| r.node).collect();
        assert_eq!(nodes, vec![1, 2, 3]);
    }
}
