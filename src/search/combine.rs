// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use super::normal::find_normal_route;
use super::SearchContext;
use crate::results::{ResultHandle, Results};
use crate::types::Score;
use log::debug;

/// Expands a coarse route (a chain of super-nodes from
/// [find_middle_route](super::middle::find_middle_route)) into a full
/// route over real segments, by re-running the local search between each
/// consecutive pair and splicing the sub-legs together with accumulated
/// score offsets.
///
/// Returns None when some sub-leg cannot be re-found, which means the
/// super graph promises a connection the normal layer does not deliver.
pub(crate) fn combine_routes(ctx: &SearchContext, middle: &Results) -> Option<Results> {
    let mut combined = Results::new(middle.start_node, middle.prev_segment, 256);

    let origin = combined.insert(middle.start_node, middle.prev_segment);
    combined.get_mut(origin).score = 0.0;

    let mut last_handle = origin;
    let mut offset: Score = 0.0;
    let mut prev_seg = middle.prev_segment;

    let chain: Vec<_> = middle.route().map(|r| r.node).collect();
    debug_assert!(chain.len() >= 2);

    for pair in chain.windows(2) {
        let (from, to) = (pair[0], pair[1]);
        let sub = find_normal_route(ctx, from, prev_seg, to, false)?;

        let mut leg_score = 0.0;
        for r in sub.route().skip(1) {
            let handle = match combined.find(r.node, r.segment) {
                Some(h) => h,
                None => combined.insert(r.node, r.segment),
            };
            let entry = combined.get_mut(handle);
            entry.score = offset + r.score;
            entry.prev = Some(last_handle);
            combined.get_mut(last_handle).next = Some(handle);
            last_handle = handle;
            leg_score = r.score;
        }

        offset += leg_score;
        prev_seg = sub.last_segment;
    }

    combined.finish_node = middle.finish_node;
    combined.last_segment = prev_seg;
    debug!(
        "combined route {} -> {}: score {}, {} results",
        combined.start_node,
        combined.finish_node,
        offset,
        combined.len()
    );
    Some(combined)
}

/// Turns the backward `prev` chain ending at `finish_handle` into forward
/// `next` links from the starting entry, and records the finish node and
/// its arrival segment on the results.
///
/// Panics if the chain contains a cycle, as that means the search
/// corrupted its own results.
pub(crate) fn fix_forward_route(results: &mut Results, finish_handle: ResultHandle) {
    let finish = *results.get(finish_handle);
    results.finish_node = finish.node;
    results.last_segment = finish.segment;

    let mut current = finish_handle;
    let mut steps = 0usize;
    while let Some(prev) = results.get(current).prev {
        results.get_mut(prev).next = Some(current);
        current = prev;
        steps += 1;
        assert!(steps <= results.len(), "route chain contains a cycle");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NO_SEGMENT;

    #[test]
    fn test_fix_forward_route() {
        let mut results = Results::new(1, NO_SEGMENT, 8);
        let a = results.insert(1, NO_SEGMENT);
        let b = results.insert(2, 0);
        let c = results.insert(3, 1);
        // a dead-end side branch that must not get a next link
        let d = results.insert(4, 2);
        results.get_mut(b).prev = Some(a);
        results.get_mut(c).prev = Some(b);
        results.get_mut(d).prev = Some(a);

        fix_forward_route(&mut results, c);

        assert_eq!(results.finish_node, 3);
        assert_eq!(results.last_segment, 1);
        assert_eq!(results.get(a).next, Some(b));
        assert_eq!(results.get(b).next, Some(c));
        assert_eq!(results.get(c).next, None);
        assert_eq!(results.get(d).next, None);

        let nodes: Vec<_> = results.route().map(|r| r.node).collect();
        assert_eq!(nodes, vec![1, 2, 3]);
    }

    #[test]
    #[should_panic(expected = "cycle")]
    fn test_fix_forward_route_detects_cycles() {
        let mut results = Results::new(1, NO_SEGMENT, 8);
        let a = results.insert(1, NO_SEGMENT);
        let b = results.insert(2, 0);
        results.get_mut(a).prev = Some(b);
        results.get_mut(b).prev = Some(a);
        fix_forward_route(&mut results, b);
    }
}
