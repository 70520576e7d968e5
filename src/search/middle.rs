// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use super::combine::fix_forward_route;
use super::{Cancelled, SearchContext, PROGRESS_INTERVAL};
use crate::queue::Queue;
use crate::results::{ResultHandle, Results};
use crate::types::{NodeIndex, Score, SegmentIndex, NO_SEGMENT};
use log::debug;
use std::collections::HashMap;

/// Searches the super graph from the `begin` frontier to the `end`
/// frontier. `direct_score` is the score of the best purely-local route
/// (if one was found); a coarse route is only returned when it is
/// strictly better.
///
/// The queue is ordered by score plus a great-circle lower bound to the
/// finish, but pruning uses the plain score against the best total only.
/// The returned results hold the chain of super-nodes from the start to
/// the finish, with the finish entry scored at the full route total;
/// the real segments in between are recovered by
/// [combine_routes](super::combine::combine_routes).
pub(crate) fn find_middle_route(
    ctx: &SearchContext,
    begin: &Results,
    end: &Results,
    direct_score: Option<Score>,
) -> Result<Option<Results>, Cancelled> {
    let start = begin.start_node;
    let finish = end.finish_node;
    let (finish_lat, finish_lon) = ctx.node_pos(finish);

    // end frontier: super-node -> best score from it to the finish
    let mut end_frontier: HashMap<NodeIndex, Score> = HashMap::new();
    for (_, r) in end.iter() {
        if ctx.node_is_super(r.node) && r.score.is_finite() {
            let e = end_frontier.entry(r.node).or_insert(Score::INFINITY);
            *e = e.min(r.score);
        }
    }
    if end_frontier.is_empty() {
        return Ok(None);
    }

    let mut results = Results::new(start, begin.prev_segment, 1024);
    let mut queue = Queue::new();

    let origin = results.insert(start, NO_SEGMENT);
    results.get_mut(origin).score = 0.0;
    results.get_mut(origin).sortby = 0.0;

    let mut best_total = direct_score.unwrap_or(Score::INFINITY);
    let mut best_mid: Option<ResultHandle> = None;

    // Seed with the begin frontier, converting each leaf's arrival segment
    // to the super segment it lies on so U-turn checks carry over.
    for (_, r) in begin.iter() {
        if !ctx.node_is_super(r.node) || r.score >= best_total {
            continue;
        }
        let handle = if r.node == start {
            if r.score > results.get(origin).score {
                continue;
            }
            origin
        } else {
            let key = find_super_segment(ctx, r.node, r.segment).unwrap_or(NO_SEGMENT);
            match results.find(r.node, key) {
                Some(h) => {
                    if r.score >= results.get(h).score {
                        continue;
                    }
                    h
                }
                None => results.insert(r.node, key),
            }
        };
        let sortby = r.score + ctx.lower_bound(r.node, finish_lat, finish_lon);
        let entry = results.get_mut(handle);
        entry.score = r.score;
        entry.sortby = sortby;
        if handle != origin {
            entry.prev = Some(origin);
        }
        queue.push(handle, r.score, sortby);

        if let Some(&end_score) = end_frontier.get(&r.node) {
            let total = r.score + end_score;
            if total < best_total {
                best_total = total;
                best_mid = Some(handle);
            }
        }
    }

    let mut pops: u64 = 0;
    while let Some((handle, score)) = queue.pop() {
        pops += 1;
        if pops == 1 || pops % PROGRESS_INTERVAL == 0 {
            if let Some(callback) = ctx.progress {
                if !callback(pops) {
                    return Err(Cancelled);
                }
            }
        }

        if pops % 10_000 == 0 {
            debug!(
                "middle route: {} pops, {} results, best total {}",
                pops,
                results.len(),
                best_total
            );
        }

        let current = *results.get(handle);
        if score > current.score {
            continue; // stale
        }
        if score >= best_total {
            continue;
        }

        let node = current.node;
        let from_seg = current.segment;

        for out in ctx.graph.segments_at(node) {
            if ctx.is_uturn(from_seg, out) {
                continue;
            }
            let seg = ctx.graph.segment(out);
            if !seg.flags.is_super() {
                continue;
            }
            if ctx.profile.oneway && seg.oneway_against(node) {
                continue;
            }
            let Some(edge) =
                ctx.profile
                    .score_segment(ctx.graph.way(seg.way), seg.distance, ctx.optimize)
            else {
                continue;
            };
            let next_node = ctx.graph.other_node(seg, node);
            let next_score = score + edge;
            if next_score >= best_total {
                continue;
            }

            let next = match results.find(next_node, out) {
                Some(h) => {
                    if next_score >= results.get(h).score {
                        continue;
                    }
                    h
                }
                None => results.insert(next_node, out),
            };
            let sortby = next_score + ctx.lower_bound(next_node, finish_lat, finish_lon);
            let entry = results.get_mut(next);
            entry.score = next_score;
            entry.sortby = sortby;
            entry.prev = Some(handle);
            queue.push(next, next_score, sortby);

            if let Some(&end_score) = end_frontier.get(&next_node) {
                let total = next_score + end_score;
                if total < best_total {
                    best_total = total;
                    best_mid = Some(next);
                }
            }
        }
    }

    debug!(
        "middle route {} -> {}: best total {}, {} results, {} pops",
        start,
        finish,
        best_total,
        results.len(),
        pops
    );

    let Some(best_mid) = best_mid else {
        return Ok(None);
    };

    let finish_handle = if results.get(best_mid).node == finish {
        // the last super-node is the finish itself
        best_mid
    } else {
        let h = match results.find(finish, NO_SEGMENT) {
            Some(h) => h,
            None => results.insert(finish, NO_SEGMENT),
        };
        let entry = results.get_mut(h);
        entry.score = best_total;
        entry.prev = Some(best_mid);
        h
    };
    fix_forward_route(&mut results, finish_handle);
    Ok(Some(results))
}

/// Finds the super segment over which the coarse search should leave the
/// super-node `node` that was reached over the normal segment `arrival`.
///
/// If the arrival segment doubles as a super segment, it is the answer.
/// Otherwise each super segment ending at `node` is validated by
/// re-finding its underlying real path: the candidate matches when that
/// path arrives over `arrival` at the stored distance.
pub(crate) fn find_super_segment(
    ctx: &SearchContext,
    node: NodeIndex,
    arrival: SegmentIndex,
) -> Option<SegmentIndex> {
    if arrival == NO_SEGMENT {
        return None;
    }
    let real = ctx.seg(arrival).real;
    if real == NO_SEGMENT {
        return None;
    }
    if ctx.graph.segment(real).flags.is_super() {
        return Some(real);
    }

    for candidate in ctx.graph.segments_at(node) {
        let seg = ctx.graph.segment(candidate);
        if !seg.flags.is_super() {
            continue;
        }
        let other = ctx.graph.other_node(seg, node);
        if seg.oneway_against(other) {
            continue;
        }
        let results = find_super_route(ctx, other, seg.distance);
        if let Some(h) = results.find(node, real) {
            let score = results.get(h).score;
            if (score - seg.distance).abs() <= seg.distance.max(0.001) * 1e-3 {
                return Some(candidate);
            }
        }
    }
    None
}

/// Re-finds the real paths underlying the super segments leaving `start`:
/// raw-distance shortest paths over normal segments, obeying one-way flags
/// but no profile preferences or turn restrictions. Every super-node
/// terminates its path, and paths longer than `max_distance` (plus
/// rounding slack) are cut off, so the exploration stays local.
pub(crate) fn find_super_route(
    ctx: &SearchContext,
    start: NodeIndex,
    max_distance: f32,
) -> Results {
    let cutoff = max_distance * 1.001 + 0.001;

    let mut results = Results::new(start, NO_SEGMENT, 64);
    let mut queue = Queue::new();

    let origin = results.insert(start, NO_SEGMENT);
    results.get_mut(origin).score = 0.0;
    results.get_mut(origin).sortby = 0.0;
    queue.push(origin, 0.0, 0.0);

    while let Some((handle, score)) = queue.pop() {
        let current = *results.get(handle);
        if score > current.score {
            continue;
        }
        let node = current.node;

        for out in ctx.graph.segments_at(node) {
            let seg = ctx.graph.segment(out);
            if !seg.flags.is_normal() {
                continue;
            }
            if seg.oneway_against(node) {
                continue;
            }
            let next_node = ctx.graph.other_node(seg, node);
            let next_score = score + seg.distance;
            if next_score > cutoff {
                continue;
            }

            let next = match results.find(next_node, out) {
                Some(h) => {
                    if next_score >= results.get(h).score {
                        continue;
                    }
                    h
                }
                None => results.insert(next_node, out),
            };
            let entry = results.get_mut(next);
            entry.score = next_score;
            entry.sortby = next_score;
            entry.prev = Some(handle);

            // super-nodes terminate the path, the finish included
            if !ctx.graph.node(next_node).super_node {
                queue.push(next, next_score, next_score);
            }
        }
    }

    results
}
