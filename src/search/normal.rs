// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use super::combine::fix_forward_route;
use super::SearchContext;
use crate::queue::Queue;
use crate::results::Results;
use crate::types::{is_fake_node, NodeIndex, Score, SegmentIndex, NO_SEGMENT};
use log::debug;

/// Finds the best route from `start` (arrived at over `prev_segment`)
/// to `finish` across normal segments, with no special treatment of
/// super-nodes. Used for whole routes in small networks and for the
/// sub-legs between adjacent super-nodes when combining a coarse route.
///
/// With `allow_uturn`, turning straight back at the start node is
/// permitted; everywhere else U-turns are only taken when the node
/// forbids the transport from passing through.
pub(crate) fn find_normal_route(
    ctx: &SearchContext,
    start: NodeIndex,
    prev_segment: SegmentIndex,
    finish: NodeIndex,
    allow_uturn: bool,
) -> Option<Results> {
    let fake_target = is_fake_node(finish).then_some(finish);

    let mut results = Results::new(start, prev_segment, 64);
    let mut queue = Queue::new();

    let origin = results.insert(start, prev_segment);
    results.get_mut(origin).score = 0.0;
    results.get_mut(origin).sortby = 0.0;
    queue.push(origin, 0.0, 0.0);

    let mut finish_score = Score::INFINITY;
    let mut finish_handle = None;

    while let Some((handle, score)) = queue.pop() {
        if score >= finish_score {
            break;
        }
        let current = *results.get(handle);
        if score > current.score {
            continue; // stale
        }

        let node = current.node;
        let from_seg = current.segment;
        // A node that forbids the transport may still be entered, but the
        // only way onward is back where we came from.
        let turn_back =
            from_seg != NO_SEGMENT && !ctx.node_allow(node).intersects(ctx.profile.allow);

        for out in ctx.segments_at(node, fake_target) {
            let uturn = ctx.is_uturn(from_seg, out);
            if turn_back {
                if !uturn {
                    continue;
                }
            } else if uturn && !(allow_uturn && handle == origin) {
                continue;
            }
            if !ctx.turn_allowed(node, from_seg, out) {
                continue;
            }

            let seg = ctx.seg(out);
            let Some(edge) = ctx.normal_edge(&seg, node) else {
                continue;
            };
            let next_node = seg.other_node(node);
            let next_score = score + edge;
            if next_score >= finish_score {
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

            if next_node == finish {
                finish_score = next_score;
                finish_handle = Some(next);
            } else {
                queue.push(next, next_score, next_score);
            }
        }
    }

    let finish_handle = finish_handle?;
    fix_forward_route(&mut results, finish_handle);
    debug!(
        "normal route {} -> {}: score {}, {} results",
        start,
        finish,
        finish_score,
        results.len()
    );
    Some(results)
}

/// Explores normal segments outwards from `start`, treating super-nodes as
/// frontier leaves: they are recorded with their scores but never expanded.
/// A direct hit on `finish` is recorded too (and caps further exploration),
/// with `finish_node`/`last_segment` set on the returned results.
///
/// Returns None when neither the finish nor any super-node is reachable.
pub(crate) fn find_start_routes(
    ctx: &SearchContext,
    start: NodeIndex,
    prev_segment: SegmentIndex,
    finish: NodeIndex,
    allow_uturn: bool,
) -> Option<Results> {
    let fake_target = is_fake_node(finish).then_some(finish);

    let mut results = Results::new(start, prev_segment, 64);
    let mut queue = Queue::new();

    let origin = results.insert(start, prev_segment);
    results.get_mut(origin).score = 0.0;
    results.get_mut(origin).sortby = 0.0;
    queue.push(origin, 0.0, 0.0);

    let mut frontier = ctx.node_is_super(start);
    let mut finish_score = Score::INFINITY;
    let mut finish_handle = None;

    while let Some((handle, score)) = queue.pop() {
        if score >= finish_score {
            break;
        }
        let current = *results.get(handle);
        if score > current.score {
            continue;
        }

        let node = current.node;
        let from_seg = current.segment;
        let turn_back =
            from_seg != NO_SEGMENT && !ctx.node_allow(node).intersects(ctx.profile.allow);

        for out in ctx.segments_at(node, fake_target) {
            let uturn = ctx.is_uturn(from_seg, out);
            if turn_back {
                if !uturn {
                    continue;
                }
            } else if uturn && !(allow_uturn && handle == origin) {
                continue;
            }
            if !ctx.turn_allowed(node, from_seg, out) {
                continue;
            }

            let seg = ctx.seg(out);
            let Some(edge) = ctx.normal_edge(&seg, node) else {
                continue;
            };
            let next_node = seg.other_node(node);
            let next_score = score + edge;
            if next_score >= finish_score {
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

            if next_node == finish {
                finish_score = next_score;
                finish_handle = Some(next);
            } else if ctx.node_is_super(next_node) {
                // frontier leaf: the coarse phase continues from here
                frontier = true;
            } else {
                queue.push(next, next_score, next_score);
            }
        }
    }

    if let Some(handle) = finish_handle {
        let finish_entry = *results.get(handle);
        results.finish_node = finish_entry.node;
        results.last_segment = finish_entry.segment;
    }

    debug!(
        "start routes from {}: {} results, direct score {:?}",
        start,
        results.len(),
        finish_handle.map(|h| results.get(h).score)
    );

    if finish_handle.is_some() || frontier {
        Some(results)
    } else {
        None
    }
}

/// Explores normal segments backwards from `finish`, treating super-nodes
/// as frontier leaves. Each result is keyed by a node and the segment
/// departing it toward the finish; the `next` links form a tree rooted at
/// the finish, ready to be continued from any frontier entry.
///
/// Returns None when no super-node can reach the finish.
pub(crate) fn find_finish_routes(ctx: &SearchContext, finish: NodeIndex) -> Option<Results> {
    let mut results = Results::new(finish, NO_SEGMENT, 64);
    results.finish_node = finish;
    let mut queue = Queue::new();

    let origin = results.insert(finish, NO_SEGMENT);
    results.get_mut(origin).score = 0.0;
    results.get_mut(origin).sortby = 0.0;
    queue.push(origin, 0.0, 0.0);

    let mut frontier = ctx.node_is_super(finish);

    while let Some((handle, score)) = queue.pop() {
        let current = *results.get(handle);
        if score > current.score {
            continue;
        }

        let node = current.node;
        let out_seg = current.segment; // departs node toward the finish
        let turn_back =
            out_seg != NO_SEGMENT && !ctx.node_allow(node).intersects(ctx.profile.allow);

        for in_seg in ctx.segments_at(node, None) {
            let uturn = ctx.is_uturn(in_seg, out_seg);
            if turn_back {
                if !uturn {
                    continue;
                }
            } else if uturn {
                continue;
            }
            if !ctx.turn_allowed(node, in_seg, out_seg) {
                continue;
            }

            let seg = ctx.seg(in_seg);
            let prev_node = seg.other_node(node);
            // traversal direction is prev_node -> node
            let Some(edge) = ctx.normal_edge(&seg, prev_node) else {
                continue;
            };
            let next_score = score + edge;

            let next = match results.find(prev_node, in_seg) {
                Some(h) => {
                    if next_score >= results.get(h).score {
                        continue;
                    }
                    h
                }
                None => results.insert(prev_node, in_seg),
            };
            let entry = results.get_mut(next);
            entry.score = next_score;
            entry.sortby = next_score;
            entry.next = Some(handle);

            if ctx.node_is_super(prev_node) {
                frontier = true;
            } else {
                queue.push(next, next_score, next_score);
            }
        }
    }

    debug!("finish routes to {}: {} results", finish, results.len());

    frontier.then_some(results)
}
