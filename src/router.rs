// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use crate::fake::FakeGraph;
use crate::graph::Graph;
use crate::profile::Profile;
use crate::results::Results;
use crate::search::combine::{combine_routes, fix_forward_route};
use crate::search::middle::find_middle_route;
use crate::search::normal::{find_finish_routes, find_start_routes};
use crate::search::{Cancelled, SearchContext};
use crate::types::{
    is_fake_node, NodeIndex, Optimize, Score, SegmentIndex, NO_NODE, NO_SEGMENT,
};
use log::info;

/// Error calculating a route.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// No route exists for the given leg (0-based index into the legs,
    /// i.e. the gaps between consecutive waypoints).
    #[error("no route found for leg {0}")]
    NoRoute(usize),

    /// The progress callback asked to stop the calculation.
    #[error("route calculation cancelled")]
    Cancelled,

    /// The profile cannot be used for routing at all.
    #[error("invalid profile: {0}")]
    InvalidProfile(&'static str),

    /// A waypoint references a node or segment outside of the graph,
    /// or a fraction outside of [0, 1].
    #[error("invalid waypoint {0}")]
    InvalidWaypoint(usize),

    /// Fewer than two waypoints were provided.
    #[error("at least two waypoints are required")]
    TooFewWaypoints,

    /// A super segment promises a connection which could not be re-found
    /// on the normal layer; the graph preprocessing is inconsistent.
    #[error("super graph inconsistent with the normal layer")]
    BrokenSuperGraph,
}

/// A point the route must pass through.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Waypoint {
    /// An existing node of the graph.
    Node(NodeIndex),

    /// A point `fraction` (in `[0, 1]`) of the way along a segment, from
    /// its `node1`. Represented during the calculation by a fake node.
    Position { segment: SegmentIndex, fraction: f32 },
}

/// Options of a [find_route] calculation.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RouteOptions {
    pub optimize: Optimize,

    /// Return to the first waypoint at the end.
    pub loop_route: bool,

    /// Visit the waypoints in reverse order.
    pub reverse: bool,
}

/// A calculated route: one [Results] leg per consecutive waypoint pair,
/// together with the fake-node overlay the legs refer to.
#[derive(Debug, Clone)]
pub struct Route {
    pub legs: Vec<Results>,
    pub fakes: FakeGraph,
}

impl Route {
    /// The summed score of all legs.
    pub fn total_score(&self) -> Score {
        self.legs
            .iter()
            .map(|leg| leg.route().last().map_or(0.0, |r| r.score))
            .sum()
    }

    /// Position of a node referenced by this route, fake nodes included.
    pub fn position(&self, graph: &Graph, node: NodeIndex) -> (f32, f32) {
        if is_fake_node(node) {
            let n = self.fakes.node(node);
            (n.lat, n.lon)
        } else {
            let n = graph.node(node);
            (n.lat, n.lon)
        }
    }
}

/// Calculates a single route leg from `start` to `finish`, both of which
/// may be fake nodes from the `fakes` overlay. `prev_segment` is the
/// segment the start node was arrived by (the previous leg's last
/// segment), or [NO_SEGMENT].
///
/// The profile must have been normalized with [Profile::prepared], and
/// `start` must differ from `finish`: coincident waypoints are resolved
/// by [find_route] as zero-length legs without invoking any search.
/// When the forward rules leave no way out of the start node, the
/// calculation is retried with a U-turn allowed there.
///
/// Returns Ok(None) when no route exists.
pub fn calculate_route(
    graph: &Graph,
    fakes: &FakeGraph,
    profile: &Profile,
    optimize: Optimize,
    start: NodeIndex,
    prev_segment: SegmentIndex,
    finish: NodeIndex,
    progress: Option<&dyn Fn(u64) -> bool>,
) -> Result<Option<Results>, Error> {
    let ctx = SearchContext {
        graph,
        fakes,
        profile,
        optimize,
        progress,
    };

    if let Some(results) = try_route(&ctx, start, prev_segment, finish, false)? {
        return Ok(Some(results));
    }
    if prev_segment != NO_SEGMENT {
        // maybe the only way out is back where the last leg came from
        return try_route(&ctx, start, prev_segment, finish, true);
    }
    Ok(None)
}

fn try_route(
    ctx: &SearchContext,
    start: NodeIndex,
    prev_segment: SegmentIndex,
    finish: NodeIndex,
    allow_uturn: bool,
) -> Result<Option<Results>, Error> {
    let Some(mut begin) = find_start_routes(ctx, start, prev_segment, finish, allow_uturn) else {
        return Ok(None);
    };
    let direct = if begin.finish_node != NO_NODE {
        begin.find(begin.finish_node, begin.last_segment)
    } else {
        None
    };
    let direct_score = direct.map(|h| begin.get(h).score);

    let middle = match find_finish_routes(ctx, finish) {
        Some(end) => match find_middle_route(ctx, &begin, &end, direct_score) {
            Ok(middle) => middle,
            Err(Cancelled) => return Err(Error::Cancelled),
        },
        None => None,
    };

    // the middle phase only yields a route strictly better than the direct one
    if let Some(middle) = middle {
        let combined = combine_routes(ctx, &middle).ok_or(Error::BrokenSuperGraph)?;
        return Ok(Some(combined));
    }
    if let Some(handle) = direct {
        fix_forward_route(&mut begin, handle);
        return Ok(Some(begin));
    }
    Ok(None)
}

/// Calculates a route visiting all `waypoints` in order.
///
/// The profile is normalized internally; mid-segment waypoints get fake
/// nodes in the returned [Route]'s overlay. The optional `progress`
/// callback is polled periodically during long searches with the number
/// of processed queue entries; returning `false` aborts the calculation.
pub fn find_route(
    graph: &Graph,
    profile: &Profile,
    waypoints: &[Waypoint],
    options: RouteOptions,
    progress: Option<&dyn Fn(u64) -> bool>,
) -> Result<Route, Error> {
    let profile = profile.prepared()?;
    if options.optimize == Optimize::Duration && profile.max_speed <= 0.0 {
        return Err(Error::InvalidProfile(
            "no highway class has a speed, cannot optimize for duration",
        ));
    }
    if waypoints.len() < 2 {
        return Err(Error::TooFewWaypoints);
    }

    let mut order: Vec<usize> = (0..waypoints.len()).collect();
    if options.reverse {
        order.reverse();
    }

    let mut fakes = FakeGraph::new();
    let mut nodes = Vec::with_capacity(order.len() + 1);
    for &i in &order {
        nodes.push(resolve_waypoint(graph, &mut fakes, &waypoints[i], i)?);
    }
    if options.loop_route {
        nodes.push(nodes[0]);
    }

    let mut legs = Vec::with_capacity(nodes.len() - 1);
    let mut prev_segment = NO_SEGMENT;
    for (leg, pair) in nodes.windows(2).enumerate() {
        let (start, finish) = (pair[0], pair[1]);

        if start == finish {
            // zero-length leg; the loop segment keeps its last segment
            // distinct from the previous leg's
            let loop_segment = fakes.create_loop_segment(graph, start, prev_segment);
            let mut results = Results::new(start, prev_segment, 4);
            let origin = results.insert(start, prev_segment);
            results.get_mut(origin).score = 0.0;
            results.finish_node = start;
            results.last_segment = loop_segment;
            info!("leg {}: {} -> {} is zero-length", leg, start, finish);
            prev_segment = loop_segment;
            legs.push(results);
            continue;
        }

        let results = calculate_route(
            graph,
            &fakes,
            &profile,
            options.optimize,
            start,
            prev_segment,
            finish,
            progress,
        )?
        .ok_or(Error::NoRoute(leg))?;

        info!(
            "leg {}: {} -> {}, score {}",
            leg,
            start,
            finish,
            results.route().last().map_or(0.0, |r| r.score)
        );
        prev_segment = results.last_segment;
        legs.push(results);
    }

    Ok(Route { legs, fakes })
}

fn resolve_waypoint(
    graph: &Graph,
    fakes: &mut FakeGraph,
    waypoint: &Waypoint,
    index: usize,
) -> Result<NodeIndex, Error> {
    match *waypoint {
        Waypoint::Node(node) => {
            if (node as usize) < graph.num_nodes() {
                Ok(node)
            } else {
                Err(Error::InvalidWaypoint(index))
            }
        }
        Waypoint::Position { segment, fraction } => {
            if (segment as usize) >= graph.num_segments() || !(0.0..=1.0).contains(&fraction) {
                return Err(Error::InvalidWaypoint(index));
            }
            let distance = graph.segment(segment).distance;
            Ok(fakes.create_fakes(
                graph,
                segment,
                distance * fraction,
                distance * (1.0 - fraction),
            ))
        }
    }
}
