// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! hiroute calculates routes over preprocessed road networks using a
//! two-tier search: local exploration around the endpoints of each leg,
//! and a coarse search across a precomputed super graph in between.
//!
//! Build a [Graph] with [GraphBuilder], pick or tweak a [Profile]
//! (see [CAR_PROFILE], [BICYCLE_PROFILE], [FOOT_PROFILE]), then call
//! [find_route] with a list of [Waypoint]s:
//!
//! ```no_run
//! use hiroute::{find_route, Waypoint, RouteOptions, CAR_PROFILE};
//! # let graph = hiroute::GraphBuilder::new().build();
//! let route = find_route(
//!     &graph,
//!     &CAR_PROFILE,
//!     &[Waypoint::Node(0), Waypoint::Node(42)],
//!     RouteOptions::default(),
//!     None,
//! )?;
//! for leg in &route.legs {
//!     for point in leg.route() {
//!         println!("{:?}", route.position(&graph, point.node));
//!     }
//! }
//! # Ok::<(), hiroute::Error>(())
//! ```

mod distance;
pub mod fake;
pub mod graph;
pub mod profile;
pub mod results;
mod queue;
mod router;
mod search;
pub mod types;

pub use distance::great_circle_distance;
pub use graph::{Graph, GraphBuilder, Node, Segment, TurnRelation, Way};
pub use profile::{Profile, BICYCLE_PROFILE, CAR_PROFILE, FOOT_PROFILE};
pub use results::{ResultHandle, Results, RouteResult};
pub use router::{calculate_route, find_route, Error, Route, RouteOptions, Waypoint};
pub use types::{
    Highway, NodeIndex, Optimize, Property, Score, SegmentIndex, Transport, Transports, NO_NODE,
    NO_SEGMENT,
};
