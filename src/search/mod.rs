// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Route search phases. The local phases ([normal]) explore ordinary
//! segments around the endpoints; the coarse phase ([middle]) crosses the
//! super graph between them; [combine] splices the phase results into one
//! route. All phases work through [SearchContext], which presents real and
//! fake nodes and segments uniformly.

pub(crate) mod combine;
pub(crate) mod middle;
pub(crate) mod normal;

use crate::fake::FakeGraph;
use crate::graph::{Graph, SegmentsAt};
use crate::great_circle_distance;
use crate::profile::Profile;
use crate::types::{
    is_fake_node, is_fake_segment, NodeIndex, Optimize, Score, SegmentFlags, SegmentIndex,
    Transports, WayIndex, NO_SEGMENT,
};

/// Marker returned when the progress callback asked to abort the search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Cancelled;

/// How often (in popped queue entries) the middle phase polls the
/// progress callback. The first pop polls too, so even short searches
/// observe a cancellation.
pub(crate) const PROGRESS_INTERVAL: u64 = 100_000;

/// A [Segment](crate::graph::Segment)- or fake-segment view used by the
/// search phases. `real` is the underlying real segment: the segment's own
/// index for real segments, the split origin for fake ones, [NO_SEGMENT]
/// for the zero-length loop segment.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SegView {
    pub node1: NodeIndex,
    pub node2: NodeIndex,
    pub way: WayIndex,
    pub distance: f32,
    pub flags: SegmentFlags,
    pub real: SegmentIndex,
}

impl SegView {
    pub(crate) fn other_node(&self, node: NodeIndex) -> NodeIndex {
        if self.node1 == node {
            self.node2
        } else {
            self.node1
        }
    }

    pub(crate) fn oneway_against(&self, node: NodeIndex) -> bool {
        (self.flags.has(SegmentFlags::ONEWAY_2TO1) && node == self.node1)
            || (self.flags.has(SegmentFlags::ONEWAY_1TO2) && node == self.node2)
    }
}

/// Shared state of one route calculation: the network, the waypoint
/// overlay, the prepared profile, and the optional cancellation callback.
pub(crate) struct SearchContext<'a> {
    pub graph: &'a Graph,
    pub fakes: &'a FakeGraph,
    pub profile: &'a Profile,
    pub optimize: Optimize,
    pub progress: Option<&'a dyn Fn(u64) -> bool>,
}

impl<'a> SearchContext<'a> {
    pub(crate) fn seg(&self, index: SegmentIndex) -> SegView {
        if is_fake_segment(index) {
            let f = self.fakes.segment(index);
            SegView {
                node1: f.node1,
                node2: f.node2,
                way: f.way,
                distance: f.distance,
                flags: f.flags,
                real: f.real,
            }
        } else {
            let s = self.graph.segment(index);
            SegView {
                node1: s.node1,
                node2: s.node2,
                way: s.way,
                distance: s.distance,
                flags: s.flags,
                real: index,
            }
        }
    }

    pub(crate) fn node_pos(&self, node: NodeIndex) -> (f32, f32) {
        if is_fake_node(node) {
            let n = self.fakes.node(node);
            (n.lat, n.lon)
        } else {
            let n = self.graph.node(node);
            (n.lat, n.lon)
        }
    }

    pub(crate) fn node_allow(&self, node: NodeIndex) -> Transports {
        if is_fake_node(node) {
            self.fakes.node(node).allow
        } else {
            self.graph.node(node).allow
        }
    }

    pub(crate) fn node_is_super(&self, node: NodeIndex) -> bool {
        !is_fake_node(node) && self.graph.node(node).super_node
    }

    fn node_turn_restricted(&self, node: NodeIndex) -> bool {
        !is_fake_node(node) && self.graph.node(node).turn_restricted
    }

    /// Iterates over the segments incident to `node`. For real nodes this
    /// walks the graph's adjacency chain plus, when `fake_target` names a
    /// fake node, the single overlay segment connecting toward it. Fake
    /// nodes only have overlay segments.
    pub(crate) fn segments_at(
        &self,
        node: NodeIndex,
        fake_target: Option<NodeIndex>,
    ) -> NodeSegments<'_> {
        if is_fake_node(node) {
            NodeSegments::Fake(self.fakes.segments_at(node).collect::<Vec<_>>().into_iter())
        } else {
            NodeSegments::Real {
                chain: self.graph.segments_at(node),
                extra: fake_target.and_then(|target| self.fakes.extra_segment(node, target)),
            }
        }
    }

    /// Checks whether departing over `b` after arriving over `a` turns
    /// straight back. A fake segment counts as its underlying real one,
    /// so arriving over a split half and leaving over the whole original
    /// segment is still a U-turn.
    pub(crate) fn is_uturn(&self, a: SegmentIndex, b: SegmentIndex) -> bool {
        if a == NO_SEGMENT || b == NO_SEGMENT {
            return false;
        }
        if a == b {
            return true;
        }
        match (is_fake_segment(a), is_fake_segment(b)) {
            (true, false) => self.fakes.segment(a).real == b,
            (false, true) => self.fakes.segment(b).real == a,
            // Two fakes on the same real segment double back on each other
            // exactly when they start from a shared endpoint; the halves
            // of one split continue into each other instead.
            (true, true) => {
                let fa = self.fakes.segment(a);
                let fb = self.fakes.segment(b);
                fa.real != NO_SEGMENT
                    && fa.real == fb.real
                    && (fa.node1 == fb.node1 || fa.node2 == fb.node2)
            }
            (false, false) => false,
        }
    }

    /// Checks turn restrictions for the transition over `via` from
    /// `from_seg` onto `to_seg`. Restrictions reference real segments, so
    /// fake segments are resolved through their `real` index first.
    pub(crate) fn turn_allowed(
        &self,
        via: NodeIndex,
        from_seg: SegmentIndex,
        to_seg: SegmentIndex,
    ) -> bool {
        if !self.profile.turns || !self.node_turn_restricted(via) {
            return true;
        }
        if from_seg == NO_SEGMENT || to_seg == NO_SEGMENT {
            return true;
        }
        let from = self.seg(from_seg).real;
        let to = self.seg(to_seg).real;
        if from == NO_SEGMENT || to == NO_SEGMENT {
            return true;
        }
        match self.graph.first_restriction(via, from) {
            Some(first) => self
                .graph
                .is_turn_allowed(first, via, from, to, self.profile.allow),
            None => true,
        }
    }

    /// Score of traversing `seg` when departing from `from`, or None when
    /// the segment is inadmissible for the local search phases: not part
    /// of the normal layer, one-way against us, or rejected by the profile.
    pub(crate) fn normal_edge(&self, seg: &SegView, from: NodeIndex) -> Option<Score> {
        if !seg.flags.is_normal() {
            return None;
        }
        if self.profile.oneway && seg.oneway_against(from) {
            return None;
        }
        self.profile
            .score_segment(self.graph.way(seg.way), seg.distance, self.optimize)
    }

    /// A lower bound on the score of any path from `node` to the given
    /// position, used to order the coarse-phase queue.
    pub(crate) fn lower_bound(&self, node: NodeIndex, to_lat: f32, to_lon: f32) -> Score {
        let (lat, lon) = self.node_pos(node);
        let distance = great_circle_distance(lat, lon, to_lat, to_lon);
        match self.optimize {
            Optimize::Distance => distance / self.profile.max_pref,
            Optimize::Duration => distance / self.profile.max_speed / self.profile.max_pref,
        }
    }
}

/// Iterator over the segments incident to one node, real and fake alike.
/// See [SearchContext::segments_at].
pub(crate) enum NodeSegments<'a> {
    Real {
        chain: SegmentsAt<'a>,
        extra: Option<SegmentIndex>,
    },
    Fake(std::vec::IntoIter<SegmentIndex>),
}

impl<'a> Iterator for NodeSegments<'a> {
    type Item = SegmentIndex;

    fn next(&mut self) -> Option<SegmentIndex> {
        match self {
            NodeSegments::Real { chain, extra } => chain.next().or_else(|| extra.take()),
            NodeSegments::Fake(iter) => iter.next(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphBuilder, Way};
    use crate::profile::CAR_PROFILE;
    use crate::types::{Highway, Properties, Property};

    fn paved_way() -> Way {
        Way::new(
            Highway::Residential,
            Transports::ALL,
            Properties::NONE.with(Property::Paved),
            50.0,
        )
    }

    #[test]
    fn test_uturn_fake_real_equivalence() {
        let mut b = GraphBuilder::new();
        let n0 = b.add_node(50.0, 20.0, Transports::ALL, false);
        let n1 = b.add_node(50.1, 20.0, Transports::ALL, false);
        let w = b.add_way(paved_way());
        let s = b.add_segment(n0, n1, w, 10.0, SegmentFlags::NORMAL);
        let graph = b.build();

        let mut fakes = FakeGraph::default();
        let f = fakes.create_fakes(&graph, s, 4.0, 6.0);
        let half1 = fakes.extra_segment(n0, f).unwrap();
        let half2 = fakes.extra_segment(n1, f).unwrap();

        let profile = CAR_PROFILE.prepared().unwrap();
        let ctx = SearchContext {
            graph: &graph,
            fakes: &fakes,
            profile: &profile,
            optimize: Optimize::Distance,
            progress: None,
        };

        assert!(ctx.is_uturn(s, s));
        // a fake half aliases its origin segment
        assert!(ctx.is_uturn(half1, s));
        assert!(ctx.is_uturn(s, half2));
        // but the two halves continue into each other
        assert!(!ctx.is_uturn(half1, half2));
        assert!(!ctx.is_uturn(NO_SEGMENT, s));
    }

    #[test]
    fn test_uturn_between_same_segment_splits() {
        let mut b = GraphBuilder::new();
        let n0 = b.add_node(50.0, 20.0, Transports::ALL, false);
        let n1 = b.add_node(50.1, 20.0, Transports::ALL, false);
        let w = b.add_way(paved_way());
        let s = b.add_segment(n0, n1, w, 10.0, SegmentFlags::NORMAL);
        let graph = b.build();

        let mut fakes = FakeGraph::default();
        let f = fakes.create_fakes(&graph, s, 4.0, 6.0);
        let g = fakes.create_fakes(&graph, s, 8.0, 2.0);
        let f_from_n0 = fakes.extra_segment(n0, f).unwrap();
        let g_from_n0 = fakes.extra_segment(n0, g).unwrap();
        let g_from_n1 = fakes.extra_segment(n1, g).unwrap();
        let direct = fakes
            .segments_at(f)
            .find(|&i| {
                let seg = fakes.segment(i);
                seg.node1 == g || seg.node2 == g
            })
            .unwrap();

        let profile = CAR_PROFILE.prepared().unwrap();
        let ctx = SearchContext {
            graph: &graph,
            fakes: &fakes,
            profile: &profile,
            optimize: Optimize::Distance,
            progress: None,
        };

        // both halves toward node1 cover the stretch below their split
        assert!(ctx.is_uturn(f_from_n0, g_from_n0));
        // arriving at g over the direct link continues into the half
        // toward the far endpoint
        assert!(!ctx.is_uturn(direct, g_from_n1));
        // but leaving g back toward n0 retraces the direct link
        assert!(ctx.is_uturn(direct, g_from_n0));
        // splits of different positions never alias the halves of one split
        assert!(!ctx.is_uturn(f_from_n0, direct));
    }

    #[test]
    fn test_segments_at_with_fake_target() {
        let mut b = GraphBuilder::new();
        let n0 = b.add_node(50.0, 20.0, Transports::ALL, false);
        let n1 = b.add_node(50.1, 20.0, Transports::ALL, false);
        let n2 = b.add_node(50.2, 20.0, Transports::ALL, false);
        let w = b.add_way(paved_way());
        let s01 = b.add_segment(n0, n1, w, 10.0, SegmentFlags::NORMAL);
        let s12 = b.add_segment(n1, n2, w, 10.0, SegmentFlags::NORMAL);
        let graph = b.build();

        let mut fakes = FakeGraph::default();
        let f = fakes.create_fakes(&graph, s12, 5.0, 5.0);
        let half = fakes.extra_segment(n1, f).unwrap();

        let profile = CAR_PROFILE.prepared().unwrap();
        let ctx = SearchContext {
            graph: &graph,
            fakes: &fakes,
            profile: &profile,
            optimize: Optimize::Distance,
            progress: None,
        };

        // without a fake target, only the real chain
        let plain: Vec<_> = ctx.segments_at(n1, None).collect();
        assert_eq!(plain, vec![s01, s12]);

        // with one, the overlay edge toward it is appended
        let with_target: Vec<_> = ctx.segments_at(n1, Some(f)).collect();
        assert_eq!(with_target, vec![s01, s12, half]);

        // fake nodes only see overlay segments
        assert_eq!(ctx.segments_at(f, Some(f)).count(), 2);
    }
}
