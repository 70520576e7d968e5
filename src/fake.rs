// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use crate::graph::Graph;
use crate::types::{
    is_fake_segment, NodeIndex, SegmentFlags, SegmentIndex, Transports, WayIndex, FAKE_THRESHOLD,
    NO_SEGMENT,
};

/// A temporary node inserted in the middle of a real segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FakeNode {
    pub lat: f32,
    pub lon: f32,
    pub allow: Transports,

    pub(crate) segment: SegmentIndex,
    /// Distance from the split segment's `node1`, in km.
    pub(crate) offset: f32,
}

/// A temporary segment connecting a [FakeNode] to the road network.
///
/// `real` points at the real segment this one was split from, so that
/// U-turn checks treat the fake and its original as the same edge.
/// The zero-length loop segment has `real == NO_SEGMENT`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FakeSegment {
    pub node1: NodeIndex,
    pub node2: NodeIndex,
    pub way: WayIndex,
    pub distance: f32,
    pub flags: SegmentFlags,
    pub real: SegmentIndex,
}

/// A per-calculation overlay of fake nodes and segments, layered over an
/// immutable [Graph] to represent mid-segment waypoints.
///
/// Fake indices live at or above [FAKE_THRESHOLD] so they never collide
/// with real ones. The overlay is built up while resolving waypoints and
/// discarded wholesale once the route has been emitted.
#[derive(Debug, Clone, Default)]
pub struct FakeGraph {
    nodes: Vec<FakeNode>,
    segments: Vec<FakeSegment>,
}

impl FakeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, index: NodeIndex) -> &FakeNode {
        &self.nodes[(index - FAKE_THRESHOLD) as usize]
    }

    pub fn segment(&self, index: SegmentIndex) -> &FakeSegment {
        &self.segments[(index - FAKE_THRESHOLD) as usize]
    }

    /// Splits the real `segment` at a point `dist1` km from its `node1`
    /// (and `dist2` km from its `node2`), inserting a fake node joined to
    /// both real endpoints by two fake segments, plus one direct fake
    /// segment to every earlier fake node on the same segment. All fake
    /// segments keep the original node order, so the one-way flags keep
    /// their meaning.
    ///
    /// Returns the index of the new fake node. Calling this twice for the
    /// same position yields two independent fake nodes.
    pub fn create_fakes(
        &mut self,
        graph: &Graph,
        segment: SegmentIndex,
        dist1: f32,
        dist2: f32,
    ) -> NodeIndex {
        let real = graph.segment(segment);
        let node1 = graph.node(real.node1);
        let node2 = graph.node(real.node2);
        let way = graph.way(real.way);

        let total = dist1 + dist2;
        let frac = if total > 0.0 { dist1 / total } else { 0.5 };

        let fake_node = FAKE_THRESHOLD + self.nodes.len() as u32;
        self.nodes.push(FakeNode {
            lat: node1.lat + (node2.lat - node1.lat) * frac,
            lon: node1.lon + (node2.lon - node1.lon) * frac,
            allow: way.allow,
            segment,
            offset: dist1,
        });

        self.segments.push(FakeSegment {
            node1: real.node1,
            node2: fake_node,
            way: real.way,
            distance: dist1,
            flags: real.flags,
            real: segment,
        });
        self.segments.push(FakeSegment {
            node1: fake_node,
            node2: real.node2,
            way: real.way,
            distance: dist2,
            flags: real.flags,
            real: segment,
        });

        // A further waypoint on an already-split segment also gets a direct
        // fake segment to each earlier fake node on it, so a route between
        // the two stays on the road instead of detouring through a real
        // endpoint. Node order follows the original segment.
        for (i, other) in self.nodes.iter().enumerate() {
            let other_node = FAKE_THRESHOLD + i as u32;
            if other_node == fake_node || other.segment != segment {
                continue;
            }
            let (node1, node2, distance) = if other.offset <= dist1 {
                (other_node, fake_node, dist1 - other.offset)
            } else {
                (fake_node, other_node, other.offset - dist1)
            };
            self.segments.push(FakeSegment {
                node1,
                node2,
                way: real.way,
                distance,
                flags: real.flags,
                real: segment,
            });
        }

        fake_node
    }

    /// Creates a zero-length fake segment looping at `node`, distinct from
    /// the `prev` arrival segment. Used so that a leg ending where it
    /// started still records a last segment of its own.
    pub fn create_loop_segment(
        &mut self,
        graph: &Graph,
        node: NodeIndex,
        prev: SegmentIndex,
    ) -> SegmentIndex {
        let way = if prev == NO_SEGMENT {
            // No arrival segment: borrow the way of any segment at the node.
            let first = graph
                .segments_at(node)
                .next()
                .map(|s| graph.segment(s).way);
            first.unwrap_or(0)
        } else if is_fake_segment(prev) {
            self.segment(prev).way
        } else {
            graph.segment(prev).way
        };

        let index = FAKE_THRESHOLD + self.segments.len() as u32;
        self.segments.push(FakeSegment {
            node1: node,
            node2: node,
            way,
            distance: 0.0,
            flags: SegmentFlags::NORMAL,
            real: NO_SEGMENT,
        });
        index
    }

    /// Iterates over the indices of fake segments incident to `node`
    /// (which may be real or fake).
    pub fn segments_at(&self, node: NodeIndex) -> impl Iterator<Item = SegmentIndex> + '_ {
        self.segments
            .iter()
            .enumerate()
            .filter(move |(_, s)| s.node1 == node || s.node2 == node)
            .map(|(i, _)| FAKE_THRESHOLD + i as u32)
    }

    /// Finds the fake segment connecting a real node to the given fake
    /// node, if any. Real nodes keep their regular adjacency chains, so
    /// the search has to ask the overlay for this one extra edge.
    pub fn extra_segment(
        &self,
        real_node: NodeIndex,
        fake_node: NodeIndex,
    ) -> Option<SegmentIndex> {
        self.segments.iter().enumerate().find_map(|(i, s)| {
            if (s.node1 == real_node && s.node2 == fake_node)
                || (s.node2 == real_node && s.node1 == fake_node)
            {
                Some(FAKE_THRESHOLD + i as u32)
            } else {
                None
            }
        })
    }

    /// Discards all fake nodes and segments.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.segments.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphBuilder, Way};
    use crate::types::{is_fake_node, Highway, Properties};

    fn two_node_graph(flags: SegmentFlags) -> (Graph, NodeIndex, NodeIndex, SegmentIndex) {
        let mut b = GraphBuilder::new();
        let n0 = b.add_node(50.0, 20.0, Transports::ALL, false);
        let n1 = b.add_node(50.1, 20.0, Transports::ALL, false);
        let w = b.add_way(Way::new(
            Highway::Residential,
            Transports::ALL,
            Properties::NONE,
            50.0,
        ));
        let s = b.add_segment(n0, n1, w, 10.0, flags);
        (b.build(), n0, n1, s)
    }

    #[test]
    fn test_create_fakes() {
        let (g, n0, n1, s) = two_node_graph(SegmentFlags::NORMAL);
        let mut fakes = FakeGraph::new();
        let f = fakes.create_fakes(&g, s, 4.0, 6.0);

        assert!(is_fake_node(f));
        let fnode = fakes.node(f);
        assert!((fnode.lat - 50.04).abs() < 1e-4);
        assert_eq!(fnode.allow, Transports::ALL);

        let at_f: Vec<_> = fakes.segments_at(f).collect();
        assert_eq!(at_f.len(), 2);
        let s1 = fakes.segment(at_f[0]);
        let s2 = fakes.segment(at_f[1]);
        assert_eq!((s1.node1, s1.node2, s1.distance), (n0, f, 4.0));
        assert_eq!((s2.node1, s2.node2, s2.distance), (f, n1, 6.0));
        assert_eq!(s1.real, s);
        assert_eq!(s2.real, s);
    }

    #[test]
    fn test_fakes_preserve_oneway() {
        let flags = SegmentFlags::NORMAL.with(SegmentFlags::ONEWAY_1TO2);
        let (g, _, _, s) = two_node_graph(flags);
        let mut fakes = FakeGraph::new();
        let f = fakes.create_fakes(&g, s, 5.0, 5.0);
        for index in fakes.segments_at(f) {
            assert!(fakes.segment(index).flags.has(SegmentFlags::ONEWAY_1TO2));
        }
    }

    #[test]
    fn test_repeated_fakes_are_independent() {
        let (g, n0, _, s) = two_node_graph(SegmentFlags::NORMAL);
        let mut fakes = FakeGraph::new();
        let f1 = fakes.create_fakes(&g, s, 4.0, 6.0);
        let f2 = fakes.create_fakes(&g, s, 4.0, 6.0);
        assert_ne!(f1, f2);
        assert_eq!(fakes.node(f1), fakes.node(f2));
        assert!(fakes.extra_segment(n0, f1) != fakes.extra_segment(n0, f2));
    }

    #[test]
    fn test_same_segment_fakes_link_directly() {
        let flags = SegmentFlags::NORMAL.with(SegmentFlags::ONEWAY_1TO2);
        let (g, _, _, s) = two_node_graph(flags);
        let mut fakes = FakeGraph::new();
        let f1 = fakes.create_fakes(&g, s, 8.0, 2.0);
        let f2 = fakes.create_fakes(&g, s, 2.0, 8.0);

        // two halves each, plus the direct link between the two splits
        assert_eq!(fakes.segments_at(f1).count(), 3);
        let at_f2: Vec<_> = fakes.segments_at(f2).collect();
        assert_eq!(at_f2.len(), 3);

        let direct = at_f2
            .iter()
            .map(|&i| fakes.segment(i))
            .find(|seg| seg.node1 == f1 || seg.node2 == f1)
            .unwrap();
        // ordered along the original segment, the nearer split first
        assert_eq!((direct.node1, direct.node2), (f2, f1));
        assert!((direct.distance - 6.0).abs() < 1e-6);
        assert_eq!(direct.real, s);
        assert!(direct.flags.has(SegmentFlags::ONEWAY_1TO2));
    }

    #[test]
    fn test_extra_segment() {
        let (g, n0, n1, s) = two_node_graph(SegmentFlags::NORMAL);
        let mut fakes = FakeGraph::new();
        let f = fakes.create_fakes(&g, s, 4.0, 6.0);

        let from_n0 = fakes.extra_segment(n0, f).unwrap();
        assert_eq!(fakes.segment(from_n0).distance, 4.0);
        let from_n1 = fakes.extra_segment(n1, f).unwrap();
        assert_eq!(fakes.segment(from_n1).distance, 6.0);
        assert_eq!(fakes.extra_segment(n0, FAKE_THRESHOLD + 99), None);
    }

    #[test]
    fn test_loop_segment() {
        let (g, n0, _, s) = two_node_graph(SegmentFlags::NORMAL);
        let mut fakes = FakeGraph::new();
        let l = fakes.create_loop_segment(&g, n0, s);
        let seg = fakes.segment(l);
        assert_eq!(seg.node1, n0);
        assert_eq!(seg.node2, n0);
        assert_eq!(seg.distance, 0.0);
        assert_eq!(seg.real, NO_SEGMENT);

        fakes.clear();
        assert_eq!(fakes.segments_at(n0).count(), 0);
    }
}
