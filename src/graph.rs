// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use crate::great_circle_distance;
use crate::types::{
    Highway, NodeIndex, Properties, RelationIndex, SegmentFlags, SegmentIndex, Transports,
    WayIndex, NO_SEGMENT,
};

/// A point of the road network.
///
/// Nodes are immutable once the [Graph] has been built. `first_segment` is
/// the head of the incident-segment chain and is maintained by
/// [GraphBuilder]; walk it through [Graph::segments_at].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Node {
    pub lat: f32,
    pub lon: f32,

    /// Transports allowed to pass through this node. A node disallowing the
    /// active transport (e.g. a locked gate) may still be entered, but the
    /// only admissible departure is back along the arrival segment.
    pub allow: Transports,

    /// Whether this node belongs to the coarse (super) graph.
    pub super_node: bool,

    /// Whether any [TurnRelation] uses this node as its via-node.
    pub turn_restricted: bool,

    pub(crate) first_segment: SegmentIndex,
}

/// A directed or undirected edge of the road network.
///
/// One-way direction and layer membership are carried in `flags`. The
/// `next1`/`next2` links chain all segments incident to `node1`/`node2`
/// respectively and are maintained by [GraphBuilder].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub node1: NodeIndex,
    pub node2: NodeIndex,
    pub way: WayIndex,

    /// Length of the segment in kilometers.
    pub distance: f32,

    pub flags: SegmentFlags,

    pub(crate) next1: SegmentIndex,
    pub(crate) next2: SegmentIndex,
}

impl Segment {
    /// Checks whether departing from `node` over this segment goes against
    /// its one-way direction.
    pub fn oneway_against(&self, node: NodeIndex) -> bool {
        (self.flags.has(SegmentFlags::ONEWAY_2TO1) && node == self.node1)
            || (self.flags.has(SegmentFlags::ONEWAY_1TO2) && node == self.node2)
    }
}

/// Aggregated attributes shared by the segments of one road.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Way {
    pub highway: Highway,
    pub allow: Transports,
    pub props: Properties,

    /// Speed limit in km/h; 0 means no limit is known.
    pub speed: f32,

    /// Vehicle restrictions; 0 means unrestricted.
    pub weight: f32,
    pub height: f32,
    pub width: f32,
    pub length: f32,
}

impl Way {
    pub fn new(highway: Highway, allow: Transports, props: Properties, speed: f32) -> Self {
        Self {
            highway,
            allow,
            props,
            speed,
            weight: 0.0,
            height: 0.0,
            width: 0.0,
            length: 0.0,
        }
    }
}

/// A single turn restriction: the transition from `from` over `via`
/// onto `to` is denied to all transports in `excluded`.
///
/// Restrictions are an explicit denylist - any transition without a
/// matching relation is allowed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TurnRelation {
    pub from: SegmentIndex,
    pub via: NodeIndex,
    pub to: SegmentIndex,
    pub excluded: Transports,
}

/// An immutable road network: nodes, segments, ways and turn relations,
/// with a marked subset of super-nodes interconnected by super-segments
/// carrying precomputed shortest real-path distances.
///
/// Built once through [GraphBuilder]; read-only afterwards, so concurrent
/// route calculations may share it freely.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: Vec<Node>,
    segments: Vec<Segment>,
    ways: Vec<Way>,
    relations: Vec<TurnRelation>,
}

impl Graph {
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_segments(&self) -> usize {
        self.segments.len()
    }

    pub fn node(&self, index: NodeIndex) -> &Node {
        &self.nodes[index as usize]
    }

    pub fn segment(&self, index: SegmentIndex) -> &Segment {
        &self.segments[index as usize]
    }

    pub fn way(&self, index: WayIndex) -> &Way {
        &self.ways[index as usize]
    }

    /// Returns the endpoint of `segment` other than `node`.
    pub fn other_node(&self, segment: &Segment, node: NodeIndex) -> NodeIndex {
        if segment.node1 == node {
            segment.node2
        } else {
            segment.node1
        }
    }

    /// Iterates over the indices of all segments incident to `node`,
    /// in the order they were added to the builder.
    pub fn segments_at(&self, node: NodeIndex) -> SegmentsAt<'_> {
        SegmentsAt {
            graph: self,
            node,
            cur: self.node(node).first_segment,
        }
    }

    /// Finds the closest node to the given position, by checking the
    /// distance to every node in the graph. Not suitable for large graphs.
    pub fn nearest_node(&self, lat: f32, lon: f32) -> Option<NodeIndex> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (great_circle_distance(lat, lon, n.lat, n.lon), i))
            .min_by(|(a, _), (b, _)| a.total_cmp(b))
            .map(|(_, i)| i as NodeIndex)
    }

    /// Finds the first turn relation with the given via-node, or, when
    /// `from` is not [NO_SEGMENT], with the given (via, from) pair.
    /// Relations sharing a key are stored contiguously; walk them with
    /// [Graph::next_restriction].
    pub fn first_restriction(
        &self,
        via: NodeIndex,
        from: SegmentIndex,
    ) -> Option<RelationIndex> {
        let start = self.relations.partition_point(|r| {
            r.via < via || (r.via == via && from != NO_SEGMENT && r.from < from)
        });
        match self.relations.get(start) {
            Some(r) if r.via == via && (from == NO_SEGMENT || r.from == from) => {
                Some(start as RelationIndex)
            }
            _ => None,
        }
    }

    /// Returns the next relation in the run started by
    /// [Graph::first_restriction], or None when the run ends. `from` must
    /// be the same key form the run was found with: [NO_SEGMENT] walks the
    /// whole via-node run, a real segment stops at its (via, from) slice.
    pub fn next_restriction(
        &self,
        current: RelationIndex,
        from: SegmentIndex,
    ) -> Option<RelationIndex> {
        let cur = &self.relations[current as usize];
        match self.relations.get(current as usize + 1) {
            Some(r) if r.via == cur.via && (from == NO_SEGMENT || r.from == from) => {
                Some(current + 1)
            }
            _ => None,
        }
    }

    /// Checks whether the transition from `from` over `via` onto `to` is
    /// allowed for the given transports. `first` must be the result of
    /// [Graph::first_restriction] for (via, from).
    ///
    /// Turning is allowed by default: this returns false only if some
    /// relation in the run matches exactly and excludes the transport.
    pub fn is_turn_allowed(
        &self,
        first: RelationIndex,
        via: NodeIndex,
        from: SegmentIndex,
        to: SegmentIndex,
        transports: Transports,
    ) -> bool {
        let mut index = first;
        loop {
            let r = &self.relations[index as usize];
            debug_assert_eq!(r.via, via);
            if r.from == from && r.to == to && r.excluded.intersects(transports) {
                return false;
            }
            match self.next_restriction(index, from) {
                Some(next) => index = next,
                None => return true,
            }
        }
    }
}

/// Iterator over the segments incident to one node. See [Graph::segments_at].
#[derive(Debug, Clone)]
pub struct SegmentsAt<'a> {
    graph: &'a Graph,
    node: NodeIndex,
    cur: SegmentIndex,
}

impl<'a> Iterator for SegmentsAt<'a> {
    type Item = SegmentIndex;

    fn next(&mut self) -> Option<SegmentIndex> {
        if self.cur == NO_SEGMENT {
            return None;
        }
        let index = self.cur;
        let segment = self.graph.segment(index);
        self.cur = if segment.node1 == self.node {
            segment.next1
        } else {
            segment.next2
        };
        Some(index)
    }
}

/// Assembles an immutable [Graph]: collects nodes, ways, segments and turn
/// relations, then links the adjacency chains and sorts the relation index
/// in [GraphBuilder::build].
#[derive(Debug, Default)]
pub struct GraphBuilder {
    nodes: Vec<Node>,
    segments: Vec<Segment>,
    ways: Vec<Way>,
    relations: Vec<TurnRelation>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, lat: f32, lon: f32, allow: Transports, super_node: bool) -> NodeIndex {
        self.nodes.push(Node {
            lat,
            lon,
            allow,
            super_node,
            turn_restricted: false,
            first_segment: NO_SEGMENT,
        });
        (self.nodes.len() - 1) as NodeIndex
    }

    pub fn add_way(&mut self, way: Way) -> WayIndex {
        self.ways.push(way);
        (self.ways.len() - 1) as WayIndex
    }

    pub fn add_segment(
        &mut self,
        node1: NodeIndex,
        node2: NodeIndex,
        way: WayIndex,
        distance: f32,
        flags: SegmentFlags,
    ) -> SegmentIndex {
        assert!((node1 as usize) < self.nodes.len());
        assert!((node2 as usize) < self.nodes.len());
        assert!((way as usize) < self.ways.len());
        assert_ne!(node1, node2);
        self.segments.push(Segment {
            node1,
            node2,
            way,
            distance,
            flags,
            next1: NO_SEGMENT,
            next2: NO_SEGMENT,
        });
        (self.segments.len() - 1) as SegmentIndex
    }

    pub fn add_relation(
        &mut self,
        from: SegmentIndex,
        via: NodeIndex,
        to: SegmentIndex,
        excluded: Transports,
    ) {
        assert!((from as usize) < self.segments.len());
        assert!((to as usize) < self.segments.len());
        assert!((via as usize) < self.nodes.len());
        self.relations.push(TurnRelation {
            from,
            via,
            to,
            excluded,
        });
    }

    /// Links the per-node adjacency chains, sorts the turn-relation index
    /// and marks via-nodes as turn-restricted.
    pub fn build(mut self) -> Graph {
        let mut last: Vec<SegmentIndex> = vec![NO_SEGMENT; self.nodes.len()];

        for index in 0..self.segments.len() {
            let (node1, node2) = {
                let s = &self.segments[index];
                (s.node1, s.node2)
            };
            for node in [node1, node2] {
                let prev = last[node as usize];
                if prev == NO_SEGMENT {
                    self.nodes[node as usize].first_segment = index as SegmentIndex;
                } else {
                    let p = &mut self.segments[prev as usize];
                    if p.node1 == node {
                        p.next1 = index as SegmentIndex;
                    } else {
                        p.next2 = index as SegmentIndex;
                    }
                }
                last[node as usize] = index as SegmentIndex;
            }
        }

        self.relations
            .sort_by(|a, b| (a.via, a.from, a.to).cmp(&(b.via, b.from, b.to)));
        for r in &self.relations {
            self.nodes[r.via as usize].turn_restricted = true;
        }

        Graph {
            nodes: self.nodes,
            segments: self.segments,
            ways: self.ways,
            relations: self.relations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Highway, Transport};

    fn way() -> Way {
        Way::new(Highway::Residential, Transports::ALL, Properties::NONE, 50.0)
    }

    fn triangle() -> (Graph, [NodeIndex; 3], [SegmentIndex; 3]) {
        let mut b = GraphBuilder::new();
        let n0 = b.add_node(50.00, 20.00, Transports::ALL, false);
        let n1 = b.add_node(50.01, 20.00, Transports::ALL, false);
        let n2 = b.add_node(50.00, 20.01, Transports::ALL, false);
        let w = b.add_way(way());
        let s01 = b.add_segment(n0, n1, w, 1.0, SegmentFlags::NORMAL);
        let s12 = b.add_segment(n1, n2, w, 1.0, SegmentFlags::NORMAL);
        let s20 = b.add_segment(n2, n0, w, 1.0, SegmentFlags::NORMAL);
        (b.build(), [n0, n1, n2], [s01, s12, s20])
    }

    #[test]
    fn test_adjacency_chains() {
        let (g, [n0, n1, n2], [s01, s12, s20]) = triangle();

        let at_n0: Vec<_> = g.segments_at(n0).collect();
        let at_n1: Vec<_> = g.segments_at(n1).collect();
        let at_n2: Vec<_> = g.segments_at(n2).collect();

        assert_eq!(at_n0, vec![s01, s20]);
        assert_eq!(at_n1, vec![s01, s12]);
        assert_eq!(at_n2, vec![s12, s20]);
    }

    #[test]
    fn test_other_node() {
        let (g, [n0, n1, _], [s01, _, _]) = triangle();
        let s = g.segment(s01);
        assert_eq!(g.other_node(s, n0), n1);
        assert_eq!(g.other_node(s, n1), n0);
    }

    #[test]
    fn test_oneway_against() {
        let mut b = GraphBuilder::new();
        let n0 = b.add_node(50.0, 20.0, Transports::ALL, false);
        let n1 = b.add_node(50.1, 20.0, Transports::ALL, false);
        let w = b.add_way(way());
        let s = b.add_segment(n0, n1, w, 1.0, SegmentFlags::NORMAL.with(SegmentFlags::ONEWAY_1TO2));
        let g = b.build();
        assert!(!g.segment(s).oneway_against(n0));
        assert!(g.segment(s).oneway_against(n1));
    }

    #[test]
    fn test_restriction_index() {
        let (g, [n0, n1, n2], [s01, s12, s20]) = {
            let mut b = GraphBuilder::new();
            let n0 = b.add_node(50.00, 20.00, Transports::ALL, false);
            let n1 = b.add_node(50.01, 20.00, Transports::ALL, false);
            let n2 = b.add_node(50.00, 20.01, Transports::ALL, false);
            let w = b.add_way(way());
            let s01 = b.add_segment(n0, n1, w, 1.0, SegmentFlags::NORMAL);
            let s12 = b.add_segment(n1, n2, w, 1.0, SegmentFlags::NORMAL);
            let s20 = b.add_segment(n2, n0, w, 1.0, SegmentFlags::NORMAL);
            // Added out of order on purpose; build() sorts by (via, from, to).
            b.add_relation(s12, n1, s01, Transports::single(Transport::Motorcar));
            b.add_relation(s01, n1, s12, Transports::single(Transport::Motorcar));
            (b.build(), [n0, n1, n2], [s01, s12, s20])
        };

        assert!(g.node(n1).turn_restricted);
        assert!(!g.node(n0).turn_restricted);

        // By via-node only
        let first = g.first_restriction(n1, NO_SEGMENT).unwrap();
        assert_eq!(g.first_restriction(n0, NO_SEGMENT), None);
        assert_eq!(g.first_restriction(n2, NO_SEGMENT), None);

        // By (via, from) pair
        let by_from = g.first_restriction(n1, s01).unwrap();
        assert_eq!(first, by_from); // s01 < s12, so it sorts first

        // The via-only walk spans the whole via run, the (via, from) walk
        // stops at its from boundary
        let second = g.next_restriction(first, NO_SEGMENT).unwrap();
        assert_eq!(g.next_restriction(second, NO_SEGMENT), None);
        assert_eq!(g.next_restriction(by_from, s01), None);

        // The denied transition is denied for the excluded transport only
        let car = Transports::single(Transport::Motorcar);
        let foot = Transports::single(Transport::Foot);
        assert!(!g.is_turn_allowed(by_from, n1, s01, s12, car));
        assert!(g.is_turn_allowed(by_from, n1, s01, s12, foot));

        // A transition with no matching relation is allowed
        assert!(g.is_turn_allowed(by_from, n1, s01, s20, car));
    }

    #[test]
    fn test_nearest_node() {
        let (g, [n0, n1, _], _) = triangle();
        assert_eq!(g.nearest_node(50.001, 20.0), Some(n0));
        assert_eq!(g.nearest_node(50.012, 20.0), Some(n1));
        assert_eq!(Graph::default().nearest_node(0.0, 0.0), None);
    }
}
