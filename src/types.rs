// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::str::FromStr;

/// Index of a [Node](crate::graph::Node) in the [Graph](crate::Graph),
/// or of a fake node in the [FakeGraph](crate::fake::FakeGraph).
pub type NodeIndex = u32;

/// Index of a [Segment](crate::graph::Segment) in the [Graph](crate::Graph),
/// or of a fake segment in the [FakeGraph](crate::fake::FakeGraph).
pub type SegmentIndex = u32;

/// Index of a [Way](crate::graph::Way) in the [Graph](crate::Graph).
pub type WayIndex = u32;

/// Index of a [TurnRelation](crate::graph::TurnRelation) in the [Graph](crate::Graph).
pub type RelationIndex = u32;

/// Sentinel denoting the absence of a node.
pub const NO_NODE: NodeIndex = u32::MAX;

/// Sentinel denoting the absence of a segment.
pub const NO_SEGMENT: SegmentIndex = u32::MAX;

/// Sentinel denoting the absence of a turn relation.
pub const NO_RELATION: RelationIndex = u32::MAX;

/// First index of the fake node and segment space. Real graph indices are
/// always below this threshold, fake indices at or above it (but below the
/// `NO_*` sentinels), so the two spaces never alias.
pub const FAKE_THRESHOLD: u32 = 0xFFFF_0000;

/// Checks whether a node index refers to a fake node.
pub fn is_fake_node(node: NodeIndex) -> bool {
    node >= FAKE_THRESHOLD && node != NO_NODE
}

/// Checks whether a segment index refers to a fake segment.
pub fn is_fake_segment(segment: SegmentIndex) -> bool {
    segment >= FAKE_THRESHOLD && segment != NO_SEGMENT
}

/// A cumulative routing score: kilometres (when optimizing for distance) or
/// hours (when optimizing for duration), divided by the applicable preference.
pub type Score = f32;

/// What quantity the route search minimizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Optimize {
    /// Minimize weighted distance ("shortest").
    #[default]
    Distance,
    /// Minimize weighted travel time ("quickest").
    Duration,
}

/// A single mode of transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Transport {
    Foot = 0,
    Horse,
    Wheelchair,
    Bicycle,
    Moped,
    Motorcycle,
    Motorcar,
    Goods,
    Hgv,
    Psv,
}

/// The number of [Transport] variants.
pub const TRANSPORT_COUNT: usize = 10;

impl FromStr for Transport {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "foot" => Ok(Self::Foot),
            "horse" => Ok(Self::Horse),
            "wheelchair" => Ok(Self::Wheelchair),
            "bicycle" => Ok(Self::Bicycle),
            "moped" => Ok(Self::Moped),
            "motorcycle" => Ok(Self::Motorcycle),
            "motorcar" => Ok(Self::Motorcar),
            "goods" => Ok(Self::Goods),
            "hgv" => Ok(Self::Hgv),
            "psv" => Ok(Self::Psv),
            _ => Err(UnknownName(s.to_string())),
        }
    }
}

/// A set of [Transports](Transport), stored as a bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Transports(pub u16);

impl Transports {
    /// The empty set.
    pub const NONE: Self = Self(0);

    /// The set of all known transports.
    pub const ALL: Self = Self((1 << TRANSPORT_COUNT as u16) - 1);

    /// A set containing a single transport.
    pub fn single(transport: Transport) -> Self {
        Self(1 << transport as u16)
    }

    /// Checks if any transport of `other` is contained in this set.
    pub fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Returns the union of two sets.
    pub fn with(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// The highway classification of a [Way](crate::graph::Way).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Highway {
    Motorway = 0,
    Trunk,
    Primary,
    Secondary,
    Tertiary,
    Unclassified,
    Residential,
    Service,
    Track,
    Cycleway,
    Path,
    Steps,
}

/// The number of [Highway] variants.
pub const HIGHWAY_COUNT: usize = 12;

impl FromStr for Highway {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "motorway" => Ok(Self::Motorway),
            "trunk" => Ok(Self::Trunk),
            "primary" => Ok(Self::Primary),
            "secondary" => Ok(Self::Secondary),
            "tertiary" => Ok(Self::Tertiary),
            "unclassified" => Ok(Self::Unclassified),
            "residential" => Ok(Self::Residential),
            "service" => Ok(Self::Service),
            "track" => Ok(Self::Track),
            "cycleway" => Ok(Self::Cycleway),
            "path" => Ok(Self::Path),
            "steps" => Ok(Self::Steps),
            _ => Err(UnknownName(s.to_string())),
        }
    }
}

/// A tracked physical property of a [Way](crate::graph::Way).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Property {
    Paved = 0,
    Multilane,
    Bridge,
    Tunnel,
    FootRoute,
    BicycleRoute,
}

/// The number of [Property] variants.
pub const PROPERTY_COUNT: usize = 6;

/// All [Property] variants, in index order.
pub const PROPERTIES: [Property; PROPERTY_COUNT] = [
    Property::Paved,
    Property::Multilane,
    Property::Bridge,
    Property::Tunnel,
    Property::FootRoute,
    Property::BicycleRoute,
];

impl FromStr for Property {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "paved" => Ok(Self::Paved),
            "multilane" => Ok(Self::Multilane),
            "bridge" => Ok(Self::Bridge),
            "tunnel" => Ok(Self::Tunnel),
            "footroute" => Ok(Self::FootRoute),
            "bicycleroute" => Ok(Self::BicycleRoute),
            _ => Err(UnknownName(s.to_string())),
        }
    }
}

/// A set of [Properties](Property), stored as a bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Properties(pub u8);

impl Properties {
    /// The empty set.
    pub const NONE: Self = Self(0);

    /// Checks if a property is contained in this set.
    pub fn has(self, property: Property) -> bool {
        self.0 & (1 << property as u8) != 0
    }

    /// Returns this set with `property` added.
    pub fn with(self, property: Property) -> Self {
        Self(self.0 | (1 << property as u8))
    }
}

/// Flags of a [Segment](crate::graph::Segment).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SegmentFlags(pub u8);

impl SegmentFlags {
    /// The segment may be used by the local (normal) search phases.
    pub const NORMAL: Self = Self(1);

    /// The segment belongs to the coarse (super) graph. A segment directly
    /// connecting two super-nodes may be both NORMAL and SUPER.
    pub const SUPER: Self = Self(2);

    /// Traffic is only allowed from `node1` to `node2`.
    pub const ONEWAY_1TO2: Self = Self(4);

    /// Traffic is only allowed from `node2` to `node1`.
    pub const ONEWAY_2TO1: Self = Self(8);

    pub fn has(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    pub fn with(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub fn is_normal(self) -> bool {
        self.has(Self::NORMAL)
    }

    pub fn is_super(self) -> bool {
        self.has(Self::SUPER)
    }
}

/// Error raised when parsing an unrecognized transport, highway or
/// property name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown name: {0:?}")]
pub struct UnknownName(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transports_bitmask() {
        let t = Transports::single(Transport::Motorcar).with(Transports::single(Transport::Goods));
        assert!(t.intersects(Transports::single(Transport::Motorcar)));
        assert!(t.intersects(Transports::ALL));
        assert!(!t.intersects(Transports::single(Transport::Foot)));
        assert!(!Transports::NONE.intersects(Transports::ALL));
    }

    #[test]
    fn test_fake_index_spaces_never_alias() {
        assert!(!is_fake_node(0));
        assert!(!is_fake_node(FAKE_THRESHOLD - 1));
        assert!(is_fake_node(FAKE_THRESHOLD));
        assert!(!is_fake_node(NO_NODE));
        assert!(is_fake_segment(FAKE_THRESHOLD + 7));
        assert!(!is_fake_segment(NO_SEGMENT));
    }

    #[test]
    fn test_segment_flags() {
        let f = SegmentFlags::NORMAL.with(SegmentFlags::SUPER);
        assert!(f.is_normal());
        assert!(f.is_super());
        assert!(!f.has(SegmentFlags::ONEWAY_1TO2));
    }

    #[test]
    fn test_names_parse() {
        assert_eq!("motorcar".parse::<Transport>(), Ok(Transport::Motorcar));
        assert_eq!("residential".parse::<Highway>(), Ok(Highway::Residential));
        assert_eq!("paved".parse::<Property>(), Ok(Property::Paved));
        assert!("freeway".parse::<Highway>().is_err());
    }
}
