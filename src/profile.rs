// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use crate::graph::Way;
use crate::router::Error;
use crate::types::{
    Optimize, Score, Transport, Transports, HIGHWAY_COUNT, PROPERTIES, PROPERTY_COUNT,
};

/// Routing preferences of a single transport.
///
/// `highway` and `props` hold preferences in `[0, 1]`; `speed` holds
/// maximum speeds in km/h. A zero highway preference (or speed, when
/// optimizing for duration) makes that class of ways unusable.
///
/// Profiles must be normalized with [Profile::prepared] before being
/// handed to the route search; the `allow`, `max_pref`, `max_speed`,
/// `props_yes` and `props_no` fields are derived there and may be left
/// zeroed in hand-written profiles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Profile {
    pub transport: Transport,

    /// Preference per [Highway](crate::types::Highway) class, in index order.
    pub highway: [f32; HIGHWAY_COUNT],

    /// Maximum speed per highway class in km/h; 0 means the class is not
    /// usable when optimizing for duration.
    pub speed: [f32; HIGHWAY_COUNT],

    /// Preference for each [Property](crate::types::Property) being present,
    /// in index order. 0.5 is neutral; 1 requires it, 0 forbids it.
    pub props: [f32; PROPERTY_COUNT],

    /// Whether one-way restrictions apply to this transport.
    pub oneway: bool,

    /// Whether turn restrictions apply to this transport.
    pub turns: bool,

    /// Vehicle dimensions checked against way limits; 0 means unchecked.
    pub weight: f32,
    pub height: f32,
    pub width: f32,
    pub length: f32,

    // Derived by prepared():
    pub allow: Transports,
    pub max_pref: f32,
    pub max_speed: f32,
    pub props_yes: [f32; PROPERTY_COUNT],
    pub props_no: [f32; PROPERTY_COUNT],
}

/// Property preferences close to zero blow the score up without actually
/// forbidding anything; clamp them so only an exact 0 is a hard "no".
fn normalize_pref(p: f32) -> f32 {
    if p == 0.0 {
        0.0
    } else if p < 0.1 {
        0.1
    } else {
        p
    }
}

impl Profile {
    /// Returns a copy of this profile with the derived fields filled in,
    /// or an error if no way could ever be used with it.
    pub fn prepared(&self) -> Result<Profile, Error> {
        let mut out = *self;
        out.allow = Transports::single(self.transport);

        for i in 0..PROPERTY_COUNT {
            let p = self.props[i];
            if !(0.0..=1.0).contains(&p) {
                return Err(Error::InvalidProfile("property preference outside [0, 1]"));
            }
            out.props_yes[i] = normalize_pref(p.sqrt());
            out.props_no[i] = normalize_pref((1.0 - p).sqrt());
        }

        let mut max_props = 1.0_f32;
        for i in 0..PROPERTY_COUNT {
            max_props *= out.props_yes[i].max(out.props_no[i]);
        }

        out.max_pref = 0.0;
        out.max_speed = 0.0;
        for i in 0..HIGHWAY_COUNT {
            if !(0.0..=1.0).contains(&self.highway[i]) {
                return Err(Error::InvalidProfile("highway preference outside [0, 1]"));
            }
            out.max_pref = out.max_pref.max(self.highway[i] * max_props);
            out.max_speed = out.max_speed.max(self.speed[i]);
        }

        if out.max_pref <= 0.0 {
            return Err(Error::InvalidProfile("no highway class is usable"));
        }

        Ok(out)
    }

    /// Travel time over `distance` km of `way`, in hours. The effective
    /// speed is the lower of the way's limit and the profile's speed for
    /// the highway class; with neither known, a 10 hour penalty applies.
    pub fn duration(&self, way: &Way, distance: f32) -> f32 {
        let limit = way.speed;
        let own = self.speed[way.highway as usize];
        let speed = if limit > 0.0 && own > 0.0 {
            limit.min(own)
        } else if limit > 0.0 {
            limit
        } else if own > 0.0 {
            own
        } else {
            return 10.0;
        };
        distance / speed
    }

    /// Scores the traversal of `distance` km of `way`, or None when the
    /// way is not usable by this profile at all: transport not allowed,
    /// a dimension limit exceeded, or a zero preference.
    pub fn score_segment(&self, way: &Way, distance: f32, optimize: Optimize) -> Option<Score> {
        if !way.allow.intersects(self.allow) {
            return None;
        }
        if (way.weight > 0.0 && self.weight > way.weight)
            || (way.height > 0.0 && self.height > way.height)
            || (way.width > 0.0 && self.width > way.width)
            || (way.length > 0.0 && self.length > way.length)
        {
            return None;
        }

        let mut pref = self.highway[way.highway as usize];
        for (i, property) in PROPERTIES.iter().enumerate() {
            pref *= if way.props.has(*property) {
                self.props_yes[i]
            } else {
                self.props_no[i]
            };
        }
        if pref <= 0.0 {
            return None;
        }

        let base = match optimize {
            Optimize::Distance => distance,
            Optimize::Duration => self.duration(way, distance),
        };
        Some(base / pref)
    }
}

/// Default profile for routing motorcars.
pub const CAR_PROFILE: Profile = Profile {
    transport: Transport::Motorcar,
    //        mway  trunk prim  sec   tert  uncl  resi  serv  track cycl  path  steps
    highway: [1.00, 1.00, 0.90, 0.80, 0.70, 0.60, 0.50, 0.40, 0.00, 0.00, 0.00, 0.00],
    speed: [112.0, 96.0, 96.0, 88.0, 80.0, 64.0, 48.0, 32.0, 16.0, 0.0, 0.0, 0.0],
    //      paved mlane bridg tunnl footr bikr
    props: [1.00, 0.60, 0.50, 0.50, 0.45, 0.45],
    oneway: true,
    turns: true,
    weight: 0.0,
    height: 0.0,
    width: 0.0,
    length: 0.0,
    allow: Transports::NONE,
    max_pref: 0.0,
    max_speed: 0.0,
    props_yes: [0.0; PROPERTY_COUNT],
    props_no: [0.0; PROPERTY_COUNT],
};

/// Default profile for routing bicycles.
pub const BICYCLE_PROFILE: Profile = Profile {
    transport: Transport::Bicycle,
    highway: [0.00, 0.30, 0.70, 0.80, 0.90, 0.90, 0.90, 0.90, 0.90, 1.00, 0.90, 0.50],
    speed: [0.0, 20.0, 20.0, 20.0, 20.0, 20.0, 20.0, 20.0, 18.0, 20.0, 18.0, 4.0],
    props: [0.90, 0.25, 0.50, 0.50, 0.55, 0.75],
    oneway: true,
    turns: true,
    weight: 0.0,
    height: 0.0,
    width: 0.0,
    length: 0.0,
    allow: Transports::NONE,
    max_pref: 0.0,
    max_speed: 0.0,
    props_yes: [0.0; PROPERTY_COUNT],
    props_no: [0.0; PROPERTY_COUNT],
};

/// Default profile for routing pedestrians. Ignores one-way and turn
/// restrictions, which do not apply to foot traffic.
pub const FOOT_PROFILE: Profile = Profile {
    transport: Transport::Foot,
    highway: [0.00, 0.40, 0.50, 0.60, 0.70, 0.80, 0.90, 0.90, 0.95, 0.95, 1.00, 0.80],
    speed: [0.0, 4.0, 4.0, 4.0, 4.0, 4.0, 4.0, 4.0, 4.0, 4.0, 4.0, 4.0],
    props: [0.80, 0.25, 0.50, 0.50, 0.75, 0.50],
    oneway: false,
    turns: false,
    weight: 0.0,
    height: 0.0,
    width: 0.0,
    length: 0.0,
    allow: Transports::NONE,
    max_pref: 0.0,
    max_speed: 0.0,
    props_yes: [0.0; PROPERTY_COUNT],
    props_no: [0.0; PROPERTY_COUNT],
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Highway, Properties, Property};

    fn residential() -> Way {
        Way::new(Highway::Residential, Transports::ALL, Properties::NONE, 50.0)
    }

    #[test]
    fn test_prepared_derives_fields() {
        let p = CAR_PROFILE.prepared().unwrap();
        assert_eq!(p.allow, Transports::single(Transport::Motorcar));
        assert!(p.max_pref > 0.0);
        assert_eq!(p.max_speed, 112.0);
        // paved = 1.0: yes is 1, no is exactly 0 (unpaved ways forbidden)
        assert_eq!(p.props_yes[Property::Paved as usize], 1.0);
        assert_eq!(p.props_no[Property::Paved as usize], 0.0);
        // neutral 0.5 splits evenly
        let half = 0.5_f32.sqrt();
        assert!((p.props_yes[Property::Bridge as usize] - half).abs() < 1e-6);
        assert!((p.props_no[Property::Bridge as usize] - half).abs() < 1e-6);
    }

    #[test]
    fn test_prepared_clamps_tiny_prefs() {
        let mut raw = CAR_PROFILE;
        raw.props = [0.5, 0.5, 0.5, 0.5, 0.5, 0.005];
        let p = raw.prepared().unwrap();
        assert_eq!(p.props_yes[5], 0.1); // sqrt(0.005) < 0.1
    }

    #[test]
    fn test_prepared_rejects_useless_profile() {
        let mut raw = CAR_PROFILE;
        raw.highway = [0.0; HIGHWAY_COUNT];
        assert!(matches!(raw.prepared(), Err(Error::InvalidProfile(_))));
    }

    #[test]
    fn test_score_gates() {
        let p = CAR_PROFILE.prepared().unwrap();

        let mut way = residential();
        way.props = Properties::NONE.with(Property::Paved);
        assert!(p.score_segment(&way, 1.0, Optimize::Distance).is_some());

        // transport not allowed
        let mut foot_only = way;
        foot_only.allow = Transports::single(Transport::Foot);
        assert_eq!(p.score_segment(&foot_only, 1.0, Optimize::Distance), None);

        // zero highway preference
        let mut track = way;
        track.highway = Highway::Track;
        assert_eq!(p.score_segment(&track, 1.0, Optimize::Distance), None);

        // unpaved forbidden when paved preference is exactly 1
        assert_eq!(p.score_segment(&residential(), 1.0, Optimize::Distance), None);

        // weight limit
        let mut heavy = p;
        heavy.weight = 40.0;
        let mut limited = way;
        limited.weight = 3.5;
        assert_eq!(heavy.score_segment(&limited, 1.0, Optimize::Distance), None);
        limited.weight = 44.0;
        assert!(heavy.score_segment(&limited, 1.0, Optimize::Distance).is_some());
    }

    #[test]
    fn test_score_is_distance_over_pref() {
        let p = CAR_PROFILE.prepared().unwrap();
        let mut way = residential();
        way.props = Properties::NONE.with(Property::Paved);

        // residential pref 0.5, neutral props contribute sqrt(0.5) each
        let neutral = 0.5_f32.sqrt();
        let pref = 0.5 * 1.0 * (1.0 - 0.6_f32).sqrt() * neutral * neutral
            * (1.0 - 0.45_f32).sqrt() * (1.0 - 0.45_f32).sqrt();
        let got = p.score_segment(&way, 2.0, Optimize::Distance).unwrap();
        assert!((got - 2.0 / pref).abs() < 1e-4, "got {}", got);
    }

    #[test]
    fn test_duration() {
        let p = CAR_PROFILE.prepared().unwrap();
        let mut way = residential();
        way.props = Properties::NONE.with(Property::Paved);

        // way limit 50 vs profile 48 for residential: 48 wins
        assert!((p.duration(&way, 48.0) - 1.0).abs() < 1e-6);

        way.speed = 30.0;
        assert!((p.duration(&way, 30.0) - 1.0).abs() < 1e-6);

        // neither speed known: flat 10 hour penalty
        way.speed = 0.0;
        way.highway = Highway::Cycleway;
        assert_eq!(p.duration(&way, 1.0), 10.0);
    }
}
