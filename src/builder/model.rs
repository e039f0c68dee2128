// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Deserializer};

use super::topology::Direction;
use crate::{Coord, RoadClass};

/// Value of the `roadType` property of a road feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoadType {
    #[default]
    Local,
    Freeway,
    Divided,
    Roundabout,
}

impl RoadType {
    /// Parses a `roadType` value. Unknown and missing values are [RoadType::Local].
    pub fn parse(s: Option<&str>) -> Self {
        match s {
            Some("freeway") => Self::Freeway,
            Some("divided") => Self::Divided,
            Some("roundabout") => Self::Roundabout,
            _ => Self::Local,
        }
    }

    /// Returns the [RoadClass] stored on edges generated from roads of this type.
    pub fn road_class(self) -> RoadClass {
        match self {
            Self::Local => RoadClass::Plain,
            Self::Freeway | Self::Divided => RoadClass::Freeway,
            Self::Roundabout => RoadClass::Roundabout,
        }
    }
}

/// Properties of a road feature relevant for edge generation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RoadProps {
    pub road_type: RoadType,

    /// Number of lanes against the drawing direction of the line.
    pub left_lanes: Option<u32>,

    /// Number of lanes along the drawing direction of the line.
    pub right_lanes: Option<u32>,

    /// Whether the road carries a `type` tag. Roads with neither a `type`
    /// nor lane counts were added by hand, and their direction can't be trusted.
    pub has_type: bool,
}

impl RoadProps {
    fn is_untagged(&self) -> bool {
        !self.has_type && self.left_lanes.is_none() && self.right_lanes.is_none()
    }

    /// Returns the direction implied by lane counts, if exactly one side has lanes.
    fn lane_direction(&self) -> Direction {
        let forward = self.right_lanes.unwrap_or(0) > 0;
        let backward = self.left_lanes.unwrap_or(0) > 0;
        match (forward, backward) {
            (true, false) => Direction::Forward,
            (false, true) => Direction::Backward,
            _ => Direction::Ambiguous,
        }
    }

    /// Computes the weights of both edges generated for a segment of `length` meters:
    /// along the line's drawing direction and against it. `None` means the edge
    /// must not be emitted.
    ///
    /// - roundabouts are one-way along the drawing direction,
    /// - freeways and divided roads get `penalty` added against the direction of traffic,
    ///   which comes from lane counts or, if those are not decisive, from the topology `vote`,
    /// - everything else is symmetric.
    pub fn edge_weights(
        &self,
        vote: Direction,
        length: f32,
        penalty: f32,
    ) -> (Option<f32>, Option<f32>) {
        match self.road_type {
            RoadType::Roundabout => (Some(length), None),
            RoadType::Freeway | RoadType::Divided if !self.is_untagged() => {
                let direction = match self.lane_direction() {
                    Direction::Ambiguous => vote,
                    d => d,
                };
                match direction {
                    Direction::Forward => (Some(length), Some(length + penalty)),
                    Direction::Backward => (Some(length + penalty), Some(length)),
                    Direction::Ambiguous => (Some(length), Some(length)),
                }
            }
            _ => (Some(length), Some(length)),
        }
    }
}

/// A single polyline road read from the input.
#[derive(Debug, Clone, PartialEq)]
pub struct Road {
    /// Index of the feature in the input collection.
    pub index: usize,
    pub coords: Vec<Coord>,
    pub props: RoadProps,
}

impl Road {
    #[inline]
    pub fn first(&self) -> Coord {
        self.coords[0]
    }

    #[inline]
    pub fn last(&self) -> Coord {
        self.coords[self.coords.len() - 1]
    }
}

/// Top-level GeoJSON document. Features are kept as raw values,
/// so that a single malformed feature doesn't fail the whole document.
#[derive(Debug, Deserialize)]
pub(super) struct RawCollection {
    #[serde(rename = "type")]
    pub kind: String,
    pub features: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub(super) struct RawFeature {
    #[serde(default)]
    pub geometry: Option<RawGeometry>,

    #[serde(default)]
    pub properties: Option<RawProps>,
}

#[derive(Debug, Deserialize)]
pub(super) struct RawGeometry {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub coordinates: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct RawProps {
    #[serde(default)]
    pub road_type: Option<String>,

    #[serde(default, deserialize_with = "lane_count")]
    pub left_lanes: Option<u32>,

    #[serde(default, deserialize_with = "lane_count")]
    pub right_lanes: Option<u32>,

    #[serde(default, rename = "type")]
    pub kind: Option<serde_json::Value>,
}

/// Reads a lane count from any JSON number. Other values are treated as missing,
/// as lanes only hint at the direction of a road.
fn lane_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(serde_json::Value::as_f64)
        .filter(|n| n.is_finite() && *n >= 0.0)
        .map(|n| n as u32))
}

impl From<RawProps> for RoadProps {
    fn from(raw: RawProps) -> Self {
        Self {
            road_type: RoadType::parse(raw.road_type.as_deref()),
            left_lanes: raw.left_lanes,
            right_lanes: raw.right_lanes,
            has_type: raw.kind.is_some(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn freeway(left_lanes: Option<u32>, right_lanes: Option<u32>) -> RoadProps {
        RoadProps {
            road_type: RoadType::Freeway,
            left_lanes,
            right_lanes,
            has_type: true,
        }
    }

    #[test]
    fn road_type_parse() {
        assert_eq!(RoadType::parse(Some("roundabout")), RoadType::Roundabout);
        assert_eq!(RoadType::parse(Some("divided")), RoadType::Divided);
        assert_eq!(RoadType::parse(Some("freeway")), RoadType::Freeway);
        assert_eq!(RoadType::parse(Some("residential")), RoadType::Local);
        assert_eq!(RoadType::parse(None), RoadType::Local);
        assert_eq!(RoadType::Divided.road_class(), RoadClass::Freeway);
    }

    #[test]
    fn roundabouts_are_one_way() {
        let p = RoadProps {
            road_type: RoadType::Roundabout,
            ..Default::default()
        };
        assert_eq!(p.edge_weights(Direction::Backward, 10.0, 300.0), (Some(10.0), None));
    }

    #[test]
    fn local_roads_are_symmetric() {
        let p = RoadProps {
            has_type: true,
            left_lanes: Some(0),
            right_lanes: Some(1),
            ..Default::default()
        };
        assert_eq!(p.edge_weights(Direction::Forward, 10.0, 300.0), (Some(10.0), Some(10.0)));
    }

    #[test]
    fn lane_counts_take_precedence_over_vote() {
        let p = freeway(Some(0), Some(2));
        assert_eq!(p.edge_weights(Direction::Backward, 10.0, 300.0), (Some(10.0), Some(310.0)));

        let p = freeway(Some(3), None);
        assert_eq!(p.edge_weights(Direction::Forward, 10.0, 300.0), (Some(310.0), Some(10.0)));
    }

    #[test]
    fn vote_decides_without_lane_data() {
        let p = freeway(None, None);
        assert_eq!(p.edge_weights(Direction::Forward, 10.0, 300.0), (Some(10.0), Some(310.0)));
        assert_eq!(p.edge_weights(Direction::Backward, 10.0, 300.0), (Some(310.0), Some(10.0)));
        assert_eq!(p.edge_weights(Direction::Ambiguous, 10.0, 300.0), (Some(10.0), Some(10.0)));

        // Both sides have lanes: not decisive either
        let p = freeway(Some(2), Some(2));
        assert_eq!(p.edge_weights(Direction::Backward, 10.0, 300.0), (Some(310.0), Some(10.0)));
    }

    #[test]
    fn untagged_freeways_are_symmetric() {
        let p = RoadProps {
            road_type: RoadType::Divided,
            ..Default::default()
        };
        assert_eq!(p.edge_weights(Direction::Forward, 10.0, 300.0), (Some(10.0), Some(10.0)));
    }

    #[test]
    fn raw_props_conversion() {
        let raw: RawProps =
            serde_json::from_str(r#"{"roadType": "freeway", "rightLanes": 2, "type": null}"#).unwrap();
        let props = RoadProps::from(raw);
        assert_eq!(props.road_type, RoadType::Freeway);
        assert_eq!(props.right_lanes, Some(2));
        assert_eq!(props.left_lanes, None);
        assert!(!props.has_type);

        let raw: RawProps = serde_json::from_str(r#"{"type": "motorway"}"#).unwrap();
        assert!(RoadProps::from(raw).has_type);
    }

    #[test]
    fn lane_counts_are_read_leniently() {
        let raw: RawProps =
            serde_json::from_str(r#"{"roadType": "freeway", "leftLanes": 0, "rightLanes": 2.0}"#).unwrap();
        let props = RoadProps::from(raw);
        assert_eq!(props.right_lanes, Some(2));
        assert_eq!(props.left_lanes, Some(0));
        assert_eq!(props.lane_direction(), Direction::Forward);

        let raw: RawProps =
            serde_json::from_str(r#"{"leftLanes": "many", "rightLanes": -1, "type": "road"}"#).unwrap();
        let props = RoadProps::from(raw);
        assert_eq!(props.left_lanes, None);
        assert_eq!(props.right_lanes, None);
        assert!(props.has_type);
    }
}
