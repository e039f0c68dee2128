// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use serde::Deserialize;

use super::stats::StatsProfile;
use crate::{CostProfile, DEFAULT_MAX_NODES, TRUCK_PROFILE};

/// A single step of the destination radius escalation: up to `limit` nodes
/// closest to the target, taken from a square window of half-width `radius_deg` degrees.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct SearchRadius {
    pub limit: usize,
    pub radius_deg: f64,
}

impl SearchRadius {
    pub const fn new(limit: usize, radius_deg: f64) -> Self {
        Self { limit, radius_deg }
    }
}

/// Default destination radius escalation.
pub const DEFAULT_DESTINATION_RADII: [SearchRadius; 4] = [
    SearchRadius::new(5, 0.05),
    SearchRadius::new(30, 0.05),
    SearchRadius::new(60, 0.05),
    SearchRadius::new(150, 0.05),
];

/// Operational policy of a [Navigator](super::Navigator).
///
/// Every field has a default, so a partial JSON document is a valid configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Number of nodes around the vehicle probed for a matching road edge.
    pub start_candidates: usize,
    pub start_radius_deg: f64,

    /// Road edges whose bearing differs from the vehicle heading by more
    /// than this many degrees can't be used as a start.
    pub start_max_angle: f64,

    /// Road edges further than this (km) from the vehicle can't be used as a start.
    pub start_max_distance_km: f64,

    /// Number of nodes probed when the vehicle isn't on any road.
    pub yard_candidates: usize,
    pub yard_radius_deg: f64,

    /// Destination candidate windows, tried in order until a route is found.
    pub destination_radii: Vec<SearchRadius>,

    /// Consecutive path vertices closer than this (meters) are merged.
    pub merge_spacing_m: f64,

    /// Number of path segments behind the progress cursor checked on every update.
    pub window_behind: usize,

    /// Number of path segments ahead of the progress cursor checked on every update.
    pub window_ahead: usize,

    /// Position updates closer than this (km) to the last evaluated one are ignored.
    pub min_movement_km: f64,

    /// Squared distance (deg²) from the route above which the vehicle is off route.
    pub deviation_threshold_sq: f64,

    /// Squared distance (deg²) from the last vertex below which the vehicle has arrived.
    pub arrival_threshold_sq: f64,

    pub stats: StatsProfile,

    /// Capacity of the worker's [SearchContext](crate::SearchContext).
    pub capacity: usize,

    pub profile: CostProfile,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            start_candidates: 5,
            start_radius_deg: 0.03,
            start_max_angle: 90.0,
            start_max_distance_km: 0.02,
            yard_candidates: 20,
            yard_radius_deg: 0.3,
            destination_radii: DEFAULT_DESTINATION_RADII.to_vec(),
            merge_spacing_m: 5.0,
            window_behind: 2,
            window_ahead: 40,
            min_movement_km: 0.01,
            deviation_threshold_sq: 0.0005,
            arrival_threshold_sq: 0.00001,
            stats: StatsProfile::default(),
            capacity: DEFAULT_MAX_NODES,
            profile: TRUCK_PROFILE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let c: Config = serde_json::from_str(
            r#"{
                "destination_radii": [{"limit": 3, "radius_deg": 0.01}],
                "capacity": 1000,
                "profile": {"heuristic_scale": 1.0},
                "stats": {"dense_areas": [{"center": [7.42, 43.73], "radius_deg": 0.02}]}
            }"#,
        )
        .unwrap();

        assert_eq!(c.destination_radii, vec![SearchRadius::new(3, 0.01)]);
        assert_eq!(c.capacity, 1000);
        assert_eq!(c.profile.heuristic_scale, 1.0);
        assert_eq!(c.profile.left_turn_penalty, TRUCK_PROFILE.left_turn_penalty);
        assert_eq!(c.stats.dense_areas.len(), 1);
        assert_eq!(c.stats.open_road_speed_kmh, 70.0);
        assert_eq!(c.start_candidates, 5);
        assert_eq!(c.deviation_threshold_sq, 0.0005);
    }

    #[test]
    fn default_radii_escalate() {
        let c = Config::default();
        let limits: Vec<usize> = c.destination_radii.iter().map(|r| r.limit).collect();
        assert_eq!(limits, vec![5, 30, 60, 150]);
    }
}
