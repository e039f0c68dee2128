// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use serde::Deserialize;

/// How the vehicle relates to the road network when a search starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StartMode {
    /// The vehicle is on a road and must keep following its heading.
    #[default]
    Road,

    /// The vehicle is not aligned to any road yet (e.g. in a parking lot or yard),
    /// so the start heading is not enforced.
    Yard,
}

/// Describes how [find_route](crate::find_route) shapes edge costs.
///
/// All penalties are additive and expressed in the same unit as edge weights (meters).
/// Penalties equal to [f64::INFINITY] block a move outright.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct CostProfile {
    /// Multiplier applied to the straight-line distance (in meters) to the anchor
    /// position. Values above 1 make the heuristic inadmissible, trading optimality
    /// for faster convergence.
    pub heuristic_scale: f64,

    /// Fixed part of the iteration budget.
    pub base_iterations: f64,

    /// Part of the iteration budget added per kilometer between the start and the anchor.
    pub iterations_per_km: f64,

    /// Hard cap on the number of vertices in a reconstructed path.
    pub max_path_len: usize,

    /// Start edges deviating from the start heading by more than this many degrees are blocked.
    pub start_block_angle: f64,

    /// Start edges deviating from the start heading by more than this many degrees are penalized.
    pub start_penalty_angle: f64,
    pub start_penalty: f64,

    /// Flat cost of leaving the start node in [StartMode::Yard].
    pub yard_penalty: f64,

    /// Turns sharper than this many degrees (in either direction) are blocked.
    pub block_turn_angle: f64,

    /// Left turns sharper than `-left_turn_angle` degrees.
    pub left_turn_angle: f64,
    pub left_turn_penalty: f64,

    /// Right turns sharper than `right_turn_angle` degrees.
    pub right_turn_angle: f64,
    pub right_turn_penalty: f64,

    /// Any other turn sharper than this many degrees.
    pub slight_turn_angle: f64,
    pub slight_turn_penalty: f64,

    /// When the previous hop is shorter than this (km), the turn angle is measured
    /// from the node before it, as very short hops give unreliable bearings.
    pub short_hop_km: f64,

    /// Multiplier applied to roundabout edges.
    pub roundabout_factor: f64,

    /// Turns onto roundabout edges sharper than this many degrees to the left
    /// go the wrong way around.
    pub roundabout_wrong_way_angle: f64,
    pub roundabout_wrong_way_penalty: f64,

    /// Maximum number of hops followed back along the search tree
    /// when looking for a heading reversal.
    pub lookback_hops: usize,

    /// Distance (km) that must be traveled back along the search tree
    /// before headings are compared.
    pub lookback_min_km: f64,

    /// Heading difference (radians) which counts as a reversal.
    pub lookback_reversal_rad: f64,
    pub lookback_penalty: f64,
}

/// Cost profile for heavy trucks: sharp turns and U-turns are effectively
/// forbidden, and left turns cost more than right turns.
pub const TRUCK_PROFILE: CostProfile = CostProfile {
    heuristic_scale: 1.5,
    base_iterations: 70_000.0,
    iterations_per_km: 500.0,
    max_path_len: 20_000,

    start_block_angle: 75.0,
    start_penalty_angle: 45.0,
    start_penalty: 1_000.0,
    yard_penalty: 10.0,

    block_turn_angle: 100.0,
    left_turn_angle: 45.0,
    left_turn_penalty: 2_000.0,
    right_turn_angle: 45.0,
    right_turn_penalty: 500.0,
    slight_turn_angle: 10.0,
    slight_turn_penalty: 50.0,

    short_hop_km: 0.005,

    roundabout_factor: 1.1,
    roundabout_wrong_way_angle: 100.0,
    roundabout_wrong_way_penalty: 100_000.0,

    lookback_hops: 30,
    lookback_min_km: 0.8,
    lookback_reversal_rad: 3.0,
    lookback_penalty: 5_000.0,
};

impl Default for CostProfile {
    fn default() -> Self {
        TRUCK_PROFILE
    }
}

impl CostProfile {
    /// Returns the number of node expansions allowed for a search
    /// spanning `distance_km` (straight line) kilometers.
    #[inline]
    pub fn iteration_budget(&self, distance_km: f64) -> usize {
        (self.base_iterations + self.iterations_per_km * distance_km).max(0.0) as usize
    }

    /// Returns the penalty for leaving the start node along an edge with the given bearing.
    pub fn start_cost(&self, mode: StartMode, heading: f64, edge_bearing: f64) -> f64 {
        match mode {
            StartMode::Yard => self.yard_penalty,
            StartMode::Road => {
                let diff = crate::angular_difference(heading, edge_bearing);
                if diff > self.start_block_angle {
                    f64::INFINITY
                } else if diff > self.start_penalty_angle {
                    self.start_penalty
                } else {
                    0.0
                }
            }
        }
    }

    /// Returns the graduated penalty for a turn with the given signed angle
    /// (positive to the right).
    pub fn turn_cost(&self, angle: f64) -> f64 {
        let abs_angle = angle.abs();
        if abs_angle > self.block_turn_angle {
            f64::INFINITY
        } else if angle < -self.left_turn_angle {
            self.left_turn_penalty
        } else if angle > self.right_turn_angle {
            self.right_turn_penalty
        } else if abs_angle > self.slight_turn_angle {
            self.slight_turn_penalty
        } else {
            0.0
        }
    }
}
