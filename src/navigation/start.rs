// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use super::Config;
use crate::{angular_difference, bearing, earth_distance, project_onto_segment, Coord, Graph, StartMode};

/// A single telemetry sample of the vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VehicleState {
    pub position: Coord,

    /// Heading in degrees clockwise from north.
    pub heading: f64,

    pub speed_kmh: f64,
}

impl VehicleState {
    pub fn new(position: Coord, heading: f64) -> Self {
        Self {
            position,
            heading,
            speed_kmh: 0.0,
        }
    }
}

/// Where a search for the vehicle should start.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StartConfig {
    pub mode: StartMode,

    /// Tail node of the matched road edge. Same as [StartConfig::node] in [StartMode::Yard].
    pub from: u32,

    /// Node the search starts from.
    pub node: u32,

    /// Vehicle position snapped onto the matched road edge,
    /// or the position of [StartConfig::node] in [StartMode::Yard].
    pub projected: Coord,
}

/// Finds where a route for the vehicle should start.
///
/// First, edges leaving the [Config::start_candidates] nodes closest to the vehicle are
/// checked: the closest one running along the vehicle heading (within
/// [Config::start_max_angle]) and passing within [Config::start_max_distance_km]
/// wins, and the search starts at its head node. Otherwise the vehicle is assumed to be
/// off-road, and the search starts in [StartMode::Yard] at the closest node within
/// [Config::yard_radius_deg].
///
/// Returns `None` if there are no nodes around the vehicle at all.
pub fn resolve_start(g: &Graph, vehicle: &VehicleState, config: &Config) -> Option<StartConfig> {
    on_road(g, vehicle, config).or_else(|| in_yard(g, vehicle, config))
}

fn on_road(g: &Graph, vehicle: &VehicleState, config: &Config) -> Option<StartConfig> {
    let mut best: Option<(f64, StartConfig)> = None;

    for from in g.closest_nodes(vehicle.position, config.start_candidates, config.start_radius_deg) {
        let Some(from_coord) = g.coord(from) else { continue };

        for edge in g.get_edges(from) {
            let Some(to_coord) = g.coord(edge.to) else { continue };

            let road_bearing = bearing(from_coord, to_coord);
            if angular_difference(vehicle.heading, road_bearing) > config.start_max_angle {
                continue;
            }

            let (_, projected) = project_onto_segment(vehicle.position, from_coord, to_coord);
            let dist = earth_distance(vehicle.position, projected);
            if dist < config.start_max_distance_km && best.map_or(true, |(d, _)| dist < d) {
                best = Some((
                    dist,
                    StartConfig {
                        mode: StartMode::Road,
                        from,
                        node: edge.to,
                        projected,
                    },
                ));
            }
        }
    }

    best.map(|(_, start)| start)
}

fn in_yard(g: &Graph, vehicle: &VehicleState, config: &Config) -> Option<StartConfig> {
    let node = g.find_nearest_node(vehicle.position, config.yard_radius_deg)?;
    log::debug!("no road matches the vehicle heading, starting from yard node {}", node.id);
    Some(StartConfig {
        mode: StartMode::Yard,
        from: node.id,
        node: node.id,
        projected: node.coord(),
    })
}
