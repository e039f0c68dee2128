// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use super::{resolve_start, Config, RouteStats, StartConfig, VehicleState};
use crate::{approx_distance_km, find_route, Coord, Graph, Route, SearchContext, SearchError, SearchQuery, StartMode};

/// Finds a route from `start` to the surroundings of `target`.
///
/// The windows of [Config::destination_radii] are tried in order; every non-empty
/// set of candidate nodes is handed over to [find_route] as the set of possible ends,
/// and the first route found is returned. `None` means every radius failed.
pub fn find_flexible_route(
    g: &Graph,
    ctx: &mut SearchContext,
    start: u32,
    target: Coord,
    heading: Option<f64>,
    mode: StartMode,
    config: &Config,
) -> Option<Route> {
    for radius in &config.destination_radii {
        let candidates = g.closest_nodes(target, radius.limit, radius.radius_deg);
        if candidates.is_empty() {
            log::trace!("no destination candidates within {}°", radius.radius_deg);
            continue;
        }

        let mut query = SearchQuery::new(start, candidates)
            .with_target(target)
            .with_mode(mode);
        if let Some(heading) = heading {
            query = query.with_heading(heading);
        }

        match find_route(g, ctx, &query, &config.profile) {
            Ok(route) => {
                log::debug!(
                    "found route {} → {} with {} candidates in {} iterations",
                    start,
                    route.end,
                    radius.limit,
                    route.iterations,
                );
                return Some(route);
            }

            Err(e @ (SearchError::CapacityExceeded { .. } | SearchError::InvalidReference(_))) => {
                log::warn!("route search from {} failed: {}", start, e);
                return None;
            }

            Err(e) => log::debug!(
                "no route from {} with {} candidates within {}°: {}",
                start,
                radius.limit,
                radius.radius_deg,
                e
            ),
        }
    }

    None
}

/// Merges consecutive vertices closer than `min_spacing_m` meters into their midpoint.
///
/// A merged pair is never merged again with the following vertex. The result
/// has at least 2 vertices if the input had at least 2.
pub fn merge_close_points(coords: &[Coord], min_spacing_m: f64) -> Vec<Coord> {
    if coords.len() < 2 {
        return coords.to_vec();
    }

    let mut merged = Vec::with_capacity(coords.len());
    let mut i = 0;
    while i < coords.len() {
        let current = coords[i];
        let Some(&next) = coords.get(i + 1) else {
            merged.push(current);
            break;
        };

        if approx_distance_km(current, next) * 1000.0 < min_spacing_m {
            merged.push([(current[0] + next[0]) * 0.5, (current[1] + next[1]) * 0.5]);
            i += 2;
        } else {
            merged.push(current);
            i += 1;
        }
    }

    if merged.len() < 2 {
        merged.push(coords[coords.len() - 1]);
    }
    merged
}

/// A route planned for the vehicle, ready to be followed.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedRoute {
    pub start: StartConfig,
    pub route: Route,

    /// [Route::path] prefixed with the vehicle position snapped onto the road,
    /// with close vertices merged.
    pub path: Vec<Coord>,

    /// Statistics of [PlannedRoute::path].
    pub stats: RouteStats,
}

/// Plans a route for the vehicle towards `target`: resolves where the search
/// should start, runs [find_flexible_route] and prepares the path for following.
pub fn plan_route(
    g: &Graph,
    ctx: &mut SearchContext,
    vehicle: &VehicleState,
    target: Coord,
    config: &Config,
) -> Option<PlannedRoute> {
    let Some(start) = resolve_start(g, vehicle, config) else {
        log::debug!("no graph nodes around {:?}", vehicle.position);
        return None;
    };

    let route = find_flexible_route(
        g,
        ctx,
        start.node,
        target,
        Some(vehicle.heading),
        start.mode,
        config,
    )?;

    let mut stitched = Vec::with_capacity(route.path.len() + 1);
    stitched.push(start.projected);
    stitched.extend_from_slice(&route.path);

    let path = merge_close_points(&stitched, config.merge_spacing_m);
    let stats = RouteStats::build(&path, &config.stats);

    Some(PlannedRoute {
        start,
        route,
        path,
        stats,
    })
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::{east_road, road_graph};
    use super::super::SearchRadius;
    use super::*;

    fn config(radii: &[SearchRadius]) -> Config {
        Config {
            destination_radii: radii.to_vec(),
            capacity: 64,
            ..Default::default()
        }
    }

    #[test]
    fn escalates_radius_until_candidates_appear() {
        let g = east_road(11, 0.001);
        let mut ctx = SearchContext::new(64);

        // Nothing within 0.0001° of the target, the second window has nodes 6..=10.
        let c = config(&[SearchRadius::new(5, 0.0001), SearchRadius::new(5, 0.01)]);
        let route = find_flexible_route(&g, &mut ctx, 0, [0.0103, 0.0], Some(90.0), StartMode::Road, &c)
            .unwrap();

        assert_eq!(route.nodes.first(), Some(&0));
        assert_eq!(route.end, 6);
    }

    #[test]
    fn escalates_radius_after_failed_search() {
        // Detached node right at the target
        let g = road_graph(11, 0.001, &[[0.0101, 0.0]]);
        let mut ctx = SearchContext::new(64);

        let c = config(&[SearchRadius::new(1, 0.01), SearchRadius::new(2, 0.01)]);
        let route = find_flexible_route(&g, &mut ctx, 0, [0.0101, 0.0], None, StartMode::Road, &c).unwrap();
        assert_eq!(route.end, 10);
    }

    #[test]
    fn all_radii_failing_is_no_route() {
        let g = east_road(11, 0.001);
        let mut ctx = SearchContext::new(64);

        let c = config(&[SearchRadius::new(5, 0.001), SearchRadius::new(5, 0.01)]);
        assert_eq!(
            find_flexible_route(&g, &mut ctx, 0, [1.0, 1.0], None, StartMode::Road, &c),
            None
        );

        let c = config(&[]);
        assert_eq!(
            find_flexible_route(&g, &mut ctx, 0, [0.005, 0.0], None, StartMode::Road, &c),
            None
        );
    }

    #[test]
    fn too_small_context_is_no_route() {
        let g = east_road(11, 0.001);
        let mut ctx = SearchContext::new(4);
        let c = config(&[SearchRadius::new(5, 0.01)]);
        assert_eq!(
            find_flexible_route(&g, &mut ctx, 0, [0.005, 0.0], None, StartMode::Road, &c),
            None
        );
    }

    #[test]
    fn merge_collapses_close_pairs() {
        // 0.00001° of longitude is ~0.7 m
        let coords = vec![
            [0.0, 0.0],
            [0.00001, 0.0],
            [0.00002, 0.0],
            [0.001, 0.0],
            [0.002, 0.0],
        ];
        let merged = merge_close_points(&coords, 5.0);
        assert_eq!(merged.len(), 4);
        assert_eq!(merged[0], [0.000005, 0.0]);
        assert_eq!(merged[1], [0.00002, 0.0]);
        assert_eq!(&merged[2..], &coords[3..]);
    }

    #[test]
    fn merge_keeps_two_vertices() {
        let coords = vec![[0.0, 0.0], [0.00001, 0.0]];
        let merged = merge_close_points(&coords, 5.0);
        assert_eq!(merged, vec![[0.000005, 0.0], [0.00001, 0.0]]);

        assert_eq!(merge_close_points(&[[1.0, 1.0]], 5.0), vec![[1.0, 1.0]]);
        assert!(merge_close_points(&[], 5.0).is_empty());
    }

    #[test]
    fn plans_route_from_the_road() {
        let g = east_road(11, 0.001);
        let mut ctx = SearchContext::new(64);
        let c = config(&[SearchRadius::new(1, 0.0005), SearchRadius::new(1, 0.05)]);

        let vehicle = VehicleState::new([0.0025, 0.00005], 90.0);
        let planned = plan_route(&g, &mut ctx, &vehicle, [0.0091, 0.0], &c).unwrap();

        assert_eq!(planned.start.mode, StartMode::Road);
        assert_eq!(planned.route.nodes, vec![3, 4, 5, 6, 7, 8, 9]);
        assert_eq!(planned.path.len(), 8);
        assert_eq!(planned.path[0], planned.start.projected);
        assert_eq!(planned.stats.len(), planned.path.len());
        assert!((planned.stats.total_km() - 0.7228).abs() < 1e-3);
    }

    #[test]
    fn plans_route_from_a_yard() {
        let g = east_road(11, 0.001);
        let mut ctx = SearchContext::new(64);
        let c = config(&[SearchRadius::new(1, 0.05)]);

        // Heading away from the target, but off-road.
        let vehicle = VehicleState::new([0.0021, 0.002], 270.0);
        let planned = plan_route(&g, &mut ctx, &vehicle, [0.0091, 0.0], &c).unwrap();

        assert_eq!(planned.start.mode, StartMode::Yard);
        assert_eq!(planned.route.nodes.first(), Some(&2));
        assert_eq!(planned.route.end, 9);
        // Projected start is the start node itself and collapses with it.
        assert_eq!(planned.path.len(), planned.route.path.len());
    }
}
