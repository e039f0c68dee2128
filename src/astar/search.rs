// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::HashSet;

use super::{CostProfile, SearchContext, SearchError, StartMode};
use crate::{
    approx_distance_km, bearing, planar_heading, radian_difference, signed_turn_angle, Coord,
    Edge, Graph, RoadClass,
};

/// Parameters of a single [find_route] call.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub start: u32,

    /// Acceptable destination nodes; the search stops at the first one expanded.
    pub possible_ends: HashSet<u32>,

    /// Real-world destination used to anchor the heuristic. If missing,
    /// the position of the lowest destination node id is used instead.
    pub target: Option<Coord>,

    /// Vehicle heading at the start, in degrees clockwise from north.
    pub heading: Option<f64>,

    pub mode: StartMode,
}

impl SearchQuery {
    /// Creates a query from `start` to any of the `possible_ends`,
    /// without a heading constraint.
    pub fn new<I: IntoIterator<Item = u32>>(start: u32, possible_ends: I) -> Self {
        Self {
            start,
            possible_ends: possible_ends.into_iter().collect(),
            target: None,
            heading: None,
            mode: StartMode::Road,
        }
    }

    pub fn with_target(mut self, target: Coord) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_heading(mut self, heading: f64) -> Self {
        self.heading = Some(heading);
        self
    }

    pub fn with_mode(mut self, mode: StartMode) -> Self {
        self.mode = mode;
        self
    }
}

/// Result of a successful [find_route] call.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    /// Node ids from the start to [Route::end], inclusive.
    pub nodes: Vec<u32>,

    /// Positions of [Route::nodes].
    pub path: Vec<Coord>,

    /// The destination node which was reached.
    pub end: u32,

    /// Total cost of the route, including all penalties.
    pub cost: f64,

    /// Number of heap pops performed by the search.
    pub iterations: usize,
}

/// Uses the [A* algorithm](https://en.wikipedia.org/wiki/A*_search_algorithm)
/// to find a route from `query.start` to any node of `query.possible_ends`.
///
/// Edge costs are shaped as the search goes, using the [CostProfile]:
/// the first step is checked against the start heading, every further step
/// is penalized by the turn it makes relative to the search's own parent chain,
/// and heading reversals over a short distance are penalized or blocked.
/// Step costs are never lower than 1.
///
/// The heuristic is scaled by [CostProfile::heuristic_scale], so the returned route
/// is not guaranteed to be optimal. The number of expansions is limited by
/// [CostProfile::iteration_budget].
///
/// `ctx` is reset on every call and must have room for every node of `g`.
pub fn find_route(
    g: &Graph,
    ctx: &mut SearchContext,
    query: &SearchQuery,
    profile: &CostProfile,
) -> Result<Route, SearchError> {
    if g.len() > ctx.capacity() {
        return Err(SearchError::CapacityExceeded {
            nodes: g.len(),
            capacity: ctx.capacity(),
        });
    }

    if query.possible_ends.is_empty() {
        return Err(SearchError::NoDestinations);
    }

    let start_coord = g
        .coord(query.start)
        .ok_or(SearchError::InvalidReference(query.start))?;

    let anchor = match query.target {
        Some(target) => target,
        None => {
            let first_end = query
                .possible_ends
                .iter()
                .min()
                .copied()
                .ok_or(SearchError::NoDestinations)?;
            g.coord(first_end)
                .ok_or(SearchError::InvalidReference(first_end))?
        }
    };

    let budget = profile.iteration_budget(approx_distance_km(start_coord, anchor));
    let heuristic = |c: Coord| approx_distance_km(c, anchor) * 1000.0 * profile.heuristic_scale;

    ctx.reset();
    ctx.relax(query.start, 0.0, None);
    ctx.heap.push(query.start, 0.0);

    let mut iterations: usize = 0;

    while let Some(current) = ctx.heap.pop() {
        iterations += 1;
        if iterations > budget {
            log::debug!(
                "search from {} exceeded its budget of {} iterations",
                query.start,
                budget
            );
            return Err(SearchError::StepLimitExceeded);
        }

        // The heap may hold multiple entries for the same node; only the first one counts.
        if ctx.is_visited(current) {
            continue;
        }
        ctx.mark_visited(current);

        if query.possible_ends.contains(&current) {
            return reconstruct(g, ctx, current, iterations, profile.max_path_len);
        }

        let current_cost = ctx.cost(current);
        let Some(current_coord) = g.coord(current) else {
            continue;
        };

        for edge in g.get_edges(current) {
            if ctx.is_visited(edge.to) {
                continue;
            }

            let Some(neighbor_coord) = g.coord(edge.to) else {
                continue;
            };

            let step = step_cost(
                g,
                ctx,
                query,
                profile,
                current,
                current_coord,
                edge,
                neighbor_coord,
            );

            let tentative = current_cost + step;
            if tentative < ctx.cost(edge.to) {
                ctx.relax(edge.to, tentative, Some(current));
                ctx.heap.push(edge.to, tentative + heuristic(neighbor_coord));
            }
        }
    }

    Err(SearchError::Exhausted)
}

/// Computes the cost of moving from `current` along `edge`,
/// including heading, turn and reversal penalties.
#[allow(clippy::too_many_arguments)]
fn step_cost(
    g: &Graph,
    ctx: &SearchContext,
    query: &SearchQuery,
    profile: &CostProfile,
    current: u32,
    current_coord: Coord,
    edge: &Edge,
    neighbor_coord: Coord,
) -> f64 {
    let mut cost = edge.weight as f64;
    if cost <= 0.0 {
        cost = 1.0;
    }

    if current == query.start {
        if let Some(heading) = query.heading {
            cost += profile.start_cost(query.mode, heading, bearing(current_coord, neighbor_coord));
        }
    } else if let Some(prev) = ctx.previous(current) {
        cost = shape_turn(g, ctx, profile, prev, current_coord, edge, neighbor_coord, cost);
    }

    cost.max(1.0)
}

#[allow(clippy::too_many_arguments)]
fn shape_turn(
    g: &Graph,
    ctx: &SearchContext,
    profile: &CostProfile,
    prev: u32,
    current_coord: Coord,
    edge: &Edge,
    neighbor_coord: Coord,
    mut cost: f64,
) -> f64 {
    let Some(prev_coord) = g.coord(prev) else {
        return cost;
    };

    // Bearings over very short hops are noise; measure the turn from one node further back.
    let mut from_coord = prev_coord;
    if approx_distance_km(prev_coord, current_coord) < profile.short_hop_km {
        if let Some(grand_coord) = ctx.previous(prev).and_then(|gp| g.coord(gp)) {
            from_coord = grand_coord;
        }
    }

    let angle = signed_turn_angle(from_coord, current_coord, neighbor_coord);

    if edge.class == RoadClass::Roundabout {
        cost *= profile.roundabout_factor;
        if angle < -profile.roundabout_wrong_way_angle {
            cost += profile.roundabout_wrong_way_penalty;
        }
    }

    cost += profile.turn_cost(angle);
    if cost.is_infinite() {
        return cost;
    }

    cost + lookback_cost(g, ctx, profile, prev, current_coord, neighbor_coord)
}

/// Walks back along the search tree until [CostProfile::lookback_min_km] has been
/// traveled, and compares the heading of that old hop with the heading of the new one.
/// A near-opposite heading means the route doubles back on itself (e.g. a U-turn
/// spread over several nodes of a junction).
fn lookback_cost(
    g: &Graph,
    ctx: &SearchContext,
    profile: &CostProfile,
    prev: u32,
    current_coord: Coord,
    neighbor_coord: Coord,
) -> f64 {
    let mut at = prev;
    let mut traveled = 0.0;

    for _ in 0..profile.lookback_hops {
        let Some(before) = ctx.previous(at) else {
            break;
        };
        let (Some(at_coord), Some(before_coord)) = (g.coord(at), g.coord(before)) else {
            break;
        };

        traveled += approx_distance_km(before_coord, at_coord);

        if traveled > profile.lookback_min_km {
            let old_heading = planar_heading(before_coord, at_coord);
            let new_heading = planar_heading(current_coord, neighbor_coord);
            let diff = radian_difference(old_heading, new_heading);

            if diff > profile.lookback_reversal_rad {
                let straight = approx_distance_km(current_coord, before_coord);
                let ratio = if straight > 0.0 {
                    traveled / straight
                } else {
                    f64::INFINITY
                };

                return if ratio > 1.0 {
                    f64::INFINITY
                } else {
                    profile.lookback_penalty
                };
            }
            return 0.0;
        }

        at = before;
    }

    0.0
}

/// Walks the parent pointers back from `end` and returns the route in forward order.
fn reconstruct(
    g: &Graph,
    ctx: &SearchContext,
    end: u32,
    iterations: usize,
    max_len: usize,
) -> Result<Route, SearchError> {
    let mut nodes = vec![end];
    let mut at = end;

    while let Some(prev) = ctx.previous(at) {
        if nodes.len() >= max_len {
            return Err(SearchError::PathTooLong);
        }
        nodes.push(prev);
        at = prev;
    }

    nodes.reverse();
    let path = nodes
        .iter()
        .map(|&id| g.coord(id).ok_or(SearchError::InvalidReference(id)))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Route {
        nodes,
        path,
        end,
        cost: ctx.cost(end),
        iterations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TRUCK_PROFILE;

    macro_rules! assert_almost_eq {
        ($a:expr, $b:expr) => {
            assert!(
                (($a - $b).abs() < 1e-6),
                "assertion failed: {} ≈ {}",
                $a,
                $b
            )
        };
    }

    fn edge(to: u32, weight: f32, class: RoadClass) -> Edge {
        Edge { to, weight, class }
    }

    fn plain(to: u32, weight: f32) -> Edge {
        edge(to, weight, RoadClass::Plain)
    }

    //     B
    //   /   \
    //  A     D
    //   \   /
    //     C
    fn diamond() -> Graph {
        Graph::from_parts(
            vec![
                [0.0, 0.0],
                [0.001, 0.00001],
                [0.001, -0.00001],
                [0.002, 0.0],
            ],
            vec![
                (0, plain(1, 1.0)),
                (0, plain(2, 1.0)),
                (1, plain(3, 1.0)),
                (2, plain(3, 1.0)),
            ],
        )
        .unwrap()
    }

    fn search(g: &Graph, query: &SearchQuery) -> Result<Route, SearchError> {
        let mut ctx = SearchContext::new(64);
        find_route(g, &mut ctx, query, &TRUCK_PROFILE)
    }

    #[test]
    fn diamond_route() {
        let g = diamond();
        let route = search(&g, &SearchQuery::new(0, [3])).unwrap();

        assert_eq!(route.nodes.len(), 3);
        assert_eq!(route.nodes[0], 0);
        assert!(route.nodes[1] == 1 || route.nodes[1] == 2);
        assert_eq!(route.nodes[2], 3);
        assert_eq!(route.end, 3);
        assert_almost_eq!(route.cost, 2.0);
        assert_eq!(route.path.len(), 3);
        assert_eq!(route.path[0], [0.0, 0.0]);
        assert_eq!(route.path[2], [0.002, 0.0]);
    }

    #[test]
    fn search_is_deterministic_and_context_is_reusable() {
        let g = diamond();
        let mut ctx = SearchContext::new(64);
        let query = SearchQuery::new(0, [3]).with_heading(90.0);

        let first = find_route(&g, &mut ctx, &query, &TRUCK_PROFILE).unwrap();
        for _ in 0..5 {
            let again = find_route(&g, &mut ctx, &query, &TRUCK_PROFILE).unwrap();
            assert_eq!(again, first);
        }
    }

    #[test]
    fn start_node_in_destination_set() {
        let g = diamond();
        let route = search(&g, &SearchQuery::new(0, [0, 3])).unwrap();
        assert_eq!(route.nodes, vec![0]);
        assert_eq!(route.cost, 0.0);
    }

    #[test]
    fn roundabout_forces_detour() {
        // Roundabout edge only goes B → A; A → B must detour via C.
        let g = Graph::from_parts(
            vec![[0.0, 0.0], [0.002, 0.0], [0.001, 0.0005]],
            vec![
                (1, edge(0, 200.0, RoadClass::Roundabout)),
                (0, plain(2, 150.0)),
                (2, plain(1, 150.0)),
            ],
        )
        .unwrap();

        let route = search(&g, &SearchQuery::new(0, [1])).unwrap();
        assert_eq!(route.nodes, vec![0, 2, 1]);

        let back = search(&g, &SearchQuery::new(1, [0])).unwrap();
        assert_eq!(back.nodes, vec![1, 0]);
    }

    #[test]
    fn roundabout_without_detour_has_no_route() {
        let g = Graph::from_parts(
            vec![[0.0, 0.0], [0.002, 0.0]],
            vec![(1, edge(0, 200.0, RoadClass::Roundabout))],
        )
        .unwrap();
        assert_eq!(search(&g, &SearchQuery::new(0, [1])), Err(SearchError::Exhausted));
    }

    #[test]
    fn misaligned_heading_blocks_road_start_but_not_yard_start() {
        // The only edge points east (bearing 90°), the vehicle faces 260°.
        let g = Graph::from_parts(vec![[0.0, 0.0], [0.001, 0.0]], vec![(0, plain(1, 100.0))]).unwrap();

        let road = SearchQuery::new(0, [1]).with_heading(260.0);
        assert_eq!(search(&g, &road), Err(SearchError::Exhausted));

        let yard = road.clone().with_mode(StartMode::Yard);
        let route = search(&g, &yard).unwrap();
        assert_eq!(route.nodes, vec![0, 1]);
        assert_almost_eq!(route.cost, 110.0);
    }

    #[test]
    fn moderate_heading_mismatch_is_penalized() {
        let g = Graph::from_parts(vec![[0.0, 0.0], [0.001, 0.0]], vec![(0, plain(1, 100.0))]).unwrap();
        let route = search(&g, &SearchQuery::new(0, [1]).with_heading(30.0)).unwrap();
        assert_almost_eq!(route.cost, 1_100.0);
    }

    #[test]
    fn u_turns_are_blocked() {
        // A → B → A is the only way back to A's twin C, which sits next to A.
        let g = Graph::from_parts(
            vec![[0.0, 0.0], [0.001, 0.0], [0.0, 0.00001]],
            vec![(0, plain(1, 100.0)), (1, plain(2, 100.0))],
        )
        .unwrap();
        assert_eq!(search(&g, &SearchQuery::new(0, [2])), Err(SearchError::Exhausted));
    }

    #[test]
    fn left_turns_cost_more_than_right_turns() {
        //     L
        //     |
        // S - X - E
        //     |
        //     R
        let g = Graph::from_parts(
            vec![
                [0.0, 0.0],     // 0: S
                [0.001, 0.0],   // 1: X
                [0.001, 0.001], // 2: L (north)
                [0.001, -0.001], // 3: R (south)
            ],
            vec![(0, plain(1, 100.0)), (1, plain(2, 100.0)), (1, plain(3, 100.0))],
        )
        .unwrap();

        let left = search(&g, &SearchQuery::new(0, [2])).unwrap();
        let right = search(&g, &SearchQuery::new(0, [3])).unwrap();
        assert_almost_eq!(left.cost, 2_200.0);
        assert_almost_eq!(right.cost, 700.0);

        // Both reachable: the right turn wins.
        let either = search(&g, &SearchQuery::new(0, [2, 3])).unwrap();
        assert_eq!(either.end, 3);
    }

    #[test]
    fn step_cost_is_clamped_to_one() {
        let g = Graph::from_parts(
            vec![[0.0, 0.0], [0.00001, 0.0], [0.00002, 0.0]],
            vec![(0, plain(1, 0.0)), (1, plain(2, 0.25))],
        )
        .unwrap();
        let route = search(&g, &SearchQuery::new(0, [2])).unwrap();
        assert_almost_eq!(route.cost, 2.0);
    }

    #[test]
    fn failure_conditions() {
        let g = diamond();
        assert_eq!(search(&g, &SearchQuery::new(0, Vec::<u32>::new())), Err(SearchError::NoDestinations));
        assert_eq!(search(&g, &SearchQuery::new(42, [3])), Err(SearchError::InvalidReference(42)));
        assert_eq!(search(&g, &SearchQuery::new(0, [42])), Err(SearchError::InvalidReference(42)));

        let mut small = SearchContext::new(2);
        assert_eq!(
            find_route(&g, &mut small, &SearchQuery::new(0, [3]), &TRUCK_PROFILE),
            Err(SearchError::CapacityExceeded { nodes: 4, capacity: 2 })
        );
    }

    #[test]
    fn step_limit_aborts_search() {
        let positions: Vec<Coord> = (0..50).map(|i| [i as f64 * 0.001, 0.0]).collect();
        let edges: Vec<(u32, Edge)> = (0..49).map(|i| (i, plain(i + 1, 100.0))).collect();
        let g = Graph::from_parts(positions, edges).unwrap();

        let profile = CostProfile {
            base_iterations: 10.0,
            iterations_per_km: 0.0,
            ..TRUCK_PROFILE
        };
        let mut ctx = SearchContext::new(64);
        assert_eq!(
            find_route(&g, &mut ctx, &SearchQuery::new(0, [49]), &profile),
            Err(SearchError::StepLimitExceeded)
        );
        assert!(find_route(&g, &mut ctx, &SearchQuery::new(0, [49]), &TRUCK_PROFILE).is_ok());
    }

    #[test]
    fn path_length_is_capped() {
        let positions: Vec<Coord> = (0..50).map(|i| [i as f64 * 0.001, 0.0]).collect();
        let edges: Vec<(u32, Edge)> = (0..49).map(|i| (i, plain(i + 1, 100.0))).collect();
        let g = Graph::from_parts(positions, edges).unwrap();

        let profile = CostProfile {
            max_path_len: 10,
            ..TRUCK_PROFILE
        };
        let mut ctx = SearchContext::new(64);
        assert_eq!(
            find_route(&g, &mut ctx, &SearchQuery::new(0, [49]), &profile),
            Err(SearchError::PathTooLong)
        );

        let route = find_route(&g, &mut ctx, &SearchQuery::new(0, [9]), &profile).unwrap();
        assert_eq!(route.nodes.len(), 10);
        assert_eq!(route.nodes.first(), Some(&0));
        assert_eq!(route.nodes.last(), Some(&9));
    }

    /// A straight eastbound chain of `len` hops, 0.001° each, then a left turn north
    /// to node `len + 1` and a left turn west to node `len + 2`.
    fn u_shaped(len: u32, bump: Option<u32>) -> Graph {
        let mut positions: Vec<Coord> = (0..=len).map(|i| [i as f64 * 0.001, 0.0]).collect();
        if let Some(i) = bump {
            positions[i as usize][1] = 0.0004;
        }
        let x = len as f64 * 0.001;
        positions.push([x, 0.0003]);
        positions.push([x - 0.001, 0.0003]);

        let edges: Vec<(u32, Edge)> = (0..len + 2).map(|i| (i, plain(i + 1, 100.0))).collect();
        Graph::from_parts(positions, edges).unwrap()
    }

    #[test]
    fn lookback_penalizes_heading_reversal() {
        let g = u_shaped(12, None);
        let route = search(&g, &SearchQuery::new(0, [14])).unwrap();

        // 14 edges of 100, two left turns and one reversal penalty
        assert_almost_eq!(route.cost, 1_400.0 + 2.0 * 2_000.0 + 5_000.0);
        assert_eq!(route.nodes.len(), 15);
    }

    #[test]
    fn lookback_blocks_reversal_after_detour() {
        let g = u_shaped(12, Some(6));
        assert!(search(&g, &SearchQuery::new(0, [13])).is_ok());
        assert_eq!(search(&g, &SearchQuery::new(0, [14])), Err(SearchError::Exhausted));
    }
}
