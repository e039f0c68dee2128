// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::model::Road;
use super::topology::{infer_directions, LineEnds};
use super::{BuildOutput, BuildStats, Options};
use crate::spatial::{window, LineIndex, SpatialIndex};
use crate::{bearing, earth_distance, project_onto_segment, Coord, Edge};

/// Number of coordinate units in one degree; node positions are rounded to 6 decimal places.
const KEY_SCALE: f64 = 1_000_000.0;

/// Position rounded to 6 decimal places, used for exact vertex matching.
type Key = (i64, i64);

#[inline]
fn key(c: Coord) -> Key {
    ((c[0] * KEY_SCALE).round() as i64, (c[1] * KEY_SCALE).round() as i64)
}

#[inline]
fn from_key(k: Key) -> Coord {
    [k.0 as f64 / KEY_SCALE, k.1 as f64 / KEY_SCALE]
}

/// Returns the half-width (in degrees) of a search window around `at`
/// which contains every point within `meters`.
fn metric_window(at: Coord, meters: f64) -> f64 {
    let lng_scale = at[1].to_radians().cos().abs().max(0.01);
    meters / 1000.0 / (110.0 * lng_scale)
}

/// Converts polyline [Roads](Road) into graph nodes and edges.
pub(super) struct GraphBuilder<'a> {
    options: &'a Options,
    roads: Vec<Road>,
    nodes: NodeTable,
    stats: BuildStats,
}

impl<'a> GraphBuilder<'a> {
    pub(super) fn new(options: &'a Options, roads: Vec<Road>) -> Self {
        Self {
            options,
            roads,
            nodes: NodeTable::new(options.node_merge_window, options.node_merge_tolerance),
            stats: BuildStats::default(),
        }
    }

    /// Runs all build passes and returns the generated graph.
    pub(super) fn build(mut self, total_features: usize) -> BuildOutput {
        self.stats.features = total_features;
        self.stats.skipped = total_features.saturating_sub(self.roads.len());

        log::info!("snapping endpoints of {} roads", self.roads.len());
        self.stats.snapped_endpoints =
            snap_endpoints(&mut self.roads, self.options.endpoint_snap_tolerance);

        log::info!("injecting junctions");
        let split_points = self.collect_split_points();

        log::info!("creating nodes");
        let lines = self.order_split_points(split_points);
        let (node_lines, ends) = self.create_nodes(&lines);

        log::info!("inferring topology");
        let directions = infer_directions(&ends, self.options.alignment_threshold);

        log::info!("generating edges");
        let mut edges = Vec::new();
        for (i, road) in self.roads.iter().enumerate() {
            let Some(ids) = &node_lines[i] else { continue };
            let coords = &lines[i];
            let class = road.props.road_type.road_class();

            for w in 0..ids.len() - 1 {
                let (from, to) = (ids[w], ids[w + 1]);
                if from == to {
                    continue;
                }

                let length = (earth_distance(coords[w], coords[w + 1]) * 1000.0) as f32;
                if !(length > 0.0) {
                    continue;
                }

                let (forward, backward) = road.props.edge_weights(
                    directions[i],
                    length,
                    self.options.against_traffic_penalty,
                );
                if let Some(weight) = forward {
                    edges.push((from, Edge { to, weight, class }));
                }
                if let Some(weight) = backward {
                    edges.push((to, Edge { to: from, weight, class }));
                }
            }
        }

        self.stats.nodes = self.nodes.positions.len();
        self.stats.edges = edges.len();
        log::info!(
            "built graph with {} nodes and {} edges ({} features, {} skipped)",
            self.stats.nodes,
            self.stats.edges,
            self.stats.features,
            self.stats.skipped,
        );

        BuildOutput {
            nodes: self.nodes.positions,
            edges,
            stats: self.stats,
        }
    }

    /// Returns the vertex keys of every road, plus the projections of nearby road endpoints.
    /// Dangling endpoints close to another road are moved onto it.
    fn collect_split_points(&mut self) -> Vec<BTreeSet<Key>> {
        let mut splits: Vec<BTreeSet<Key>> = self
            .roads
            .iter()
            .map(|r| r.coords.iter().map(|&c| key(c)).collect())
            .collect();

        let mut owners: HashMap<Key, usize> = HashMap::default();
        for keys in &splits {
            for &k in keys {
                *owners.entry(k).or_default() += 1;
            }
        }

        let index = LineIndex::load(self.roads.iter().map(|r| r.coords.as_slice()));
        let mut moves: Vec<(usize, bool, Coord)> = Vec::new();
        let mut injected = 0;

        for (i, road) in self.roads.iter().enumerate() {
            for (is_last, pt) in [(false, road.first()), (true, road.last())] {
                let mut candidates: Vec<usize> = index
                    .query(window(pt, self.options.junction_window))
                    .filter(|&j| j != i)
                    .collect();
                candidates.sort_unstable();

                let mut closest: Option<LinePosition> = None;
                for j in candidates {
                    let pos = locate(&self.roads[j].coords, pt);
                    if pos.distance_km * 1000.0 >= self.options.junction_snap_distance {
                        continue;
                    }

                    if splits[j].insert(key(pos.point)) {
                        injected += 1;
                    }
                    if closest.map_or(true, |c| pos.distance_km < c.distance_km) {
                        closest = Some(pos);
                    }
                }

                let dangling = owners.get(&key(pt)).copied().unwrap_or_default() <= 1;
                if let Some(pos) = closest.filter(|p| dangling && p.distance_km > 0.0) {
                    moves.push((i, is_last, pos.point));
                }
            }
        }

        for (i, is_last, point) in moves {
            let road = &mut self.roads[i];
            let at = if is_last { road.coords.len() - 1 } else { 0 };
            splits[i].remove(&key(road.coords[at]));
            splits[i].insert(key(point));
            road.coords[at] = point;
        }

        log::debug!("injected {} junction split points", injected);
        self.stats.injected_junctions = injected;
        splits
    }

    /// Orders the split points of every road along the road and drops near-duplicates.
    /// Returns the rounded positions of the resulting vertices.
    fn order_split_points(&self, splits: Vec<BTreeSet<Key>>) -> Vec<Vec<Coord>> {
        self.roads
            .iter()
            .zip(splits)
            .map(|(road, keys)| {
                let first = key(road.first());
                let last = key(road.last());

                let mut points: Vec<(f64, Coord)> = Vec::with_capacity(keys.len() + 1);
                points.push((0.0, from_key(first)));
                for &k in keys.iter().filter(|&&k| k != first && k != last) {
                    let c = from_key(k);
                    points.push((locate(&road.coords, c).location_km, c));
                }
                points.push((line_length(&road.coords), from_key(last)));

                points.sort_by(|a, b| a.0.total_cmp(&b.0));

                let mut cleaned = Vec::with_capacity(points.len());
                let mut last_location = f64::NEG_INFINITY;
                for (location, c) in points {
                    if (location - last_location).abs() < self.options.position_epsilon {
                        continue;
                    }
                    cleaned.push(c);
                    last_location = location;
                }
                cleaned
            })
            .collect()
    }

    /// Creates nodes for all vertices of all lines. Lines with fewer than 2 vertices
    /// are dropped, as they can't generate any edges.
    fn create_nodes(
        &mut self,
        lines: &[Vec<Coord>],
    ) -> (Vec<Option<Vec<u32>>>, Vec<Option<LineEnds>>) {
        let mut node_lines = Vec::with_capacity(lines.len());
        let mut ends = Vec::with_capacity(lines.len());

        for line in lines {
            if line.len() < 2 {
                node_lines.push(None);
                ends.push(None);
                continue;
            }

            let ids: Vec<u32> = line.iter().map(|&c| self.nodes.get_or_create(c)).collect();
            let n = line.len();
            ends.push(Some(LineEnds {
                start: ids[0],
                end: ids[n - 1],
                start_bearing: bearing(line[0], line[1]),
                end_bearing: bearing(line[n - 2], line[n - 1]),
            }));
            node_lines.push(Some(ids));
        }

        (node_lines, ends)
    }
}

/// Merges road endpoints closer than `tolerance` meters (transitively) into their centroid,
/// repeating until no endpoint moves. Returns the number of moved endpoints.
pub(super) fn snap_endpoints(roads: &mut [Road], tolerance: f64) -> usize {
    let mut total = 0;
    loop {
        let moved = snap_endpoints_once(roads, tolerance);
        if moved == 0 {
            return total;
        }
        total += moved;
    }
}

fn snap_endpoints_once(roads: &mut [Road], tolerance: f64) -> usize {
    let endpoints: Vec<Coord> = roads.iter().flat_map(|r| [r.first(), r.last()]).collect();
    let index = SpatialIndex::load(
        endpoints
            .iter()
            .enumerate()
            .map(|(i, &c)| (c, i as u32)),
    );

    let mut clusters = DisjointSet::new(endpoints.len());
    for (i, &c) in endpoints.iter().enumerate() {
        for (other, j) in index.query(window(c, metric_window(c, tolerance))) {
            let j = j as usize;
            if j > i && earth_distance(c, other) * 1000.0 <= tolerance {
                clusters.union(i, j);
            }
        }
    }

    let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::default();
    for i in 0..endpoints.len() {
        groups.entry(clusters.find(i)).or_default().push(i);
    }

    let mut moved = 0;
    for members in groups.values() {
        let first = endpoints[members[0]];
        if members.iter().all(|&m| endpoints[m] == first) {
            continue;
        }

        let n = members.len() as f64;
        let [sum_lng, sum_lat] = members.iter().fold([0.0, 0.0], |[lng, lat], &m| {
            [lng + endpoints[m][0], lat + endpoints[m][1]]
        });
        let centroid = [sum_lng / n, sum_lat / n];

        for &m in members {
            if endpoints[m] != centroid {
                moved += 1;
            }
            let road = &mut roads[m / 2];
            let at = if m % 2 == 0 { 0 } else { road.coords.len() - 1 };
            road.coords[at] = centroid;
        }
    }
    moved
}

/// Union-find over endpoint indices.
struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (a, b) = (self.find(a), self.find(b));
        if a != b {
            // Keep the lowest index as the root, so cluster order is deterministic
            let (root, child) = if a < b { (a, b) } else { (b, a) };
            self.parent[child] = root;
        }
    }
}

/// Deduplicates node positions: exact matches on the rounded position first,
/// then any existing node within the merge tolerance.
struct NodeTable {
    positions: Vec<Coord>,
    by_key: HashMap<Key, u32>,
    index: SpatialIndex,
    merge_window: f64,
    merge_tolerance: f64,
}

impl NodeTable {
    fn new(merge_window: f64, merge_tolerance: f64) -> Self {
        Self {
            positions: Vec::new(),
            by_key: HashMap::default(),
            index: SpatialIndex::default(),
            merge_window,
            merge_tolerance,
        }
    }

    fn get_or_create(&mut self, c: Coord) -> u32 {
        let k = key(c);
        if let Some(&id) = self.by_key.get(&k) {
            return id;
        }

        let nearest = self
            .index
            .query(window(c, self.merge_window))
            .map(|(p, id)| (earth_distance(c, p) * 1000.0, id))
            .filter(|&(d, _)| d < self.merge_tolerance)
            .min_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        if let Some((_, id)) = nearest {
            self.by_key.insert(k, id);
            return id;
        }

        let id = self.positions.len() as u32;
        let rounded = from_key(k);
        self.positions.push(rounded);
        self.index.insert(rounded, id);
        self.by_key.insert(k, id);
        id
    }
}

/// Closest point of a polyline to some position.
#[derive(Debug, Clone, Copy)]
struct LinePosition {
    /// Distance along the line from its first vertex, in kilometers.
    location_km: f64,
    point: Coord,

    /// Distance from the position to [LinePosition::point], in kilometers.
    distance_km: f64,
}

fn locate(line: &[Coord], p: Coord) -> LinePosition {
    let mut best = LinePosition {
        location_km: 0.0,
        point: line[0],
        distance_km: earth_distance(p, line[0]),
    };
    let mut traveled = 0.0;

    for segment in line.windows(2) {
        let (a, b) = (segment[0], segment[1]);
        let (_, point) = project_onto_segment(p, a, b);
        let distance_km = earth_distance(p, point);
        if distance_km < best.distance_km {
            best = LinePosition {
                location_km: traveled + earth_distance(a, point),
                point,
                distance_km,
            };
        }
        traveled += earth_distance(a, b);
    }

    best
}

fn line_length(line: &[Coord]) -> f64 {
    line.windows(2).map(|s| earth_distance(s[0], s[1])).sum()
}
