// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use serde::Deserialize;

use crate::{earth_distance, squared_distance, Coord};

/// A circular area (in plain lng/lat degrees) where traffic is slower,
/// like a city center.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct DenseArea {
    pub center: Coord,
    pub radius_deg: f64,
}

impl DenseArea {
    #[inline]
    pub fn contains(&self, p: Coord) -> bool {
        squared_distance(self.center, p) < self.radius_deg * self.radius_deg
    }
}

/// Describes how [RouteStats] turn path geometry into distance and time.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StatsProfile {
    pub open_road_speed_kmh: f64,
    pub dense_speed_kmh: f64,

    /// Multiplier applied to the length of segments outside of dense areas.
    pub open_road_scale: f64,

    /// Multiplier applied to the length of segments inside dense areas.
    pub dense_scale: f64,

    pub dense_areas: Vec<DenseArea>,
}

impl Default for StatsProfile {
    fn default() -> Self {
        Self {
            open_road_speed_kmh: 70.0,
            dense_speed_kmh: 35.0,
            open_road_scale: 1.0,
            dense_scale: 1.0,
            dense_areas: Vec::new(),
        }
    }
}

impl StatsProfile {
    /// Returns the distance (km) and time (hours) needed to travel from `a` to `b`.
    pub fn segment(&self, a: Coord, b: Coord) -> (f64, f64) {
        let mid = [(a[0] + b[0]) * 0.5, (a[1] + b[1]) * 0.5];
        let (scale, speed) = if self.dense_areas.iter().any(|area| area.contains(mid)) {
            (self.dense_scale, self.dense_speed_kmh)
        } else {
            (self.open_road_scale, self.open_road_speed_kmh)
        };

        let km = earth_distance(a, b) * scale;
        let hours = if speed > 0.0 { km / speed } else { 0.0 };
        (km, hours)
    }
}

/// Cumulative distance and travel time at every vertex of a path,
/// computed once so that remaining values can be read in constant time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteStats {
    km: Vec<f64>,
    hours: Vec<f64>,
}

impl RouteStats {
    pub fn build(path: &[Coord], profile: &StatsProfile) -> Self {
        let mut km = Vec::with_capacity(path.len());
        let mut hours = Vec::with_capacity(path.len());
        if path.is_empty() {
            return Self { km, hours };
        }

        km.push(0.0);
        hours.push(0.0);
        let mut total_km = 0.0;
        let mut total_hours = 0.0;

        for pair in path.windows(2) {
            let (segment_km, segment_hours) = profile.segment(pair[0], pair[1]);
            total_km += segment_km;
            total_hours += segment_hours;
            km.push(total_km);
            hours.push(total_hours);
        }

        Self { km, hours }
    }

    /// Returns the number of path vertices covered.
    pub fn len(&self) -> usize {
        self.km.len()
    }

    pub fn is_empty(&self) -> bool {
        self.km.is_empty()
    }

    pub fn total_km(&self) -> f64 {
        self.km.last().copied().unwrap_or_default()
    }

    pub fn total_hours(&self) -> f64 {
        self.hours.last().copied().unwrap_or_default()
    }

    /// Returns the cumulative `(km, hours)` at the given vertex.
    pub fn at(&self, vertex: usize) -> Option<(f64, f64)> {
        Some((*self.km.get(vertex)?, *self.hours.get(vertex)?))
    }

    /// Returns the `(km, hours)` left to travel from the point at fraction `t`
    /// of the segment starting at `vertex`.
    pub fn remaining(&self, vertex: usize, t: f64) -> (f64, f64) {
        let Some((km_here, hours_here)) = self.at(vertex) else {
            return (0.0, 0.0);
        };
        let (km_next, hours_next) = self.at(vertex + 1).unwrap_or((km_here, hours_here));
        let t = t.clamp(0.0, 1.0);

        let km_done = km_here + (km_next - km_here) * t;
        let hours_done = hours_here + (hours_next - hours_here) * t;
        (
            (self.total_km() - km_done).max(0.0),
            (self.total_hours() - hours_done).max(0.0),
        )
    }
}
