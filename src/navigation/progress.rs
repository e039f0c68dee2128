// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use super::{Config, RouteStats};
use crate::{earth_distance, project_onto_segment, squared_distance, Coord};

/// Result of evaluating a position against the followed path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Tracking {
    /// There is no route to follow.
    Idle,

    /// The position is too close to the previously evaluated one.
    Skipped,

    OnRoute {
        /// Index of the path segment the vehicle is on.
        cursor: usize,
        remaining_km: f64,
        remaining_hours: f64,
    },

    /// The vehicle is further from the route than
    /// [Config::deviation_threshold_sq] allows.
    Deviated { distance_sq: f64 },

    /// The vehicle is within [Config::arrival_threshold_sq] of the last path vertex.
    Arrived,
}

/// Position of a vehicle along a path.
///
/// Only a window of segments around the cursor is checked on every update,
/// and the cursor only moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Progress {
    cursor: usize,
    last_position: Option<Coord>,
}

impl Progress {
    /// Returns the index of the path segment the vehicle was last matched to.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn update(&mut self, path: &[Coord], stats: &RouteStats, position: Coord, config: &Config) -> Tracking {
        let Some(&last_vertex) = path.last() else {
            return Tracking::Idle;
        };

        if let Some(last) = self.last_position {
            if earth_distance(last, position) < config.min_movement_km {
                return Tracking::Skipped;
            }
        }
        self.last_position = Some(position);

        if squared_distance(position, last_vertex) < config.arrival_threshold_sq {
            return Tracking::Arrived;
        }

        let segments = path.len().saturating_sub(1);
        if segments == 0 {
            return Tracking::Deviated {
                distance_sq: squared_distance(position, last_vertex),
            };
        }

        let lo = self.cursor.saturating_sub(config.window_behind);
        let hi = (self.cursor + config.window_ahead).min(segments - 1);

        let mut best: Option<(f64, usize, f64)> = None;
        for i in lo..=hi {
            let (t, closest) = project_onto_segment(position, path[i], path[i + 1]);
            let distance_sq = squared_distance(position, closest);
            if best.map_or(true, |(d, _, _)| distance_sq < d) {
                best = Some((distance_sq, i, t));
            }
        }

        let Some((distance_sq, segment, t)) = best else {
            return Tracking::Idle;
        };

        if distance_sq > config.deviation_threshold_sq {
            return Tracking::Deviated { distance_sq };
        }

        let (segment, t) = if segment < self.cursor {
            (self.cursor, 0.0)
        } else {
            (segment, t)
        };
        self.cursor = segment;

        let (remaining_km, remaining_hours) = stats.remaining(segment, t);
        Tracking::OnRoute {
            cursor: segment,
            remaining_km,
            remaining_hours,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::StatsProfile;
    use super::*;

    macro_rules! assert_almost_eq {
        ($a:expr, $b:expr, $eps:expr) => {
            assert!(
                (($a - $b).abs() < $eps),
                "assertion failed: {} ≈ {}",
                $a,
                $b
            )
        };
    }

    /// 11 vertices along the equator, 0.01° (~1.1 km) apart.
    fn path() -> (Vec<Coord>, RouteStats) {
        let path: Vec<Coord> = (0..=10).map(|i| [i as f64 * 0.01, 0.0]).collect();
        let stats = RouteStats::build(&path, &StatsProfile::default());
        (path, stats)
    }

    fn on_route(t: Tracking) -> (usize, f64) {
        match t {
            Tracking::OnRoute {
                cursor, remaining_km, ..
            } => (cursor, remaining_km),
            other => panic!("expected OnRoute, got {:?}", other),
        }
    }

    #[test]
    fn remaining_is_interpolated() {
        let (path, stats) = path();
        let mut p = Progress::default();

        let (cursor, remaining) = on_route(p.update(&path, &stats, [0.035, 0.0], &Config::default()));
        assert_eq!(cursor, 3);
        assert_almost_eq!(remaining, stats.total_km() * 0.65, 1e-6);
    }

    #[test]
    fn deviation_iff_over_threshold() {
        let (path, stats) = path();
        let config = Config::default();

        // 0.0223² = 0.00049729 < 0.0005
        let mut p = Progress::default();
        assert!(matches!(
            p.update(&path, &stats, [0.035, 0.0223], &config),
            Tracking::OnRoute { cursor: 3, .. }
        ));

        // 0.0224² = 0.00050176 > 0.0005
        let mut p = Progress::default();
        match p.update(&path, &stats, [0.035, 0.0224], &config) {
            Tracking::Deviated { distance_sq } => assert_almost_eq!(distance_sq, 0.00050176, 1e-12),
            other => panic!("expected Deviated, got {:?}", other),
        }
        assert_eq!(p.cursor(), 0);
    }

    #[test]
    fn cursor_never_regresses() {
        let (path, stats) = path();
        let config = Config::default();
        let mut p = Progress::default();

        assert_eq!(on_route(p.update(&path, &stats, [0.055, 0.001], &config)).0, 5);

        // Back on segment 3, which is still inside the window
        let (cursor, remaining) = on_route(p.update(&path, &stats, [0.035, 0.001], &config));
        assert_eq!(cursor, 5);
        assert_almost_eq!(remaining, stats.total_km() * 0.5, 1e-6);

        assert_eq!(on_route(p.update(&path, &stats, [0.075, 0.0], &config)).0, 7);
        assert_eq!(p.cursor(), 7);
    }

    #[test]
    fn window_limits_lookahead() {
        let (path, stats) = path();
        let config = Config {
            window_ahead: 2,
            ..Default::default()
        };
        let mut p = Progress::default();

        // Segment 8 is outside of the 0..=2 window
        assert!(matches!(
            p.update(&path, &stats, [0.085, 0.0], &config),
            Tracking::Deviated { .. }
        ));
    }

    #[test]
    fn small_movements_are_skipped() {
        let (path, stats) = path();
        let config = Config::default();
        let mut p = Progress::default();

        assert!(matches!(p.update(&path, &stats, [0.035, 0.0], &config), Tracking::OnRoute { .. }));
        // ~5.5 m further
        assert_eq!(p.update(&path, &stats, [0.03505, 0.0], &config), Tracking::Skipped);
        assert!(matches!(p.update(&path, &stats, [0.036, 0.0], &config), Tracking::OnRoute { .. }));
    }

    #[test]
    fn arrival_at_last_vertex() {
        let (path, stats) = path();
        let mut p = Progress::default();
        assert_eq!(p.update(&path, &stats, [0.0995, 0.0], &Config::default()), Tracking::Arrived);
    }

    #[test]
    fn empty_path_is_idle() {
        let mut p = Progress::default();
        assert_eq!(
            p.update(&[], &RouteStats::default(), [0.0, 0.0], &Config::default()),
            Tracking::Idle
        );
    }
}
