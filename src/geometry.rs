// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use crate::Coord;

/// Mean radius of Earth, in kilometers.
/// Source: https://en.wikipedia.org/wiki/Earth_radius#Arithmetic_mean_radius
const EARTH_RADIUS: f64 = 6371.0088;

/// Mean diameter of Earth, in kilometers.
/// Source: https://en.wikipedia.org/wiki/Earth_radius#Arithmetic_mean_radius
const EARTH_DIAMETER: f64 = EARTH_RADIUS + EARTH_RADIUS;

/// Kilometers per degree of latitude used by [approx_distance_km].
const KM_PER_DEGREE_LAT: f64 = 111.0;

/// Kilometers per degree of longitude used by [approx_distance_km].
/// Fixed for the latitudes of the target map, not derived from the input.
const KM_PER_DEGREE_LNG: f64 = 111.0 * 0.65;

/// Calculates the great-circle distance between two `[lng, lat]` positions
/// on Earth using the [haversine formula](https://en.wikipedia.org/wiki/Haversine_formula).
/// Returns the result in kilometers.
pub fn earth_distance(a: Coord, b: Coord) -> f64 {
    let lat1 = a[1].to_radians();
    let lon1 = a[0].to_radians();
    let lat2 = b[1].to_radians();
    let lon2 = b[0].to_radians();

    let sin_dlat_half = ((lat2 - lat1) * 0.5).sin();
    let sin_dlon_half = ((lon2 - lon1) * 0.5).sin();

    let h = sin_dlat_half * sin_dlat_half + lat1.cos() * lat2.cos() * sin_dlon_half * sin_dlon_half;

    EARTH_DIAMETER * h.sqrt().asin()
}

/// Fast equirectangular distance approximation, in kilometers.
///
/// Uses fixed degree-to-kilometer factors. Search costs are relative,
/// so the error of this approximation is irrelevant for routing.
#[inline]
pub fn approx_distance_km(a: Coord, b: Coord) -> f64 {
    let dy = (a[1] - b[1]) * KM_PER_DEGREE_LAT;
    let dx = (a[0] - b[0]) * KM_PER_DEGREE_LNG;
    (dx * dx + dy * dy).sqrt()
}

/// Forward azimuth from `a` to `b`, in degrees in the range `[0, 360)`.
pub fn bearing(a: Coord, b: Coord) -> f64 {
    let start_lat = a[1].to_radians();
    let start_lng = a[0].to_radians();
    let end_lat = b[1].to_radians();
    let end_lng = b[0].to_radians();

    let y = (end_lng - start_lng).sin() * end_lat.cos();
    let x = start_lat.cos() * end_lat.sin()
        - start_lat.sin() * end_lat.cos() * (end_lng - start_lng).cos();

    (y.atan2(x).to_degrees() + 360.0) % 360.0
}

/// Unsigned difference between two bearings, in degrees in the range `[0, 180]`.
pub fn angular_difference(a: f64, b: f64) -> f64 {
    let diff = (a - b).abs() % 360.0;
    if diff > 180.0 {
        360.0 - diff
    } else {
        diff
    }
}

/// Signed deflection at `p2` when traveling `p1 → p2 → p3`, in degrees
/// in the range `(-180, 180]`. Positive values are right turns.
pub fn signed_turn_angle(p1: Coord, p2: Coord, p3: Coord) -> f64 {
    let mut diff = bearing(p2, p3) - bearing(p1, p2);
    while diff <= -180.0 {
        diff += 360.0;
    }
    while diff > 180.0 {
        diff -= 360.0;
    }
    diff
}

/// Heading of the `a → b` vector in the plain lng/lat plane, in radians.
#[inline]
pub fn planar_heading(a: Coord, b: Coord) -> f64 {
    (b[1] - a[1]).atan2(b[0] - a[0])
}

/// Unsigned difference between two radian headings, in the range `[0, π]`.
#[inline]
pub fn radian_difference(a: f64, b: f64) -> f64 {
    let diff = (a - b).abs();
    if diff > std::f64::consts::PI {
        2.0 * std::f64::consts::PI - diff
    } else {
        diff
    }
}

/// Squared planar distance between two positions, in squared degrees.
#[inline]
pub fn squared_distance(a: Coord, b: Coord) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    dx * dx + dy * dy
}

/// Projects `p` onto the `a–b` segment in the plain lng/lat plane.
///
/// Returns the segment parameter, clamped to `[0, 1]`, and the closest point.
/// A degenerate segment always projects onto `a`.
pub fn project_onto_segment(p: Coord, a: Coord, b: Coord) -> (f64, Coord) {
    let dx = b[0] - a[0];
    let dy = b[1] - a[1];
    if dx == 0.0 && dy == 0.0 {
        return (0.0, a);
    }

    let t = (((p[0] - a[0]) * dx + (p[1] - a[1]) * dy) / (dx * dx + dy * dy)).clamp(0.0, 1.0);
    (t, [a[0] + dx * t, a[1] + dy * t])
}

/// Squared planar distance from `p` to the closest point of the `a–b` segment.
pub fn squared_point_segment_distance(p: Coord, a: Coord, b: Coord) -> f64 {
    let (_, closest) = project_onto_segment(p, a, b);
    squared_distance(p, closest)
}

#[cfg(test)]
mod tests {
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

    #[test]
    fn earth_distance_matches_known_value() {
        // Centrum → Stadion Narodowy, Warsaw
        let d = earth_distance([21.0122, 52.2297], [21.0453, 52.2395]);
        assert_almost_eq!(d, 2.5037, 2e-3);
    }

    #[test]
    fn approx_distance_uses_fixed_scales() {
        assert_almost_eq!(approx_distance_km([0.0, 0.0], [0.0, 1.0]), 111.0, 1e-9);
        assert_almost_eq!(approx_distance_km([0.0, 0.0], [1.0, 0.0]), 72.15, 1e-9);
    }

    #[test]
    fn bearing_cardinal_directions() {
        assert_almost_eq!(bearing([0.0, 0.0], [0.0, 1.0]), 0.0, 1e-9);
        assert_almost_eq!(bearing([0.0, 0.0], [1.0, 0.0]), 90.0, 1e-9);
        assert_almost_eq!(bearing([0.0, 0.0], [0.0, -1.0]), 180.0, 1e-9);
        assert_almost_eq!(bearing([0.0, 0.0], [-1.0, 0.0]), 270.0, 1e-9);
    }

    #[test]
    fn angular_difference_wraps() {
        assert_almost_eq!(angular_difference(350.0, 10.0), 20.0, 1e-9);
        assert_almost_eq!(angular_difference(10.0, 190.0), 180.0, 1e-9);
        assert_almost_eq!(angular_difference(720.0, 90.0), 90.0, 1e-9);
    }

    #[test]
    fn signed_turn_angle_sign_and_range() {
        let right = signed_turn_angle([0.0, 0.0], [0.0, 0.001], [0.001, 0.001]);
        assert_almost_eq!(right, 90.0, 1e-3);

        let left = signed_turn_angle([0.0, 0.0], [0.0, 0.001], [-0.001, 0.001]);
        assert_almost_eq!(left, -90.0, 1e-3);

        let back = signed_turn_angle([0.0, 0.0], [0.0, 0.001], [0.0, 0.0]);
        assert_almost_eq!(back, 180.0, 1e-9);
    }

    #[test]
    fn radian_difference_wraps() {
        let pi = std::f64::consts::PI;
        assert_almost_eq!(radian_difference(pi * 0.9, -pi * 0.9), pi * 0.2, 1e-9);
    }

    #[test]
    fn point_segment_projection_is_clamped() {
        let a = [0.0, 0.0];
        let b = [1.0, 0.0];
        assert_almost_eq!(squared_point_segment_distance([0.5, 1.0], a, b), 1.0, 1e-12);
        assert_almost_eq!(squared_point_segment_distance([-1.0, 0.0], a, b), 1.0, 1e-12);
        assert_almost_eq!(squared_point_segment_distance([3.0, 0.0], a, b), 4.0, 1e-12);
        assert_eq!(project_onto_segment([0.5, 5.0], a, a), (0.0, a));
    }
}
