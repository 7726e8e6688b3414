//! Great-circle helpers and curve geometry.
//!
//! All distances are metres on a spherical earth. Bad input (NaN, duplicate
//! points) never panics: distances come back as-is and `circumradius` reports
//! "no curve" instead.

use crate::types::LatLng;
use geo::{HaversineBearing, HaversineDistance, Point};

/// Mean earth radius used by `geo`'s haversine implementation.
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Triangles with less area than this (m²) are treated as straight.
const MIN_TRIANGLE_AREA_M2: f64 = 1e-6;

fn to_point(p: &LatLng) -> Point<f64> {
    Point::new(p.lng, p.lat)
}

/// Great-circle distance in metres.
pub fn haversine_distance(a: &LatLng, b: &LatLng) -> f64 {
    to_point(a).haversine_distance(&to_point(b))
}

/// Initial bearing from `a` towards `b`, degrees in [0, 360).
pub fn initial_bearing(a: &LatLng, b: &LatLng) -> f64 {
    normalize_heading(to_point(a).haversine_bearing(to_point(b)))
}

pub fn normalize_heading(deg: f64) -> f64 {
    let wrapped = deg.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Smallest absolute angle between two headings, degrees in [0, 180].
pub fn heading_difference(a: f64, b: f64) -> f64 {
    let diff = (normalize_heading(a) - normalize_heading(b)).abs();
    if diff > 180.0 {
        360.0 - diff
    } else {
        diff
    }
}

/// Radius of the circle through three points, or `None` when they are collinear.
///
/// R = (a·b·c) / (4·Area), with Area from Heron's formula on the haversine side
/// lengths.
pub fn circumradius(p1: &LatLng, p2: &LatLng, p3: &LatLng) -> Option<f64> {
    let a = haversine_distance(p1, p2);
    let b = haversine_distance(p2, p3);
    let c = haversine_distance(p3, p1);

    let s = (a + b + c) / 2.0;
    let area_sq = s * (s - a) * (s - b) * (s - c);
    if !area_sq.is_finite() || area_sq <= 0.0 {
        return None;
    }

    let area = area_sq.sqrt();
    if area < MIN_TRIANGLE_AREA_M2 {
        return None;
    }

    let radius = (a * b * c) / (4.0 * area);
    radius.is_finite().then_some(radius)
}

/// Project `point` onto a local east/north plane (metres) around `origin`.
pub fn latlng_to_meters(point: &LatLng, origin: &LatLng) -> (f64, f64) {
    let d_lat = (point.lat - origin.lat).to_radians();
    let d_lng = (point.lng - origin.lng).to_radians();
    let east = EARTH_RADIUS_M * d_lng * origin.lat.to_radians().cos();
    let north = EARTH_RADIUS_M * d_lat;
    (east, north)
}

/// Inverse of [`latlng_to_meters`].
pub fn meters_to_latlng(east: f64, north: f64, origin: &LatLng) -> LatLng {
    let d_lat = north / EARTH_RADIUS_M;
    let d_lng = east / (EARTH_RADIUS_M * origin.lat.to_radians().cos());
    LatLng::new(origin.lat + d_lat.to_degrees(), origin.lng + d_lng.to_degrees())
}
