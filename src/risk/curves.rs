//! Curve detection along the planned route.
//!
//! Slides a three-point window forward from the route point nearest the
//! vehicle and classifies each apex by circumradius. Finding that point is a
//! linear pass over the route; the window scan itself stops after
//! `lookahead_m` metres.

use crate::config::CurveThresholds;
use crate::geometry::{circumradius, haversine_distance, latlng_to_meters};
use crate::types::LatLng;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurveTier {
    Hairpin,
    Sharp,
    Moderate,
    Gentle,
}

impl CurveTier {
    pub fn label(&self) -> &'static str {
        match self {
            CurveTier::Hairpin => "hairpin",
            CurveTier::Sharp => "sharp",
            CurveTier::Moderate => "moderate",
            CurveTier::Gentle => "gentle",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CurveDetection {
    pub apex: LatLng,
    pub radius_m: f64,
    /// Distance from the vehicle to the apex, measured along the route.
    pub distance_m: f64,
    pub tier: CurveTier,
    pub base_score: f64,
}

/// Bucket a radius into a tier; upper bounds are exclusive, so exactly
/// `hairpin_radius_m` is already "sharp". Radii at or above the gentle bound
/// are not curves.
pub fn classify_curve_radius(radius_m: f64, thresholds: &CurveThresholds) -> Option<(CurveTier, f64)> {
    if !radius_m.is_finite() || radius_m < 0.0 {
        return None;
    }
    if radius_m < thresholds.hairpin_radius_m {
        Some((CurveTier::Hairpin, thresholds.hairpin_score))
    } else if radius_m < thresholds.sharp_radius_m {
        Some((CurveTier::Sharp, thresholds.sharp_score))
    } else if radius_m < thresholds.moderate_radius_m {
        Some((CurveTier::Moderate, thresholds.moderate_score))
    } else if radius_m < thresholds.gentle_radius_m {
        Some((CurveTier::Gentle, thresholds.gentle_score))
    } else {
        None
    }
}

/// Closer curves weigh more: ×1.5 under 50 m, ×1.2 under 100 m, ×0.7 beyond 250 m.
pub fn distance_multiplier(distance_m: f64) -> f64 {
    if distance_m < 50.0 {
        1.5
    } else if distance_m < 100.0 {
        1.2
    } else if distance_m > 250.0 {
        0.7
    } else {
        1.0
    }
}

/// 1 + max(0, speed/limit − 1)·0.5; an unknown limit contributes nothing.
pub fn speed_multiplier(speed_kmh: f64, limit_kmh: f64) -> f64 {
    if !(limit_kmh.is_finite() && limit_kmh > 0.0 && speed_kmh.is_finite()) {
        return 1.0;
    }
    1.0 + (speed_kmh / limit_kmh - 1.0).max(0.0) * 0.5
}

/// Index of the route point closest to `position`, skipping invalid points.
pub fn nearest_route_index(position: &LatLng, route: &[LatLng]) -> Option<(usize, f64)> {
    route
        .iter()
        .enumerate()
        .filter_map(|(idx, p)| {
            let d = haversine_distance(position, p);
            d.is_finite().then_some((idx, d))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
}

/// Along-route distance from the vehicle to `route[start + 1]`.
///
/// The vehicle is projected onto the segment `route[start] -> route[start + 1]`.
/// Once it has passed `route[start]` only the rest of that segment counts;
/// otherwise the gap back to `route[start]` is added to the full segment.
fn distance_to_next_point(
    position: &LatLng,
    route: &[LatLng],
    start: usize,
    offset: f64,
) -> Option<f64> {
    let from = route.get(start)?;
    let next = route.get(start + 1)?;
    let segment = haversine_distance(from, next);
    if !segment.is_finite() {
        return None;
    }

    let (sx, sy) = latlng_to_meters(next, from);
    let (vx, vy) = latlng_to_meters(position, from);
    let len_sq = sx * sx + sy * sy;
    let fraction = if len_sq > 0.0 {
        (vx * sx + vy * sy) / len_sq
    } else {
        0.0
    };

    if fraction.is_finite() && fraction > 0.0 {
        Some(segment * (1.0 - fraction.min(1.0)))
    } else {
        Some(offset + segment)
    }
}

/// All classified curves within `lookahead_m`, nearest first.
pub fn detect_curves(
    position: &LatLng,
    route: &[LatLng],
    lookahead_m: f64,
    thresholds: &CurveThresholds,
) -> Vec<CurveDetection> {
    let mut curves = Vec::new();
    if route.len() < 3 {
        return curves;
    }

    let Some((start, offset)) = nearest_route_index(position, route) else {
        return curves;
    };
    // distance from the vehicle to route[start + 1], the apex of the first window
    let Some(mut travelled) = distance_to_next_point(position, route, start, offset) else {
        return curves;
    };

    for window_start in start..route.len().saturating_sub(2) {
        let a = &route[window_start];
        let b = &route[window_start + 1];
        let c = &route[window_start + 2];

        if window_start > start {
            let segment = haversine_distance(a, b);
            if !segment.is_finite() {
                break;
            }
            travelled += segment;
        }
        if travelled > lookahead_m {
            break;
        }

        let Some(radius) = circumradius(a, b, c) else {
            continue;
        };
        if let Some((tier, base_score)) = classify_curve_radius(radius, thresholds) {
            curves.push(CurveDetection {
                apex: *b,
                radius_m: radius,
                distance_m: travelled,
                tier,
                base_score,
            });
        }
    }

    curves
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::meters_to_latlng;
    use approx::assert_relative_eq;

    fn origin() -> LatLng {
        LatLng::new(45.0, 7.0)
    }

    #[test]
    fn test_radius_boundaries_are_exclusive() {
        let t = CurveThresholds::default();
        assert_eq!(classify_curve_radius(60.9, &t).unwrap().1, 80.0);
        assert_eq!(classify_curve_radius(61.0, &t).unwrap().1, 60.0);
        assert_eq!(classify_curve_radius(152.0, &t).unwrap().1, 35.0);
        assert_eq!(classify_curve_radius(305.0, &t).unwrap().1, 15.0);
        assert!(classify_curve_radius(915.0, &t).is_none());
        assert!(classify_curve_radius(f64::NAN, &t).is_none());
    }

    #[test]
    fn test_distance_multiplier_bands() {
        assert_eq!(distance_multiplier(10.0), 1.5);
        assert_eq!(distance_multiplier(50.0), 1.2);
        assert_eq!(distance_multiplier(80.0), 1.2);
        assert_eq!(distance_multiplier(100.0), 1.0);
        assert_eq!(distance_multiplier(250.0), 1.0);
        assert_eq!(distance_multiplier(251.0), 0.7);
    }

    #[test]
    fn test_speed_multiplier() {
        assert_eq!(speed_multiplier(40.0, 50.0), 1.0);
        assert!((speed_multiplier(60.0, 50.0) - 1.1).abs() < 1e-9);
        assert_eq!(speed_multiplier(60.0, 0.0), 1.0);
    }

    #[test]
    fn test_short_route_has_no_curves() {
        let o = origin();
        let route = vec![o, meters_to_latlng(0.0, 50.0, &o)];
        assert!(detect_curves(&o, &route, 300.0, &CurveThresholds::default()).is_empty());
        assert!(detect_curves(&o, &[], 300.0, &CurveThresholds::default()).is_empty());
    }

    #[test]
    fn test_straight_route_has_no_curves() {
        let o = origin();
        let route: Vec<LatLng> = (0..10)
            .map(|i| meters_to_latlng(0.0, i as f64 * 30.0, &o))
            .collect();
        assert!(detect_curves(&o, &route, 300.0, &CurveThresholds::default()).is_empty());
    }

    #[test]
    fn test_right_angle_turn_detected() {
        let o = origin();
        // 100 m north, then a 90° right turn with 20 m legs
        let route = vec![
            o,
            meters_to_latlng(0.0, 80.0, &o),
            meters_to_latlng(0.0, 100.0, &o),
            meters_to_latlng(20.0, 100.0, &o),
        ];
        let curves = detect_curves(&o, &route, 300.0, &CurveThresholds::default());
        assert_eq!(curves.len(), 1);
        let curve = &curves[0];
        assert_eq!(curve.tier, CurveTier::Hairpin);
        assert!((curve.distance_m - 100.0).abs() < 0.5);
    }

    #[test]
    fn test_curve_beyond_lookahead_ignored() {
        let o = origin();
        let route = vec![
            o,
            meters_to_latlng(0.0, 380.0, &o),
            meters_to_latlng(0.0, 400.0, &o),
            meters_to_latlng(20.0, 400.0, &o),
        ];
        assert!(detect_curves(&o, &route, 300.0, &CurveThresholds::default()).is_empty());
    }

    #[test]
    fn test_distance_from_vehicle_between_route_points() {
        let o = origin();
        // points every 40 m north, then a right-angle turn at 80 m
        let route = vec![
            o,
            meters_to_latlng(0.0, 40.0, &o),
            meters_to_latlng(0.0, 80.0, &o),
            meters_to_latlng(20.0, 80.0, &o),
        ];
        // nearest point (0 m) is already behind the vehicle
        let vehicle = meters_to_latlng(0.0, 15.0, &o);
        assert_eq!(nearest_route_index(&vehicle, &route).unwrap().0, 0);

        let curves = detect_curves(&vehicle, &route, 300.0, &CurveThresholds::default());
        assert_eq!(curves.len(), 1);
        assert_relative_eq!(curves[0].distance_m, 65.0, epsilon = 0.5);
        // past the midpoint the curve is inside the ×1.5 band
        let closer = meters_to_latlng(0.0, 45.0, &o);
        let curves = detect_curves(&closer, &route, 300.0, &CurveThresholds::default());
        assert_relative_eq!(curves[0].distance_m, 35.0, epsilon = 0.5);
        assert_eq!(distance_multiplier(curves[0].distance_m), 1.5);
    }

    #[test]
    fn test_distance_from_vehicle_short_of_first_point() {
        let o = origin();
        let route = vec![
            o,
            meters_to_latlng(0.0, 40.0, &o),
            meters_to_latlng(0.0, 80.0, &o),
            meters_to_latlng(20.0, 80.0, &o),
        ];
        let vehicle = meters_to_latlng(0.0, -10.0, &o);
        let curves = detect_curves(&vehicle, &route, 300.0, &CurveThresholds::default());
        assert_relative_eq!(curves[0].distance_m, 90.0, epsilon = 0.5);
    }

    #[test]
    fn test_nearest_index_on_long_route() {
        let o = origin();
        // 20 km of straight road at 10 m spacing, then a right-angle turn
        let mut route: Vec<LatLng> = (0..2000)
            .map(|i| meters_to_latlng(0.0, i as f64 * 10.0, &o))
            .collect();
        route.push(meters_to_latlng(20.0, 19_990.0, &o));

        let vehicle = meters_to_latlng(0.0, 19_903.0, &o);
        let (idx, offset) = nearest_route_index(&vehicle, &route).unwrap();
        assert_eq!(idx, 1990);
        assert_relative_eq!(offset, 3.0, epsilon = 0.1);

        let curves = detect_curves(&vehicle, &route, 300.0, &CurveThresholds::default());
        assert_eq!(curves.len(), 1);
        assert_relative_eq!(curves[0].distance_m, 87.0, epsilon = 0.5);
    }

    #[test]
    fn test_scan_starts_at_nearest_point() {
        let o = origin();
        // sharp kink behind the vehicle, straight road ahead
        let route = vec![
            meters_to_latlng(-20.0, -40.0, &o),
            meters_to_latlng(0.0, -40.0, &o),
            meters_to_latlng(0.0, -20.0, &o),
            o,
            meters_to_latlng(0.0, 50.0, &o),
            meters_to_latlng(0.0, 100.0, &o),
        ];
        let (idx, _) = nearest_route_index(&o, &route).unwrap();
        assert_eq!(idx, 3);
        assert!(detect_curves(&o, &route, 300.0, &CurveThresholds::default()).is_empty());
    }
}
