//! Braking Physics
//! Stopping distance from speed, driver reaction time and road friction.
//! Uses the road-safety rule of thumb d_brake = v² / (250·μ) with v in km/h.

use crate::types::WeatherCondition;

const KMH_PER_MS: f64 = 3.6;
const BRAKING_DENOMINATOR: f64 = 250.0; // 2·g·3.6² ≈ 254, rounded as in driver-training tables
const DRY_FRICTION: f64 = 0.8;
const WET_FRICTION: f64 = 0.4;
const SNOW_FRICTION: f64 = 0.2;
const ICE_FRICTION: f64 = 0.1;
const FOG_FRICTION_FACTOR: f64 = 0.9; // fog: damp road, applied to wet friction

/// Tyre/road friction coefficient for a weather condition.
pub fn friction_coefficient(condition: WeatherCondition) -> f64 {
    match condition {
        WeatherCondition::Clear => DRY_FRICTION,
        WeatherCondition::Rain | WeatherCondition::Storm => WET_FRICTION,
        WeatherCondition::Fog => WET_FRICTION * FOG_FRICTION_FACTOR,
        WeatherCondition::Snow => SNOW_FRICTION,
        WeatherCondition::Ice => ICE_FRICTION,
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StoppingDistance {
    pub reaction_m: f64, // distance covered before the brakes bite
    pub braking_m: f64,
}

impl StoppingDistance {
    pub fn total(&self) -> f64 {
        self.reaction_m + self.braking_m
    }
}

/// Stopping distance in metres
///
/// total = (v / 3.6) · t_reaction + v² / (250 · μ)
///
/// Non-finite or non-positive inputs produce a zero distance rather than NaN.
pub fn stopping_distance(speed_kmh: f64, reaction_time_s: f64, friction: f64) -> StoppingDistance {
    if !speed_kmh.is_finite() || speed_kmh <= 0.0 {
        return StoppingDistance::default();
    }

    let reaction_m = (speed_kmh / KMH_PER_MS) * reaction_time_s.max(0.0);
    let braking_m = if friction.is_finite() && friction > 0.0 {
        speed_kmh * speed_kmh / (BRAKING_DENOMINATOR * friction)
    } else {
        0.0
    };

    StoppingDistance {
        reaction_m,
        braking_m,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_zero_speed() {
        let d = stopping_distance(0.0, 1.5, DRY_FRICTION);
        assert_eq!(d.total(), 0.0);
    }

    #[test]
    fn test_dry_road_50kmh() {
        // 50/3.6·1.5 = 20.83 m reaction, 2500/200 = 12.5 m braking
        let d = stopping_distance(50.0, 1.5, DRY_FRICTION);
        assert_relative_eq!(d.reaction_m, 20.8333, epsilon = 1e-3);
        assert_relative_eq!(d.braking_m, 12.5, epsilon = 1e-9);
    }

    #[test]
    fn test_wet_road_doubles_braking() {
        let dry = stopping_distance(100.0, 1.5, friction_coefficient(WeatherCondition::Clear));
        let wet = stopping_distance(100.0, 1.5, friction_coefficient(WeatherCondition::Rain));
        assert_relative_eq!(wet.braking_m, dry.braking_m * 2.0, epsilon = 1e-9);
        assert_relative_eq!(wet.reaction_m, dry.reaction_m);
    }

    #[test]
    fn test_fog_friction_between_wet_and_snow() {
        let fog = friction_coefficient(WeatherCondition::Fog);
        assert_relative_eq!(fog, 0.36, epsilon = 1e-9);
        assert!(fog < friction_coefficient(WeatherCondition::Rain));
        assert!(fog > friction_coefficient(WeatherCondition::Snow));
    }

    #[test]
    fn test_nan_speed_is_zero() {
        assert_eq!(stopping_distance(f64::NAN, 1.5, 0.8).total(), 0.0);
    }
}
