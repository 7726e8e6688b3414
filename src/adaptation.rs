//! Weather and driver-state adaptation records.
//!
//! Both are pure functions of the latest snapshot. The orchestrator replaces
//! its copy wholesale on every update; nothing is smoothed or remembered.

use crate::types::{DriverState, WeatherCondition, WeatherSnapshot};
use serde::{Deserialize, Serialize};

/// Visibility below this (metres) tightens the weather adaptation further.
const LOW_VISIBILITY_M: f64 = 200.0;
const LOW_FOCUS_PERCENT: f64 = 50.0;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeatherAdaptation {
    pub speed_reduction_percent: f64,
    pub braking_multiplier: f64,
    pub warning_intensity_multiplier: f64,
    pub condition_label: String,
}

impl Default for WeatherAdaptation {
    fn default() -> Self {
        weather_adaptation(None)
    }
}

/// Derive the weather adaptation; no snapshot means clear weather.
pub fn weather_adaptation(weather: Option<&WeatherSnapshot>) -> WeatherAdaptation {
    let condition = weather
        .map(|w| w.effective_condition())
        .unwrap_or(WeatherCondition::Clear);

    let (speed_reduction_percent, braking_multiplier, warning_intensity_multiplier) =
        match condition {
            WeatherCondition::Clear => (0.0, 1.0, 1.0),
            WeatherCondition::Fog => (20.0, 1.2, 1.15),
            WeatherCondition::Rain => (15.0, 1.5, 1.1),
            WeatherCondition::Storm => (30.0, 1.8, 1.25),
            WeatherCondition::Snow => (35.0, 2.0, 1.2),
            WeatherCondition::Ice => (50.0, 3.0, 1.3),
        };

    let mut adaptation = WeatherAdaptation {
        speed_reduction_percent,
        braking_multiplier,
        warning_intensity_multiplier,
        condition_label: condition.label().to_string(),
    };

    let low_visibility = weather
        .and_then(|w| w.visibility_m)
        .map_or(false, |v| v.is_finite() && v < LOW_VISIBILITY_M);
    if low_visibility {
        adaptation.speed_reduction_percent += 10.0;
        adaptation.warning_intensity_multiplier += 0.05;
    }

    adaptation
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StressLevel {
    Calm,
    Elevated,
    High,
}

impl StressLevel {
    pub fn from_percent(stress: f64) -> Self {
        if stress > 70.0 {
            StressLevel::High
        } else if stress > 40.0 {
            StressLevel::Elevated
        } else {
            StressLevel::Calm
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DriverAdaptation {
    pub voice_rate_multiplier: f64,
    pub voice_pitch_multiplier: f64,
    pub extra_reminder_distance_meters: f64,
    pub stress_level: StressLevel,
}

impl Default for DriverAdaptation {
    fn default() -> Self {
        driver_adaptation(&DriverState::default())
    }
}

/// Stressed drivers get slower, lower announcements and earlier reminders;
/// distracted drivers (low focus) get reminders another 100 m earlier.
pub fn driver_adaptation(state: &DriverState) -> DriverAdaptation {
    let stress = if state.stress_percent.is_finite() {
        state.stress_percent.clamp(0.0, 100.0)
    } else {
        DriverState::default().stress_percent
    };
    let stress_level = StressLevel::from_percent(stress);

    let (voice_rate_multiplier, voice_pitch_multiplier, mut extra_reminder_distance_meters) =
        match stress_level {
            StressLevel::High => (0.85, 0.95, 150.0),
            StressLevel::Elevated => (0.95, 1.0, 75.0),
            StressLevel::Calm => (1.0, 1.0, 0.0),
        };

    if state.focus_percent.is_finite() && state.focus_percent < LOW_FOCUS_PERCENT {
        extra_reminder_distance_meters += 100.0;
    }

    DriverAdaptation {
        voice_rate_multiplier,
        voice_pitch_multiplier,
        extra_reminder_distance_meters,
        stress_level,
    }
}
