use serde::{Deserialize, Serialize};

/// Driver stress assumed when no estimate has been supplied yet.
pub const DEFAULT_DRIVER_STRESS: f64 = 20.0;
/// Driver focus assumed when no estimate has been supplied yet.
pub const DEFAULT_DRIVER_FOCUS: f64 = 80.0;

/// Precipitation above which rain is handled as a storm (mm/h).
pub const STORM_PRECIPITATION_MM_H: f64 = 10.0;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Hazard {
    pub position: LatLng,
    pub severity: u8, // 0-100
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpeedCamera {
    pub position: LatLng,
    pub speed_limit_kmh: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCondition {
    Clear,
    Fog,
    Rain,
    Storm,
    Snow,
    Ice,
}

impl WeatherCondition {
    pub fn label(&self) -> &'static str {
        match self {
            WeatherCondition::Clear => "clear",
            WeatherCondition::Fog => "fog",
            WeatherCondition::Rain => "rain",
            WeatherCondition::Storm => "storm",
            WeatherCondition::Snow => "snow",
            WeatherCondition::Ice => "ice",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub condition: WeatherCondition,
    #[serde(default)]
    pub precipitation_mm_h: f64,
    #[serde(default)]
    pub temperature_c: Option<f64>,
    #[serde(default)]
    pub visibility_m: Option<f64>,
}

impl WeatherSnapshot {
    pub fn new(condition: WeatherCondition) -> Self {
        Self {
            condition,
            precipitation_mm_h: 0.0,
            temperature_c: None,
            visibility_m: None,
        }
    }

    /// Condition used for scoring: heavy rain counts as a storm.
    pub fn effective_condition(&self) -> WeatherCondition {
        match self.condition {
            WeatherCondition::Rain if self.precipitation_mm_h > STORM_PRECIPITATION_MM_H => {
                WeatherCondition::Storm
            }
            other => other,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DriverState {
    pub stress_percent: f64,
    pub focus_percent: f64,
}

impl Default for DriverState {
    fn default() -> Self {
        Self {
            stress_percent: DEFAULT_DRIVER_STRESS,
            focus_percent: DEFAULT_DRIVER_FOCUS,
        }
    }
}

/// Everything the risk engine looks at for one tick.
///
/// Built fresh by the navigation-state aggregator; the engine only reads it.
/// `route` runs in the direction of travel and may be empty.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PredictionContext {
    pub current_speed_kmh: f64,
    /// Posted limit; 0 (or any non-positive value) means the limit is unknown,
    /// which disables overspeed scoring and the curve speed multiplier.
    pub speed_limit_kmh: f64,
    pub position: LatLng,
    pub heading_deg: f64,
    #[serde(default)]
    pub route: Vec<LatLng>,
    #[serde(default)]
    pub weather: Option<WeatherSnapshot>,
    #[serde(default)]
    pub hazards: Vec<Hazard>,
    #[serde(default)]
    pub speed_cameras: Vec<SpeedCamera>,
    #[serde(default)]
    pub driver_stress_percent: Option<f64>,
}

impl PredictionContext {
    pub fn new(position: LatLng, current_speed_kmh: f64, speed_limit_kmh: f64) -> Self {
        Self {
            current_speed_kmh,
            speed_limit_kmh,
            position,
            heading_deg: 0.0,
            route: Vec::new(),
            weather: None,
            hazards: Vec::new(),
            speed_cameras: Vec::new(),
            driver_stress_percent: None,
        }
    }

    /// Stress estimate with the documented default substituted; garbage reads as default.
    pub fn driver_stress(&self) -> f64 {
        match self.driver_stress_percent {
            Some(s) if s.is_finite() => s.clamp(0.0, 100.0),
            _ => DEFAULT_DRIVER_STRESS,
        }
    }

    /// Speed with negative or non-finite readings treated as standstill.
    pub fn speed_kmh(&self) -> f64 {
        if self.current_speed_kmh.is_finite() {
            self.current_speed_kmh.max(0.0)
        } else {
            0.0
        }
    }

    pub fn weather_condition(&self) -> WeatherCondition {
        self.weather
            .as_ref()
            .map(|w| w.effective_condition())
            .unwrap_or(WeatherCondition::Clear)
    }
}
