//! Tunables for the risk engine, alert controller and scheduler.
//!
//! Every threshold and weight lives here with its production default so tests
//! can try other boundaries without touching the algorithms.

use crate::error::{SafetyError, SafetyResult};
use crate::types::WeatherCondition;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyConfig {
    pub risk: RiskConfig,
    pub alerts: AlertConfig,
    pub scheduler: SchedulerConfig,
    pub bootstrap: BootstrapConfig,
}

impl SafetyConfig {
    /// Parse a (possibly partial) JSON document; missing keys keep their defaults.
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        let config: SafetyConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> SafetyResult<()> {
        self.risk.validate()?;
        self.alerts.validate()?;
        if self.scheduler.tick_interval_ms == 0 {
            return Err(SafetyError::InvalidConfig(
                "scheduler.tick_interval_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Category weights for the overall score. They sum to 1.0 by default.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryWeights {
    pub operational: f64,
    pub environmental: f64,
    pub hazard: f64,
    pub human: f64,
    /// Inner weights of the operational category.
    pub overspeed_share: f64,
    pub late_braking_share: f64,
    /// Inner weights of the environmental category.
    pub sharp_turn_share: f64,
    pub lane_deviation_share: f64,
}

impl Default for CategoryWeights {
    fn default() -> Self {
        Self {
            operational: 0.20,
            environmental: 0.35,
            hazard: 0.15,
            human: 0.30,
            overspeed_share: 0.4,
            late_braking_share: 0.6,
            sharp_turn_share: 0.7,
            lane_deviation_share: 0.3,
        }
    }
}

impl CategoryWeights {
    fn all(&self) -> [f64; 8] {
        [
            self.operational,
            self.environmental,
            self.hazard,
            self.human,
            self.overspeed_share,
            self.late_braking_share,
            self.sharp_turn_share,
            self.lane_deviation_share,
        ]
    }
}

/// Per-condition multipliers applied to overspeed and sharp-turn risk.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherRiskMultipliers {
    pub clear: f64,
    pub fog: f64,
    pub rain: f64,
    pub storm: f64,
    pub snow: f64,
    pub ice: f64,
}

impl Default for WeatherRiskMultipliers {
    fn default() -> Self {
        Self {
            clear: 1.0,
            fog: 1.2,
            rain: 1.3,
            storm: 1.5,
            snow: 1.6,
            ice: 1.6,
        }
    }
}

impl WeatherRiskMultipliers {
    pub fn for_condition(&self, condition: WeatherCondition) -> f64 {
        match condition {
            WeatherCondition::Clear => self.clear,
            WeatherCondition::Fog => self.fog,
            WeatherCondition::Rain => self.rain,
            WeatherCondition::Storm => self.storm,
            WeatherCondition::Snow => self.snow,
            WeatherCondition::Ice => self.ice,
        }
    }
}

/// Curve classification by circumradius (metres, exclusive upper bounds).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurveThresholds {
    pub hairpin_radius_m: f64,
    pub sharp_radius_m: f64,
    pub moderate_radius_m: f64,
    pub gentle_radius_m: f64,
    pub hairpin_score: f64,
    pub sharp_score: f64,
    pub moderate_score: f64,
    pub gentle_score: f64,
}

impl Default for CurveThresholds {
    fn default() -> Self {
        Self {
            hairpin_radius_m: 61.0,
            sharp_radius_m: 152.0,
            moderate_radius_m: 305.0,
            gentle_radius_m: 915.0,
            hairpin_score: 80.0,
            sharp_score: 60.0,
            moderate_score: 35.0,
            gentle_score: 15.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    pub lookahead_m: f64,
    pub weights: CategoryWeights,
    pub weather_multipliers: WeatherRiskMultipliers,
    pub curves: CurveThresholds,
    /// Sub-scores strictly above this become ranked risk factors.
    pub factor_threshold: u8,
    /// Stress above which overspeed gets +10 and reaction time grows.
    pub elevated_stress: f64,
    /// Stress above which collision risk gets +15.
    pub high_stress: f64,
    /// Stress above which lane deviation reads 45 instead of 25.
    pub severe_stress: f64,
    pub reaction_time_s: f64,
    pub stressed_reaction_time_s: f64,
    /// Below this speed late braking is not assessed.
    pub min_braking_speed_kmh: f64,
    /// Half-angle of the cone in front of the vehicle holding "upcoming" obstacles.
    pub upcoming_half_angle_deg: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            lookahead_m: 300.0,
            weights: CategoryWeights::default(),
            weather_multipliers: WeatherRiskMultipliers::default(),
            curves: CurveThresholds::default(),
            factor_threshold: 20,
            elevated_stress: 60.0,
            high_stress: 70.0,
            severe_stress: 75.0,
            reaction_time_s: 1.5,
            stressed_reaction_time_s: 2.5,
            min_braking_speed_kmh: 10.0,
            upcoming_half_angle_deg: 90.0,
        }
    }
}

impl RiskConfig {
    fn validate(&self) -> SafetyResult<()> {
        if self.weights.all().iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(SafetyError::InvalidConfig(
                "risk weights must be finite and non-negative".to_string(),
            ));
        }
        if self.lookahead_m.is_nan() || self.lookahead_m <= 0.0 {
            return Err(SafetyError::InvalidConfig(
                "risk.lookahead_m must be positive".to_string(),
            ));
        }
        let c = &self.curves;
        if !(c.hairpin_radius_m < c.sharp_radius_m
            && c.sharp_radius_m < c.moderate_radius_m
            && c.moderate_radius_m < c.gentle_radius_m)
        {
            return Err(SafetyError::InvalidConfig(
                "curve radius thresholds must be strictly increasing".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    pub warning_threshold: f64,
    pub caution_threshold: f64,
    pub critical_threshold: f64,
    pub warning_cooldown_s: f64,
    pub caution_cooldown_s: f64,
    pub critical_cooldown_s: f64,
    pub haptics_enabled: bool,
    pub hud_flash_color: String,
    pub hud_flash_duration_ms: u64,
    /// Number of factors returned by `current_top_factors`.
    pub top_factor_count: usize,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            warning_threshold: 60.0,
            caution_threshold: 75.0,
            critical_threshold: 90.0,
            warning_cooldown_s: 10.0,
            caution_cooldown_s: 8.0,
            critical_cooldown_s: 5.0,
            haptics_enabled: true,
            hud_flash_color: "#FF3B30".to_string(),
            hud_flash_duration_ms: 1500,
            top_factor_count: 3,
        }
    }
}

impl AlertConfig {
    fn validate(&self) -> SafetyResult<()> {
        if !(self.warning_threshold <= self.caution_threshold
            && self.caution_threshold <= self.critical_threshold)
        {
            return Err(SafetyError::InvalidConfig(
                "alert thresholds must satisfy warning <= caution <= critical".to_string(),
            ));
        }
        let cooldowns = [
            self.warning_cooldown_s,
            self.caution_cooldown_s,
            self.critical_cooldown_s,
        ];
        if cooldowns.iter().any(|c| !c.is_finite() || *c < 0.0) {
            return Err(SafetyError::InvalidConfig(
                "alert cooldowns must be finite and non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub tick_interval_ms: u64,
    /// Telemetry changes at or above these trigger an immediate recompute.
    pub speed_change_kmh: f64,
    pub heading_change_deg: f64,
    pub displacement_m: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 2000,
            speed_change_kmh: 10.0,
            heading_change_deg: 30.0,
            displacement_m: 100.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    pub max_attempts: u32,
    pub base_backoff_ms: u64,
    /// Upper bound for a single read of the driver-state source.
    pub attempt_timeout_ms: u64,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_backoff_ms: 100,
            attempt_timeout_ms: 250,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights_sum_to_one() {
        let w = CategoryWeights::default();
        let sum = w.operational + w.environmental + w.hazard + w.human;
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_defaults_validate() {
        assert!(SafetyConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = SafetyConfig::from_json_str(
            r#"{ "alerts": { "haptics_enabled": false }, "scheduler": { "tick_interval_ms": 500 } }"#,
        )
        .unwrap();
        assert!(!config.alerts.haptics_enabled);
        assert_eq!(config.alerts.caution_cooldown_s, 8.0);
        assert_eq!(config.scheduler.tick_interval_ms, 500);
        assert_eq!(config.risk.lookahead_m, 300.0);
    }

    #[test]
    fn test_rejects_negative_weight() {
        let mut config = SafetyConfig::default();
        config.risk.weights.hazard = -0.1;
        assert!(matches!(
            config.validate(),
            Err(SafetyError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_rejects_unordered_thresholds() {
        let json = r#"{ "alerts": { "warning_threshold": 80.0, "caution_threshold": 75.0 } }"#;
        assert!(SafetyConfig::from_json_str(json).is_err());
    }

    #[test]
    fn test_weather_multiplier_lookup() {
        let m = WeatherRiskMultipliers::default();
        assert_eq!(m.for_condition(WeatherCondition::Storm), 1.5);
        assert_eq!(m.for_condition(WeatherCondition::Snow), 1.6);
    }
}
