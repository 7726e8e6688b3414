use crate::config::CategoryWeights;
use crate::types::LatLng;
use serde::{Deserialize, Serialize};

/// Convert a raw score to the [0,100] integer scale; NaN reads as zero.
pub fn to_score(raw: f64) -> u8 {
    if !raw.is_finite() {
        return 0;
    }
    raw.clamp(0.0, 100.0).round() as u8
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskScores {
    pub overspeed: u8,
    pub sharp_turn: u8,
    pub collision: u8,
    pub late_braking: u8,
    pub lane_deviation: u8,
    pub overall: u8,
}

/// Weighted aggregate of the five sub-scores plus driver stress.
///
/// operational   = overspeed·0.4 + late_braking·0.6   (×0.20)
/// environmental = sharp_turn·0.7 + lane_deviation·0.3 (×0.35)
/// hazard        = collision                          (×0.15)
/// human         = stress                             (×0.30)
///
/// Summed, clamped to [0,100], then rounded. The inner weights are applied
/// as-is even though they do not renormalise each category.
pub fn overall_score(
    overspeed: u8,
    sharp_turn: u8,
    collision: u8,
    late_braking: u8,
    lane_deviation: u8,
    driver_stress: f64,
    w: &CategoryWeights,
) -> u8 {
    let operational =
        f64::from(overspeed) * w.overspeed_share + f64::from(late_braking) * w.late_braking_share;
    let environmental =
        f64::from(sharp_turn) * w.sharp_turn_share + f64::from(lane_deviation) * w.lane_deviation_share;
    let hazard = f64::from(collision);
    let human = driver_stress / 100.0 * 100.0;

    let raw = operational * w.operational
        + environmental * w.environmental
        + hazard * w.hazard
        + human * w.human;
    to_score(raw)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskFactorType {
    Overspeed,
    SharpTurn,
    Collision,
    LateBraking,
    LaneDeviation,
}

impl RiskFactorType {
    pub fn label(&self) -> &'static str {
        match self {
            RiskFactorType::Overspeed => "overspeed",
            RiskFactorType::SharpTurn => "sharp_turn",
            RiskFactorType::Collision => "collision",
            RiskFactorType::LateBraking => "late_braking",
            RiskFactorType::LaneDeviation => "lane_deviation",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeverityTier {
    Low,
    Moderate,
    High,
    Critical,
}

impl SeverityTier {
    pub fn from_score(score: u8) -> Self {
        match score {
            75.. => SeverityTier::Critical,
            50..=74 => SeverityTier::High,
            35..=49 => SeverityTier::Moderate,
            _ => SeverityTier::Low,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RiskFactor {
    pub factor_type: RiskFactorType,
    pub score: u8,
    pub reason: String,
    pub distance_meters: f64,
    pub severity: SeverityTier,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DangerCategory {
    SharpTurn,
    Hazard,
    SpeedCamera,
    BrakingRequired,
}

/// Map-overlay hint for a detected danger; not authoritative.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DangerZone {
    pub position: LatLng,
    pub category: DangerCategory,
    pub distance_meters: f64,
    pub severity: u8,
}

/// Published after every assessment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RiskUpdate {
    pub scores: RiskScores,
    pub factors: Vec<RiskFactor>,
    pub timestamp: f64,
}

impl RiskUpdate {
    pub fn top_factor(&self) -> Option<&RiskFactor> {
        self.factors.first()
    }
}
