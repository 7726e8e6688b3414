use crate::config::AlertConfig;
use crate::risk::{RiskFactor, RiskFactorType};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    Warning,
    Caution,
    Critical,
}

impl AlertLevel {
    pub fn label(&self) -> &'static str {
        match self {
            AlertLevel::Warning => "warning",
            AlertLevel::Caution => "caution",
            AlertLevel::Critical => "critical",
        }
    }

    /// Highest level whose threshold `score` reaches, checked critical first.
    pub fn for_score(score: f64, config: &AlertConfig) -> Option<Self> {
        if !score.is_finite() {
            return None;
        }
        if score >= config.critical_threshold {
            Some(AlertLevel::Critical)
        } else if score >= config.caution_threshold {
            Some(AlertLevel::Caution)
        } else if score >= config.warning_threshold {
            Some(AlertLevel::Warning)
        } else {
            None
        }
    }

    pub fn cooldown_s(&self, config: &AlertConfig) -> f64 {
        match self {
            AlertLevel::Warning => config.warning_cooldown_s,
            AlertLevel::Caution => config.caution_cooldown_s,
            AlertLevel::Critical => config.critical_cooldown_s,
        }
    }

    pub fn haptic_pattern(&self) -> HapticPattern {
        match self {
            AlertLevel::Warning => HapticPattern::None,
            AlertLevel::Caution => HapticPattern::Medium,
            AlertLevel::Critical => HapticPattern::Urgent,
        }
    }

    /// Ledger entries a dispatch at this level clears.
    pub fn escalates_over(&self) -> &'static [AlertLevel] {
        match self {
            AlertLevel::Critical => &[AlertLevel::Warning, AlertLevel::Caution],
            AlertLevel::Caution => &[AlertLevel::Warning],
            AlertLevel::Warning => &[],
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HapticPattern {
    None,
    Medium,
    Urgent,
}

impl HapticPattern {
    pub fn base_intensity(&self) -> f64 {
        match self {
            HapticPattern::None => 0.0,
            HapticPattern::Medium => 0.6,
            HapticPattern::Urgent => 1.0,
        }
    }
}

/// Built and dispatched within one controller step; never stored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SafetyAlert {
    pub level: AlertLevel,
    pub risk_score: u8,
    pub message: String,
    pub haptic_pattern: HapticPattern,
    pub requires_hud_flash: bool,
}

impl SafetyAlert {
    pub fn new(level: AlertLevel, risk_score: u8, top_factor: Option<&RiskFactor>) -> Self {
        Self {
            level,
            risk_score,
            message: alert_message(top_factor.map(|f| f.factor_type), level).to_string(),
            haptic_pattern: level.haptic_pattern(),
            requires_hud_flash: level == AlertLevel::Critical,
        }
    }
}

/// Spoken text for a factor at a given level.
pub fn alert_message(factor: Option<RiskFactorType>, level: AlertLevel) -> &'static str {
    use AlertLevel::*;
    use RiskFactorType::*;

    match (factor, level) {
        (Some(Overspeed), Warning) => "You are above the speed limit.",
        (Some(Overspeed), Caution) => "Slow down, you are well over the speed limit.",
        (Some(Overspeed), Critical) => "Slow down now! Speed is dangerously high.",

        (Some(SharpTurn), Warning) => "Curve ahead, ease off the accelerator.",
        (Some(SharpTurn), Caution) => "Sharp curve ahead, reduce your speed.",
        (Some(SharpTurn), Critical) => "Dangerous curve! Brake now.",

        (Some(Collision), Warning) => "Hazard reported ahead.",
        (Some(Collision), Caution) => "Hazard close ahead, stay alert.",
        (Some(Collision), Critical) => "Hazard immediately ahead! Be ready to stop.",

        (Some(LateBraking), Warning) => "Keep a safe braking distance.",
        (Some(LateBraking), Caution) => "Start braking, obstacle ahead.",
        (Some(LateBraking), Critical) => "Brake now! Not enough distance to stop.",

        (Some(LaneDeviation), Warning) => "Stay centred in your lane.",
        (Some(LaneDeviation), Caution) => "You may be drifting, keep to your lane.",
        (Some(LaneDeviation), Critical) => "Lane departure risk! Hold your lane.",

        (None, Warning) => "Drive carefully.",
        (None, Caution) => "Caution, driving risk is elevated.",
        (None, Critical) => "Danger! Reduce speed immediately.",
    }
}
