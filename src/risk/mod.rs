//! Driving risk scoring
//!
//! Turns a `PredictionContext` into five sub-scores (overspeed, sharp turn,
//! collision, late braking, lane deviation), a weighted overall score and a
//! ranked list of contributing factors.

pub mod curves;
pub mod engine;
pub mod scores;

pub use curves::{classify_curve_radius, CurveDetection, CurveTier};
pub use engine::{RiskEngine, RiskPrediction};
pub use scores::{
    overall_score, to_score, DangerCategory, DangerZone, RiskFactor, RiskFactorType, RiskScores,
    RiskUpdate, SeverityTier,
};
