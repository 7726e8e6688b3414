use super::curves::{detect_curves, distance_multiplier, speed_multiplier, CurveDetection};
use super::scores::{
    overall_score, to_score, DangerCategory, DangerZone, RiskFactor, RiskFactorType, RiskScores,
    RiskUpdate, SeverityTier,
};
use crate::config::RiskConfig;
use crate::geometry::{haversine_distance, heading_difference, initial_bearing};
use crate::physics::{friction_coefficient, stopping_distance};
use crate::types::{LatLng, PredictionContext};

/// Minimum obstacle distance for which a bearing is meaningful.
const MIN_BEARING_DISTANCE_M: f64 = 1.0;
const HIGH_SEVERITY_HAZARD: u8 = 80;

/// One sub-score plus what produced it, kept for factor reasons.
#[derive(Clone, Debug, Default, PartialEq)]
struct ScoreDetail {
    score: u8,
    distance_m: f64,
    reason: String,
}

impl ScoreDetail {
    fn zero() -> Self {
        Self::default()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum ObstacleKind {
    Hazard { severity: u8 },
    SpeedCamera,
}

#[derive(Clone, Copy, Debug)]
struct Obstacle {
    kind: ObstacleKind,
    position: LatLng,
    distance_m: f64,
}

/// Result of the most recent `predict`, kept for the query API.
#[derive(Clone, Debug, PartialEq)]
pub struct RiskPrediction {
    pub scores: RiskScores,
    pub factors: Vec<RiskFactor>,
    pub danger_zones: Vec<DangerZone>,
}

/// Scores a `PredictionContext` into five sub-scores and an overall score.
///
/// Scoring is a pure function of the context and configuration; the engine
/// only remembers the last result so hosts can query it between ticks.
pub struct RiskEngine {
    config: RiskConfig,
    last_prediction: Option<RiskPrediction>,
}

impl RiskEngine {
    pub fn new(config: RiskConfig) -> Self {
        Self {
            config,
            last_prediction: None,
        }
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    /// Score the context. Never fails: degenerate input degrades sub-scores to 0.
    pub fn predict(&mut self, ctx: &PredictionContext) -> RiskScores {
        let obstacles = self.obstacles_in_lookahead(ctx);
        let curves = if ctx.position.is_valid() {
            detect_curves(
                &ctx.position,
                &ctx.route,
                self.config.lookahead_m,
                &self.config.curves,
            )
        } else {
            Vec::new()
        };

        let overspeed = self.overspeed(ctx);
        let sharp_turn = self.sharp_turn(ctx, curves.first());
        let collision = self.collision(ctx, &obstacles);
        let late_braking = self.late_braking(ctx, &obstacles);
        let lane_deviation = self.lane_deviation(ctx);

        let overall = overall_score(
            overspeed.score,
            sharp_turn.score,
            collision.score,
            late_braking.score,
            lane_deviation.score,
            ctx.driver_stress(),
            &self.config.weights,
        );

        let scores = RiskScores {
            overspeed: overspeed.score,
            sharp_turn: sharp_turn.score,
            collision: collision.score,
            late_braking: late_braking.score,
            lane_deviation: lane_deviation.score,
            overall,
        };

        let details = [
            (RiskFactorType::Overspeed, overspeed),
            (RiskFactorType::SharpTurn, sharp_turn),
            (RiskFactorType::Collision, collision),
            (RiskFactorType::LateBraking, late_braking),
            (RiskFactorType::LaneDeviation, lane_deviation),
        ];
        let factors = self.rank_factors(details);
        let danger_zones = self.danger_zones_for(ctx, &curves, &obstacles);

        log::debug!(
            "risk: overall={} overspeed={} sharp_turn={} collision={} late_braking={} lane={}",
            scores.overall,
            scores.overspeed,
            scores.sharp_turn,
            scores.collision,
            scores.late_braking,
            scores.lane_deviation
        );

        self.last_prediction = Some(RiskPrediction {
            scores,
            factors,
            danger_zones,
        });
        scores
    }

    /// `predict` packaged as a publishable update.
    pub fn assess(&mut self, ctx: &PredictionContext, timestamp: f64) -> RiskUpdate {
        let scores = self.predict(ctx);
        let factors = self
            .last_prediction
            .as_ref()
            .map(|p| p.factors.clone())
            .unwrap_or_default();
        RiskUpdate {
            scores,
            factors,
            timestamp,
        }
    }

    pub fn last_prediction(&self) -> Option<&RiskPrediction> {
        self.last_prediction.as_ref()
    }

    pub fn danger_zones(&self) -> &[DangerZone] {
        self.last_prediction
            .as_ref()
            .map(|p| p.danger_zones.as_slice())
            .unwrap_or(&[])
    }

    pub fn reset(&mut self) {
        self.last_prediction = None;
    }

    fn weather_multiplier(&self, ctx: &PredictionContext) -> f64 {
        self.config
            .weather_multipliers
            .for_condition(ctx.weather_condition())
    }

    fn overspeed(&self, ctx: &PredictionContext) -> ScoreDetail {
        let limit = ctx.speed_limit_kmh;
        if !(limit.is_finite() && limit > 0.0) {
            return ScoreDetail::zero();
        }

        let delta = ctx.speed_kmh() - limit;
        let mut base: f64 = if delta <= 0.0 {
            return ScoreDetail::zero();
        } else if delta <= 5.0 {
            20.0
        } else if delta <= 10.0 {
            40.0
        } else if delta <= 20.0 {
            65.0
        } else {
            85.0
        };

        if ctx.driver_stress() > self.config.elevated_stress {
            base = (base + 10.0).min(100.0);
        }

        ScoreDetail {
            score: to_score(base * self.weather_multiplier(ctx)),
            distance_m: 0.0,
            reason: format!("{:.0} km/h over the {:.0} km/h limit", delta, limit),
        }
    }

    fn sharp_turn(&self, ctx: &PredictionContext, curve: Option<&CurveDetection>) -> ScoreDetail {
        let Some(curve) = curve else {
            return ScoreDetail::zero();
        };

        let raw = curve.base_score
            * distance_multiplier(curve.distance_m)
            * speed_multiplier(ctx.speed_kmh(), ctx.speed_limit_kmh)
            * self.weather_multiplier(ctx);

        ScoreDetail {
            score: to_score(raw),
            distance_m: curve.distance_m,
            reason: format!(
                "{} curve (radius {:.0} m) in {:.0} m",
                curve.tier.label(),
                curve.radius_m,
                curve.distance_m
            ),
        }
    }

    fn collision(&self, ctx: &PredictionContext, obstacles: &[Obstacle]) -> ScoreDetail {
        let mut best = ScoreDetail::zero();
        let mut best_raw = 0.0_f64;

        for obstacle in obstacles {
            let mut raw = proximity_risk(obstacle.distance_m);
            if let ObstacleKind::Hazard { severity } = obstacle.kind {
                if severity >= HIGH_SEVERITY_HAZARD {
                    raw = (raw * 1.3).min(100.0);
                }
            }
            if raw > best_raw {
                best_raw = raw;
                best = ScoreDetail {
                    score: 0,
                    distance_m: obstacle.distance_m,
                    reason: match obstacle.kind {
                        ObstacleKind::Hazard { .. } => {
                            format!("hazard {:.0} m away", obstacle.distance_m)
                        }
                        ObstacleKind::SpeedCamera => {
                            format!("speed camera {:.0} m away", obstacle.distance_m)
                        }
                    },
                };
            }
        }

        if best_raw <= 0.0 {
            return ScoreDetail::zero();
        }
        if ctx.driver_stress() > self.config.high_stress {
            best_raw = (best_raw + 15.0).min(100.0);
        }
        best.score = to_score(best_raw);
        best
    }

    fn late_braking(&self, ctx: &PredictionContext, obstacles: &[Obstacle]) -> ScoreDetail {
        let speed = ctx.speed_kmh();
        if speed < self.config.min_braking_speed_kmh {
            return ScoreDetail::zero();
        }

        let stopping = self.stopping_distance_m(ctx);
        if stopping <= 0.0 {
            return ScoreDetail::zero();
        }

        let mut best = ScoreDetail::zero();
        let mut best_raw = 0.0_f64;
        for obstacle in obstacles.iter().filter(|o| self.is_upcoming(ctx, o)) {
            let raw = braking_risk(stopping, obstacle.distance_m);
            if raw > best_raw {
                best_raw = raw;
                best = ScoreDetail {
                    score: 0,
                    distance_m: obstacle.distance_m,
                    reason: if stopping > obstacle.distance_m {
                        format!(
                            "stopping distance {:.0} m exceeds {:.0} m to obstacle",
                            stopping, obstacle.distance_m
                        )
                    } else {
                        format!(
                            "only {:.0} m braking margin to obstacle",
                            obstacle.distance_m - stopping
                        )
                    },
                };
            }
        }

        best.score = to_score(best_raw);
        best
    }

    /// Placeholder until real lane tracking exists: driven by stress alone.
    fn lane_deviation(&self, ctx: &PredictionContext) -> ScoreDetail {
        let stress = ctx.driver_stress();
        let score = if stress > self.config.severe_stress {
            45
        } else if stress > self.config.elevated_stress {
            25
        } else {
            0
        };
        if score == 0 {
            return ScoreDetail::zero();
        }
        ScoreDetail {
            score,
            distance_m: 0.0,
            reason: format!("driver stress {:.0}% raises lane-keeping risk", stress),
        }
    }

    fn stopping_distance_m(&self, ctx: &PredictionContext) -> f64 {
        let reaction = if ctx.driver_stress() > self.config.elevated_stress {
            self.config.stressed_reaction_time_s
        } else {
            self.config.reaction_time_s
        };
        stopping_distance(
            ctx.speed_kmh(),
            reaction,
            friction_coefficient(ctx.weather_condition()),
        )
        .total()
    }

    fn is_upcoming(&self, ctx: &PredictionContext, obstacle: &Obstacle) -> bool {
        if obstacle.distance_m < MIN_BEARING_DISTANCE_M || !ctx.heading_deg.is_finite() {
            return true;
        }
        let bearing = initial_bearing(&ctx.position, &obstacle.position);
        if !bearing.is_finite() {
            return true;
        }
        heading_difference(ctx.heading_deg, bearing) <= self.config.upcoming_half_angle_deg
    }

    fn obstacles_in_lookahead(&self, ctx: &PredictionContext) -> Vec<Obstacle> {
        if !ctx.position.is_valid() {
            return Vec::new();
        }

        let hazards = ctx.hazards.iter().map(|h| Obstacle {
            kind: ObstacleKind::Hazard {
                severity: h.severity,
            },
            position: h.position,
            distance_m: haversine_distance(&ctx.position, &h.position),
        });
        let cameras = ctx.speed_cameras.iter().map(|c| Obstacle {
            kind: ObstacleKind::SpeedCamera,
            position: c.position,
            distance_m: haversine_distance(&ctx.position, &c.position),
        });

        hazards
            .chain(cameras)
            .filter(|o| o.distance_m.is_finite() && o.distance_m < self.config.lookahead_m)
            .collect()
    }

    fn rank_factors(&self, details: [(RiskFactorType, ScoreDetail); 5]) -> Vec<RiskFactor> {
        let mut factors: Vec<RiskFactor> = details
            .into_iter()
            .filter(|(_, d)| d.score > self.config.factor_threshold)
            .map(|(factor_type, d)| RiskFactor {
                factor_type,
                score: d.score,
                reason: d.reason,
                distance_meters: d.distance_m,
                severity: SeverityTier::from_score(d.score),
            })
            .collect();
        // stable: equal scores keep declaration order
        factors.sort_by(|a, b| b.score.cmp(&a.score));
        factors
    }

    fn danger_zones_for(
        &self,
        ctx: &PredictionContext,
        curves: &[CurveDetection],
        obstacles: &[Obstacle],
    ) -> Vec<DangerZone> {
        let mut zones: Vec<DangerZone> = curves
            .iter()
            .map(|c| DangerZone {
                position: c.apex,
                category: DangerCategory::SharpTurn,
                distance_meters: c.distance_m,
                severity: to_score(c.base_score),
            })
            .collect();

        for obstacle in obstacles {
            let (category, severity) = match obstacle.kind {
                ObstacleKind::Hazard { severity } => (DangerCategory::Hazard, severity.min(100)),
                ObstacleKind::SpeedCamera => (
                    DangerCategory::SpeedCamera,
                    to_score(proximity_risk(obstacle.distance_m)),
                ),
            };
            zones.push(DangerZone {
                position: obstacle.position,
                category,
                distance_meters: obstacle.distance_m,
                severity,
            });
        }

        if ctx.speed_kmh() >= self.config.min_braking_speed_kmh {
            let stopping = self.stopping_distance_m(ctx);
            for obstacle in obstacles.iter().filter(|o| self.is_upcoming(ctx, o)) {
                let risk = braking_risk(stopping, obstacle.distance_m);
                if risk > 0.0 {
                    zones.push(DangerZone {
                        position: obstacle.position,
                        category: DangerCategory::BrakingRequired,
                        distance_meters: obstacle.distance_m,
                        severity: to_score(risk),
                    });
                }
            }
        }

        zones.sort_by(|a, b| a.distance_meters.total_cmp(&b.distance_meters));
        zones
    }
}

impl Default for RiskEngine {
    fn default() -> Self {
        Self::new(RiskConfig::default())
    }
}

/// Base collision risk by distance band.
fn proximity_risk(distance_m: f64) -> f64 {
    if distance_m < 50.0 {
        90.0
    } else if distance_m < 100.0 {
        70.0
    } else if distance_m < 200.0 {
        45.0
    } else if distance_m < 300.0 {
        25.0
    } else {
        0.0
    }
}

/// Risk of not stopping in time for an obstacle `distance_m` ahead.
fn braking_risk(stopping_m: f64, distance_m: f64) -> f64 {
    if stopping_m.is_nan() || stopping_m <= 0.0 {
        return 0.0;
    }
    if stopping_m > distance_m {
        ((stopping_m - distance_m) / stopping_m * 150.0).min(100.0)
    } else {
        let margin = distance_m - stopping_m;
        if margin < 20.0 {
            50.0
        } else if margin < 50.0 {
            25.0
        } else {
            0.0
        }
    }
}
