//! Periodic and change-driven risk recomputation.
//!
//! A fixed tick (2 s by default) recomputes risk from a fresh context. Between
//! ticks, telemetry that moved far enough from the last computed sample
//! triggers an immediate recompute. Every result is published on the bus as a
//! `SafetyEvent::Risk`.
//!
//! The bus and its handlers are `Rc`-based, so [`RiskScheduler::run`] yields a
//! `!Send` future: drive it with `spawn_local` inside a `LocalSet`, or await
//! it directly on a current-thread runtime.

use crate::clock::Clock;
use crate::config::SchedulerConfig;
use crate::events::{EventBus, SafetyEvent};
use crate::geometry::{haversine_distance, heading_difference};
use crate::risk::{DangerZone, RiskEngine, RiskPrediction, RiskUpdate};
use crate::types::{LatLng, PredictionContext};
use serde::{Deserialize, Serialize};
use std::rc::Rc;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval, Duration, MissedTickBehavior};

/// Supplies the context for the next computation; `None` skips it.
pub trait ContextSource {
    fn next_context(&mut self) -> Option<PredictionContext>;
}

impl<F> ContextSource for F
where
    F: FnMut() -> Option<PredictionContext>,
{
    fn next_context(&mut self) -> Option<PredictionContext> {
        self()
    }
}

/// Minimal telemetry used to decide whether to recompute early.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    pub position: LatLng,
    pub speed_kmh: f64,
    pub heading_deg: f64,
}

impl TelemetrySample {
    pub fn from_context(ctx: &PredictionContext) -> Self {
        Self {
            position: ctx.position,
            speed_kmh: ctx.speed_kmh(),
            heading_deg: ctx.heading_deg,
        }
    }
}

pub struct RiskScheduler<S: ContextSource> {
    engine: RiskEngine,
    source: S,
    bus: EventBus,
    clock: Rc<dyn Clock>,
    config: SchedulerConfig,
    last_sample: Option<TelemetrySample>,
    ticks: u64,
}

impl<S: ContextSource> RiskScheduler<S> {
    pub fn new(
        engine: RiskEngine,
        source: S,
        bus: EventBus,
        clock: Rc<dyn Clock>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            engine,
            source,
            bus,
            clock,
            config,
            last_sample: None,
            ticks: 0,
        }
    }

    /// Compute and publish one update.
    pub fn tick(&mut self) -> Option<RiskUpdate> {
        let Some(ctx) = self.source.next_context() else {
            log::debug!("No prediction context available, skipping tick");
            return None;
        };

        let update = self.engine.assess(&ctx, self.clock.now());
        self.last_sample = Some(TelemetrySample::from_context(&ctx));
        self.ticks += 1;

        self.bus.publish(&SafetyEvent::Risk(update.clone()));
        Some(update)
    }

    /// Recompute immediately when `sample` differs enough from the last
    /// computed one; returns the update if a recompute happened.
    pub fn notify_telemetry(&mut self, sample: TelemetrySample) -> Option<RiskUpdate> {
        if !self.is_significant(&sample) {
            return None;
        }
        log::debug!(
            "Significant telemetry change ({:.0} km/h, {:.0} deg), recomputing",
            sample.speed_kmh,
            sample.heading_deg
        );
        self.tick()
    }

    pub fn is_significant(&self, sample: &TelemetrySample) -> bool {
        let Some(last) = &self.last_sample else {
            return true;
        };

        let speed_change = (sample.speed_kmh - last.speed_kmh).abs();
        let heading_change = heading_difference(sample.heading_deg, last.heading_deg);
        let displacement = haversine_distance(&sample.position, &last.position);

        speed_change >= self.config.speed_change_kmh
            || heading_change >= self.config.heading_change_deg
            || displacement >= self.config.displacement_m
    }

    /// Tick until `shutdown` turns true or its sender is dropped.
    pub async fn run(
        mut self,
        mut telemetry: mpsc::UnboundedReceiver<TelemetrySample>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Self {
        let period = Duration::from_millis(self.config.tick_interval_ms.max(1));
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        log::info!("Risk scheduler started ({} ms tick)", period.as_millis());

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick();
                }
                Some(sample) = telemetry.recv() => {
                    self.notify_telemetry(sample);
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        log::info!("Risk scheduler stopped after {} computations", self.ticks);
        self
    }

    pub fn tick_count(&self) -> u64 {
        self.ticks
    }

    pub fn engine(&self) -> &RiskEngine {
        &self.engine
    }

    pub fn last_prediction(&self) -> Option<&RiskPrediction> {
        self.engine.last_prediction()
    }

    pub fn danger_zones(&self) -> &[DangerZone] {
        self.engine.danger_zones()
    }
}
