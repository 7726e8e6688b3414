use super::alert::{AlertLevel, HapticPattern, SafetyAlert};
use super::cooldown::CooldownLedger;
use crate::adaptation::{driver_adaptation, weather_adaptation, DriverAdaptation, WeatherAdaptation};
use crate::bootstrap::{bootstrap_driver_state, DriverStateBootstrap};
use crate::clock::Clock;
use crate::config::{AlertConfig, BootstrapConfig};
use crate::error::{AlertChannel, SafetyResult};
use crate::events::{EventBus, EventKind, SafetyEvent, Subscription};
use crate::risk::{to_score, RiskFactor, RiskUpdate};
use crate::sinks::{AlertSinks, AnnounceOptions, AnnouncementPriority, HudFlashRequest};
use crate::types::{DriverState, WeatherSnapshot};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrchestratorState {
    /// Not subscribed; updates are ignored
    Idle,
    /// Subscribed to risk, weather and driver-state events
    Active,
}

/// Dispatch counters since the last `init`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestratorStats {
    pub dispatched: u64,
    pub suppressed: u64,
    pub channel_failures: u64,
}

struct ControllerState {
    config: AlertConfig,
    phase: OrchestratorState,
    ledger: CooldownLedger,
    weather: WeatherAdaptation,
    driver: DriverAdaptation,
    last_update: Option<RiskUpdate>,
    stats: OrchestratorStats,
}

impl ControllerState {
    fn reset(&mut self) {
        self.ledger.clear();
        self.weather = WeatherAdaptation::default();
        self.driver = DriverAdaptation::default();
        self.last_update = None;
    }
}

/// What one alert sends to each channel.
struct DispatchPlan {
    voice: AnnounceOptions,
    haptic: Option<(HapticPattern, f64)>,
    hud: Option<HudFlashRequest>,
}

/// Shared between the orchestrator handle and its bus handlers.
struct Core {
    state: RefCell<ControllerState>,
    sinks: AlertSinks,
    clock: Rc<dyn Clock>,
}

impl Core {
    fn on_risk_update(&self, update: &RiskUpdate) -> Option<SafetyAlert> {
        let now = self.clock.now();

        let (alert, plan) = {
            let mut st = self.state.borrow_mut();
            if st.phase != OrchestratorState::Active {
                return None;
            }
            st.last_update = Some(update.clone());

            let intensity = st.weather.warning_intensity_multiplier;
            let adapted = f64::from(update.scores.overall) * intensity;
            let level = AlertLevel::for_score(adapted, &st.config)?;

            if !st.ledger.allows(level, now, &st.config) {
                st.stats.suppressed += 1;
                log::debug!(
                    "Suppressed {} alert (score {:.1}) inside cooldown",
                    level.label(),
                    adapted
                );
                return None;
            }

            let alert = SafetyAlert::new(level, to_score(adapted), update.top_factor());
            let plan = plan_dispatch(&alert, &st.config, &st.weather, &st.driver);

            st.ledger.record(level, now);
            st.stats.dispatched += 1;
            (alert, plan)
        };

        log::info!(
            "Dispatching {} alert, score {}: {}",
            alert.level.label(),
            alert.risk_score,
            alert.message
        );

        // sinks may publish back onto the bus, so no borrow is held here
        let failures = self.dispatch(&alert, &plan);
        if failures > 0 {
            self.state.borrow_mut().stats.channel_failures += failures;
        }
        Some(alert)
    }

    fn dispatch(&self, alert: &SafetyAlert, plan: &DispatchPlan) -> u64 {
        let mut failures = 0;
        let mut report = |channel: AlertChannel, result: SafetyResult<()>| {
            if let Err(e) = result {
                log::warn!("{} alert on {} channel failed: {}", alert.level.label(), channel, e);
                failures += 1;
            }
        };

        report(
            AlertChannel::Voice,
            self.sinks.voice.announce(&alert.message, &plan.voice),
        );
        if let Some((pattern, intensity)) = plan.haptic {
            report(AlertChannel::Haptic, self.sinks.haptic.vibrate(pattern, intensity));
        }
        if let Some(request) = &plan.hud {
            report(AlertChannel::HudFlash, self.sinks.hud.trigger(request));
        }
        if let Some(analytics) = &self.sinks.analytics {
            report(AlertChannel::Analytics, analytics.record(alert));
        }

        failures
    }

    fn on_weather(&self, snapshot: &WeatherSnapshot) -> bool {
        let mut st = self.state.borrow_mut();
        if st.phase != OrchestratorState::Active {
            return false;
        }
        let next = weather_adaptation(Some(snapshot));
        if next.condition_label != st.weather.condition_label {
            log::info!(
                "Weather adaptation {} -> {}",
                st.weather.condition_label,
                next.condition_label
            );
        }
        st.weather = next;
        true
    }

    fn on_driver_state(&self, driver: &DriverState) -> bool {
        let mut st = self.state.borrow_mut();
        if st.phase != OrchestratorState::Active {
            return false;
        }
        let next = driver_adaptation(driver);
        if next.stress_level != st.driver.stress_level {
            log::info!(
                "Driver stress level {:?} -> {:?}",
                st.driver.stress_level,
                next.stress_level
            );
        }
        st.driver = next;
        true
    }
}

fn plan_dispatch(
    alert: &SafetyAlert,
    config: &AlertConfig,
    weather: &WeatherAdaptation,
    driver: &DriverAdaptation,
) -> DispatchPlan {
    let level = alert.level;
    let priority = match level {
        AlertLevel::Warning => AnnouncementPriority::Normal,
        AlertLevel::Caution => AnnouncementPriority::High,
        AlertLevel::Critical => AnnouncementPriority::Critical,
    };
    let throttle_ms = (level.cooldown_s(config) * 1000.0).round().max(0.0) as u64;

    let voice = AnnounceOptions {
        priority,
        is_critical: level == AlertLevel::Critical,
        throttle_ms,
        entity_id: format!("safety-{}", level.label()),
        rate: driver.voice_rate_multiplier,
        pitch: driver.voice_pitch_multiplier,
    };

    let haptic = (config.haptics_enabled && alert.haptic_pattern != HapticPattern::None).then(|| {
        let intensity =
            (alert.haptic_pattern.base_intensity() * weather.warning_intensity_multiplier).min(1.0);
        (alert.haptic_pattern, intensity)
    });

    let hud = alert.requires_hud_flash.then(|| HudFlashRequest {
        color: config.hud_flash_color.clone(),
        duration_ms: config.hud_flash_duration_ms,
    });

    DispatchPlan { voice, haptic, hud }
}

/// Turns risk updates into throttled, adapted alerts.
///
/// Idle until [`init`](Self::init) subscribes it to a bus; while active it
/// keeps the latest weather and driver adaptations, gates alerts through the
/// per-level cooldown ledger and fans each alert out to the sinks.
/// [`shutdown`](Self::shutdown) returns it to a fresh idle state.
pub struct SafetyOrchestrator {
    core: Rc<Core>,
    subscriptions: Vec<Subscription>,
}

impl SafetyOrchestrator {
    pub fn new(config: AlertConfig, sinks: AlertSinks, clock: Rc<dyn Clock>) -> Self {
        let state = ControllerState {
            config,
            phase: OrchestratorState::Idle,
            ledger: CooldownLedger::new(),
            weather: WeatherAdaptation::default(),
            driver: DriverAdaptation::default(),
            last_update: None,
            stats: OrchestratorStats::default(),
        };
        Self {
            core: Rc::new(Core {
                state: RefCell::new(state),
                sinks,
                clock,
            }),
            subscriptions: Vec::new(),
        }
    }

    /// Subscribe to the bus and become active. No-op when already active.
    pub fn init(&mut self, bus: &EventBus) {
        if self.is_active() {
            log::debug!("Safety orchestrator already active");
            return;
        }

        {
            let mut st = self.core.state.borrow_mut();
            st.reset();
            st.stats = OrchestratorStats::default();
            st.phase = OrchestratorState::Active;
        }

        let core = Rc::clone(&self.core);
        let risk = bus.subscribe(EventKind::Risk, move |event| {
            if let SafetyEvent::Risk(update) = event {
                core.on_risk_update(update);
            }
        });
        let core = Rc::clone(&self.core);
        let weather = bus.subscribe(EventKind::Weather, move |event| {
            if let SafetyEvent::Weather(snapshot) = event {
                core.on_weather(snapshot);
            }
        });
        let core = Rc::clone(&self.core);
        let driver = bus.subscribe(EventKind::DriverState, move |event| {
            if let SafetyEvent::DriverState(state) = event {
                core.on_driver_state(state);
            }
        });
        self.subscriptions = vec![risk, weather, driver];

        log::info!("Safety orchestrator active");
    }

    /// Unsubscribe, clear the cooldown ledger and reset adaptations. Idempotent.
    pub fn shutdown(&mut self) {
        for sub in self.subscriptions.drain(..) {
            sub.unsubscribe();
        }

        let mut st = self.core.state.borrow_mut();
        if st.phase == OrchestratorState::Idle {
            return;
        }
        st.reset();
        st.phase = OrchestratorState::Idle;
        log::info!(
            "Safety orchestrator stopped ({} dispatched, {} suppressed)",
            st.stats.dispatched,
            st.stats.suppressed
        );
    }

    /// Handle a risk update directly; returns the alert if one was dispatched.
    pub fn handle_risk_update(&self, update: &RiskUpdate) -> Option<SafetyAlert> {
        self.core.on_risk_update(update)
    }

    /// Returns false while idle.
    pub fn handle_weather_update(&self, snapshot: &WeatherSnapshot) -> bool {
        self.core.on_weather(snapshot)
    }

    /// Returns false while idle.
    pub fn handle_driver_state(&self, driver: &DriverState) -> bool {
        self.core.on_driver_state(driver)
    }

    /// Read the initial driver state with retries and apply it.
    ///
    /// Call after `init`; the fallback default is applied when every attempt fails.
    pub async fn bootstrap_driver_state<F, Fut>(
        &self,
        read: F,
        config: &BootstrapConfig,
    ) -> DriverStateBootstrap
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = SafetyResult<DriverState>>,
    {
        let outcome = bootstrap_driver_state(read, config).await;
        self.handle_driver_state(&outcome.state);
        outcome
    }

    pub fn state(&self) -> OrchestratorState {
        self.core.state.borrow().phase
    }

    pub fn is_active(&self) -> bool {
        self.state() == OrchestratorState::Active
    }

    pub fn weather_adaptation(&self) -> WeatherAdaptation {
        self.core.state.borrow().weather.clone()
    }

    pub fn driver_adaptation(&self) -> DriverAdaptation {
        self.core.state.borrow().driver.clone()
    }

    /// Overall score of the last risk update seen while active.
    pub fn current_risk_score(&self) -> Option<u8> {
        self.core
            .state
            .borrow()
            .last_update
            .as_ref()
            .map(|u| u.scores.overall)
    }

    pub fn current_top_factors(&self) -> Vec<RiskFactor> {
        let st = self.core.state.borrow();
        st.last_update
            .as_ref()
            .map(|u| {
                u.factors
                    .iter()
                    .take(st.config.top_factor_count)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn stats(&self) -> OrchestratorStats {
        self.core.state.borrow().stats
    }

    pub fn cooldown_entry(&self, level: AlertLevel) -> Option<f64> {
        self.core.state.borrow().ledger.last_fired(level)
    }
}

impl Drop for SafetyOrchestrator {
    fn drop(&mut self) {
        for sub in self.subscriptions.drain(..) {
            sub.unsubscribe();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::SafetyError;
    use crate::risk::{RiskFactorType, RiskScores, SeverityTier};
    use crate::sinks::{AlertAnalytics, HapticActuator, HudFlash, SinkCommand, VoiceAnnouncer};
    use crate::types::WeatherCondition;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn update(overall: u8) -> RiskUpdate {
        RiskUpdate {
            scores: RiskScores {
                overall,
                ..RiskScores::default()
            },
            factors: Vec::new(),
            timestamp: 0.0,
        }
    }

    fn factor(factor_type: RiskFactorType, score: u8) -> RiskFactor {
        RiskFactor {
            factor_type,
            score,
            reason: String::new(),
            distance_meters: 0.0,
            severity: SeverityTier::from_score(score),
        }
    }

    fn active(config: AlertConfig) -> (SafetyOrchestrator, EventBus, ManualClock, UnboundedReceiver<SinkCommand>) {
        let (sinks, rx) = AlertSinks::channel();
        let clock = ManualClock::new(0.0);
        let mut orchestrator = SafetyOrchestrator::new(config, sinks, Rc::new(clock.clone()));
        let bus = EventBus::new();
        orchestrator.init(&bus);
        (orchestrator, bus, clock, rx)
    }

    fn drain(rx: &mut UnboundedReceiver<SinkCommand>) -> Vec<SinkCommand> {
        let mut out = Vec::new();
        while let Ok(cmd) = rx.try_recv() {
            out.push(cmd);
        }
        out
    }

    #[test]
    fn test_caution_cooldown_over_bus() {
        let (orchestrator, bus, clock, _rx) = active(AlertConfig::default());

        bus.publish(&SafetyEvent::Risk(update(80)));
        clock.set(3.0);
        bus.publish(&SafetyEvent::Risk(update(80)));
        clock.set(9.0);
        bus.publish(&SafetyEvent::Risk(update(80)));

        let stats = orchestrator.stats();
        assert_eq!(stats.dispatched, 2);
        assert_eq!(stats.suppressed, 1);
        assert_eq!(orchestrator.cooldown_entry(AlertLevel::Caution), Some(9.0));
    }

    #[test]
    fn test_critical_clears_caution_cooldown() {
        let (orchestrator, _bus, clock, _rx) = active(AlertConfig::default());

        let first = orchestrator.handle_risk_update(&update(80));
        assert_eq!(first.map(|a| a.level), Some(AlertLevel::Caution));

        clock.set(1.0);
        let critical = orchestrator.handle_risk_update(&update(95));
        assert_eq!(critical.map(|a| a.level), Some(AlertLevel::Critical));
        assert_eq!(orchestrator.cooldown_entry(AlertLevel::Caution), None);

        clock.set(2.0);
        let again = orchestrator.handle_risk_update(&update(80));
        assert_eq!(again.map(|a| a.level), Some(AlertLevel::Caution));
    }

    #[test]
    fn test_critical_breaks_through_own_cooldown() {
        let (orchestrator, _bus, clock, _rx) = active(AlertConfig::default());
        assert!(orchestrator.handle_risk_update(&update(95)).is_some());
        clock.set(0.5);
        assert!(orchestrator.handle_risk_update(&update(92)).is_some());
        assert_eq!(orchestrator.stats().dispatched, 2);
    }

    #[test]
    fn test_below_warning_threshold_is_silent() {
        let (orchestrator, _bus, _clock, mut rx) = active(AlertConfig::default());
        assert!(orchestrator.handle_risk_update(&update(59)).is_none());
        assert!(drain(&mut rx).is_empty());
        assert_eq!(orchestrator.current_risk_score(), Some(59));
    }

    #[test]
    fn test_critical_dispatches_every_channel() {
        let (orchestrator, _bus, _clock, mut rx) = active(AlertConfig::default());
        let mut u = update(93);
        u.factors = vec![factor(RiskFactorType::Collision, 90)];
        orchestrator.handle_risk_update(&u);

        let commands = drain(&mut rx);
        assert_eq!(commands.len(), 4);
        match &commands[0] {
            SinkCommand::Announce { message, options } => {
                assert_eq!(message, "Hazard immediately ahead! Be ready to stop.");
                assert_eq!(options.entity_id, "safety-critical");
                assert_eq!(options.throttle_ms, 5000);
                assert_eq!(options.priority, AnnouncementPriority::Critical);
                assert!(options.is_critical);
            }
            other => panic!("expected announce, got {other:?}"),
        }
        assert_eq!(
            commands[1],
            SinkCommand::Vibrate {
                pattern: HapticPattern::Urgent,
                intensity: 1.0
            }
        );
        assert!(matches!(&commands[2], SinkCommand::Flash(r) if r.color == "#FF3B30"));
        assert!(matches!(&commands[3], SinkCommand::Record(a) if a.risk_score == 93));
    }

    #[test]
    fn test_warning_has_no_haptic_or_flash() {
        let (orchestrator, _bus, _clock, mut rx) = active(AlertConfig::default());
        orchestrator.handle_risk_update(&update(65));
        let commands = drain(&mut rx);
        assert_eq!(commands.len(), 2);
        assert!(matches!(&commands[0], SinkCommand::Announce { options, .. } if options.throttle_ms == 10_000));
        assert!(matches!(&commands[1], SinkCommand::Record(_)));
    }

    #[test]
    fn test_haptics_disabled_by_preference() {
        let config = AlertConfig {
            haptics_enabled: false,
            ..AlertConfig::default()
        };
        let (orchestrator, _bus, _clock, mut rx) = active(config);
        orchestrator.handle_risk_update(&update(95));
        let commands = drain(&mut rx);
        assert!(!commands
            .iter()
            .any(|c| matches!(c, SinkCommand::Vibrate { .. })));
        assert!(commands.iter().any(|c| matches!(c, SinkCommand::Flash(_))));
    }

    #[test]
    fn test_storm_pushes_score_into_caution() {
        let (orchestrator, bus, _clock, mut rx) = active(AlertConfig::default());
        let mut storm = WeatherSnapshot::new(WeatherCondition::Rain);
        storm.precipitation_mm_h = 25.0;
        bus.publish(&SafetyEvent::Weather(storm));
        assert_eq!(orchestrator.weather_adaptation().condition_label, "storm");

        // 70 × 1.25 = 87.5
        let alert = orchestrator.handle_risk_update(&update(70));
        let alert = alert.expect("caution alert");
        assert_eq!(alert.level, AlertLevel::Caution);
        assert_eq!(alert.risk_score, 88);

        let commands = drain(&mut rx);
        assert!(commands.iter().any(|c| matches!(
            c,
            SinkCommand::Vibrate { pattern: HapticPattern::Medium, intensity }
                if (*intensity - 0.75).abs() < 1e-9
        )));
    }

    #[test]
    fn test_driver_state_shapes_voice() {
        let (orchestrator, bus, _clock, mut rx) = active(AlertConfig::default());
        bus.publish(&SafetyEvent::DriverState(DriverState {
            stress_percent: 85.0,
            focus_percent: 80.0,
        }));
        orchestrator.handle_risk_update(&update(62));
        match drain(&mut rx).first() {
            Some(SinkCommand::Announce { options, .. }) => {
                assert_eq!(options.rate, 0.85);
                assert_eq!(options.pitch, 0.95);
            }
            other => panic!("expected announce, got {other:?}"),
        }
    }

    struct FailingVoice;
    impl VoiceAnnouncer for FailingVoice {
        fn announce(&self, _: &str, _: &AnnounceOptions) -> SafetyResult<()> {
            Err(SafetyError::SinkFailed {
                channel: AlertChannel::Voice,
                reason: "tts engine busy".to_string(),
            })
        }
    }

    #[derive(Clone, Default)]
    struct Tally(Rc<RefCell<Vec<&'static str>>>);
    impl HapticActuator for Tally {
        fn vibrate(&self, _: HapticPattern, _: f64) -> SafetyResult<()> {
            self.0.borrow_mut().push("haptic");
            Ok(())
        }
    }
    impl HudFlash for Tally {
        fn trigger(&self, _: &HudFlashRequest) -> SafetyResult<()> {
            self.0.borrow_mut().push("hud");
            Ok(())
        }
    }
    impl AlertAnalytics for Tally {
        fn record(&self, _: &SafetyAlert) -> SafetyResult<()> {
            self.0.borrow_mut().push("analytics");
            Ok(())
        }
    }

    #[test]
    fn test_failing_channel_does_not_block_others() {
        let tally = Tally::default();
        let sinks = AlertSinks {
            voice: Box::new(FailingVoice),
            haptic: Box::new(tally.clone()),
            hud: Box::new(tally.clone()),
            analytics: Some(Box::new(tally.clone())),
        };
        let mut orchestrator =
            SafetyOrchestrator::new(AlertConfig::default(), sinks, Rc::new(ManualClock::new(0.0)));
        orchestrator.init(&EventBus::new());

        let alert = orchestrator.handle_risk_update(&update(96));
        assert!(alert.is_some());
        assert_eq!(*tally.0.borrow(), vec!["haptic", "hud", "analytics"]);
        assert_eq!(orchestrator.stats().channel_failures, 1);
        assert_eq!(orchestrator.cooldown_entry(AlertLevel::Critical), Some(0.0));
    }

    #[test]
    fn test_idle_ignores_updates() {
        let (sinks, mut rx) = AlertSinks::channel();
        let orchestrator =
            SafetyOrchestrator::new(AlertConfig::default(), sinks, Rc::new(ManualClock::new(0.0)));
        assert!(!orchestrator.is_active());
        assert!(orchestrator.handle_risk_update(&update(99)).is_none());
        assert!(!orchestrator.handle_weather_update(&WeatherSnapshot::new(WeatherCondition::Ice)));
        assert!(drain(&mut rx).is_empty());
        assert_eq!(orchestrator.current_risk_score(), None);
    }

    #[test]
    fn test_shutdown_is_idempotent_and_reinit_is_fresh() {
        let (mut orchestrator, bus, _clock, _rx) = active(AlertConfig::default());
        bus.publish(&SafetyEvent::Weather(WeatherSnapshot::new(WeatherCondition::Fog)));
        bus.publish(&SafetyEvent::Risk(update(80)));
        assert_eq!(bus.subscriber_count(EventKind::Risk), 1);

        orchestrator.shutdown();
        orchestrator.shutdown();
        assert!(!orchestrator.is_active());
        assert_eq!(bus.subscriber_count(EventKind::Risk), 0);
        assert_eq!(bus.subscriber_count(EventKind::Weather), 0);
        assert_eq!(orchestrator.cooldown_entry(AlertLevel::Caution), None);
        assert_eq!(orchestrator.weather_adaptation(), WeatherAdaptation::default());

        // published while idle: nobody listens
        assert_eq!(bus.publish(&SafetyEvent::Risk(update(80))), 0);

        orchestrator.init(&bus);
        assert!(orchestrator.is_active());
        assert_eq!(orchestrator.stats(), OrchestratorStats::default());
        assert_eq!(orchestrator.current_risk_score(), None);
        // same clock time as the pre-shutdown caution, but the ledger was cleared
        assert!(orchestrator.handle_risk_update(&update(80)).is_some());
    }

    #[test]
    fn test_double_init_subscribes_once() {
        let (mut orchestrator, bus, _clock, _rx) = active(AlertConfig::default());
        orchestrator.init(&bus);
        assert_eq!(bus.subscriber_count(EventKind::Risk), 1);
        assert_eq!(bus.subscriber_count(EventKind::DriverState), 1);
    }

    #[test]
    fn test_top_factors_capped() {
        let (orchestrator, _bus, _clock, _rx) = active(AlertConfig::default());
        let mut u = update(40);
        u.factors = vec![
            factor(RiskFactorType::Overspeed, 85),
            factor(RiskFactorType::Collision, 70),
            factor(RiskFactorType::LateBraking, 50),
            factor(RiskFactorType::LaneDeviation, 25),
        ];
        orchestrator.handle_risk_update(&u);
        let top = orchestrator.current_top_factors();
        assert_eq!(top.len(), 3);
        assert_eq!(top[0].factor_type, RiskFactorType::Overspeed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bootstrap_applies_driver_state() {
        let (orchestrator, _bus, _clock, _rx) = active(AlertConfig::default());
        let outcome = orchestrator
            .bootstrap_driver_state(
                || async {
                    Ok::<_, SafetyError>(DriverState {
                        stress_percent: 50.0,
                        focus_percent: 40.0,
                    })
                },
                &BootstrapConfig::default(),
            )
            .await;
        assert!(!outcome.used_fallback);
        let adaptation = orchestrator.driver_adaptation();
        assert_eq!(adaptation.extra_reminder_distance_meters, 175.0);
    }
}
