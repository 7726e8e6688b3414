//! Real-time driving risk assessment and alert orchestration.
//!
//! `RiskEngine` scores a `PredictionContext` (telemetry, route, hazards,
//! weather, driver stress). `RiskScheduler` runs it on a timer and on
//! significant telemetry changes and publishes each `RiskUpdate` on an
//! `EventBus`. `SafetyOrchestrator` listens on the same bus, adapts to
//! weather and driver state, throttles alerts per level and fans them out to
//! the voice, haptic, HUD and analytics sinks.

pub mod adaptation;
pub mod bootstrap;
pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod geometry;
pub mod orchestrator;
pub mod physics;
pub mod risk;
pub mod scheduler;
pub mod sinks;
pub mod types;

pub use adaptation::{
    driver_adaptation, weather_adaptation, DriverAdaptation, StressLevel, WeatherAdaptation,
};
pub use bootstrap::{bootstrap_driver_state, DriverStateBootstrap};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AlertConfig, BootstrapConfig, RiskConfig, SafetyConfig, SchedulerConfig};
pub use error::{AlertChannel, SafetyError, SafetyResult};
pub use events::{EventBus, EventKind, SafetyEvent, Subscription};
pub use orchestrator::{
    AlertLevel, CooldownLedger, HapticPattern, OrchestratorState, OrchestratorStats,
    SafetyAlert, SafetyOrchestrator,
};
pub use risk::{
    DangerCategory, DangerZone, RiskEngine, RiskFactor, RiskFactorType, RiskPrediction,
    RiskScores, RiskUpdate, SeverityTier,
};
pub use scheduler::{ContextSource, RiskScheduler, TelemetrySample};
pub use sinks::{
    AlertAnalytics, AlertSinks, AnnounceOptions, AnnouncementPriority, ChannelSink,
    HapticActuator, HudFlash, HudFlashRequest, LogSink, SinkCommand, VoiceAnnouncer,
};
pub use types::{
    DriverState, Hazard, LatLng, PredictionContext, SpeedCamera, WeatherCondition,
    WeatherSnapshot,
};
