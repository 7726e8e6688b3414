pub mod alert;
pub mod controller;
pub mod cooldown;

pub use alert::{alert_message, AlertLevel, HapticPattern, SafetyAlert};
pub use controller::{OrchestratorState, OrchestratorStats, SafetyOrchestrator};
pub use cooldown::CooldownLedger;
