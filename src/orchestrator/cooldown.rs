use super::alert::AlertLevel;
use crate::config::AlertConfig;
use std::collections::HashMap;

/// Last dispatch time per alert level.
///
/// Critical alerts are never held back by their own cooldown. Dispatching a
/// level deletes the entries of the levels it escalates over, so the next
/// lower-level alert fires straight away instead of waiting out a stale
/// cooldown.
#[derive(Clone, Debug, Default)]
pub struct CooldownLedger {
    last_fired: HashMap<AlertLevel, f64>,
}

impl CooldownLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_fired(&self, level: AlertLevel) -> Option<f64> {
        self.last_fired.get(&level).copied()
    }

    /// Whether an alert at `level` may be dispatched at `now`.
    pub fn allows(&self, level: AlertLevel, now: f64, config: &AlertConfig) -> bool {
        if level == AlertLevel::Critical {
            return true;
        }
        match self.last_fired(level) {
            Some(last) => (now - last) >= level.cooldown_s(config),
            None => true,
        }
    }

    /// Record a dispatch and apply escalation.
    pub fn record(&mut self, level: AlertLevel, now: f64) {
        for lower in level.escalates_over() {
            self.last_fired.remove(lower);
        }
        self.last_fired.insert(level, now);
    }

    pub fn clear(&mut self) {
        self.last_fired.clear();
    }

    pub fn len(&self) -> usize {
        self.last_fired.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_fired.is_empty()
    }
}
