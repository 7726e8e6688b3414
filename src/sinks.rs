//! Alert output channels.
//!
//! The controller calls these fire-and-forget: implementations must return
//! immediately and do their real work elsewhere (another task, the UI
//! thread). A returned error is logged and counted, and never stops the
//! other channels.

use crate::error::{AlertChannel, SafetyError, SafetyResult};
use crate::orchestrator::{HapticPattern, SafetyAlert};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnouncementPriority {
    Normal,
    High,
    Critical,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnnounceOptions {
    pub priority: AnnouncementPriority,
    pub is_critical: bool,
    pub throttle_ms: u64,
    pub entity_id: String,
    pub rate: f64,
    pub pitch: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HudFlashRequest {
    pub color: String,
    pub duration_ms: u64,
}

pub trait VoiceAnnouncer {
    fn announce(&self, message: &str, options: &AnnounceOptions) -> SafetyResult<()>;
}

pub trait HapticActuator {
    fn vibrate(&self, pattern: HapticPattern, intensity: f64) -> SafetyResult<()>;
}

pub trait HudFlash {
    fn trigger(&self, request: &HudFlashRequest) -> SafetyResult<()>;
}

pub trait AlertAnalytics {
    fn record(&self, alert: &SafetyAlert) -> SafetyResult<()>;
}

/// The set of collaborators an orchestrator dispatches to.
pub struct AlertSinks {
    pub voice: Box<dyn VoiceAnnouncer>,
    pub haptic: Box<dyn HapticActuator>,
    pub hud: Box<dyn HudFlash>,
    pub analytics: Option<Box<dyn AlertAnalytics>>,
}

impl AlertSinks {
    /// Sinks that only write to the log.
    pub fn logging() -> Self {
        Self {
            voice: Box::new(LogSink),
            haptic: Box::new(LogSink),
            hud: Box::new(LogSink),
            analytics: Some(Box::new(LogSink)),
        }
    }

    /// Sinks that forward every command to a channel; the receiver side is
    /// drained by whatever owns the real speaker/motor/display.
    pub fn channel() -> (Self, UnboundedReceiver<SinkCommand>) {
        let (tx, rx) = unbounded_channel();
        let sink = ChannelSink { tx };
        let sinks = Self {
            voice: Box::new(sink.clone()),
            haptic: Box::new(sink.clone()),
            hud: Box::new(sink.clone()),
            analytics: Some(Box::new(sink)),
        };
        (sinks, rx)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct LogSink;

impl VoiceAnnouncer for LogSink {
    fn announce(&self, message: &str, options: &AnnounceOptions) -> SafetyResult<()> {
        log::info!(
            "[voice] {} (priority={:?}, throttle={}ms, id={})",
            message,
            options.priority,
            options.throttle_ms,
            options.entity_id
        );
        Ok(())
    }
}

impl HapticActuator for LogSink {
    fn vibrate(&self, pattern: HapticPattern, intensity: f64) -> SafetyResult<()> {
        log::info!("[haptic] {:?} at {:.2}", pattern, intensity);
        Ok(())
    }
}

impl HudFlash for LogSink {
    fn trigger(&self, request: &HudFlashRequest) -> SafetyResult<()> {
        log::info!("[hud] flash {} for {}ms", request.color, request.duration_ms);
        Ok(())
    }
}

impl AlertAnalytics for LogSink {
    fn record(&self, alert: &SafetyAlert) -> SafetyResult<()> {
        log::info!(
            "[analytics] {} alert, score {}",
            alert.level.label(),
            alert.risk_score
        );
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum SinkCommand {
    Announce {
        message: String,
        options: AnnounceOptions,
    },
    Vibrate {
        pattern: HapticPattern,
        intensity: f64,
    },
    Flash(HudFlashRequest),
    Record(SafetyAlert),
}

#[derive(Clone, Debug)]
pub struct ChannelSink {
    tx: UnboundedSender<SinkCommand>,
}

impl ChannelSink {
    fn send(&self, channel: AlertChannel, command: SinkCommand) -> SafetyResult<()> {
        self.tx
            .send(command)
            .map_err(|_| SafetyError::SinkClosed { channel })
    }
}

impl VoiceAnnouncer for ChannelSink {
    fn announce(&self, message: &str, options: &AnnounceOptions) -> SafetyResult<()> {
        self.send(
            AlertChannel::Voice,
            SinkCommand::Announce {
                message: message.to_string(),
                options: options.clone(),
            },
        )
    }
}

impl HapticActuator for ChannelSink {
    fn vibrate(&self, pattern: HapticPattern, intensity: f64) -> SafetyResult<()> {
        self.send(AlertChannel::Haptic, SinkCommand::Vibrate { pattern, intensity })
    }
}

impl HudFlash for ChannelSink {
    fn trigger(&self, request: &HudFlashRequest) -> SafetyResult<()> {
        self.send(AlertChannel::HudFlash, SinkCommand::Flash(request.clone()))
    }
}

impl AlertAnalytics for ChannelSink {
    fn record(&self, alert: &SafetyAlert) -> SafetyResult<()> {
        self.send(AlertChannel::Analytics, SinkCommand::Record(alert.clone()))
    }
}
