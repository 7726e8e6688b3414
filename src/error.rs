use thiserror::Error;

/// Alert output channels, used to tag dispatch failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlertChannel {
    Voice,
    Haptic,
    HudFlash,
    Analytics,
}

impl std::fmt::Display for AlertChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AlertChannel::Voice => "voice",
            AlertChannel::Haptic => "haptic",
            AlertChannel::HudFlash => "hud-flash",
            AlertChannel::Analytics => "analytics",
        };
        f.write_str(name)
    }
}

/// Safety core error types
///
/// None of these escape the risk/alert hot path; they are reported by sinks
/// and the bootstrap so callers can log them.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SafetyError {
    #[error("{channel} sink failed: {reason}")]
    SinkFailed {
        channel: AlertChannel,
        reason: String,
    },

    #[error("{channel} sink closed")]
    SinkClosed { channel: AlertChannel },

    #[error("Driver state unavailable: {0}")]
    DriverStateUnavailable(String),

    #[error("Driver state read timed out after {0} ms")]
    DriverStateTimeout(u64),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type SafetyResult<T> = Result<T, SafetyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = SafetyError::SinkFailed {
            channel: AlertChannel::HudFlash,
            reason: "display off".to_string(),
        };
        assert_eq!(err.to_string(), "hud-flash sink failed: display off");

        let err = SafetyError::SinkClosed {
            channel: AlertChannel::Voice,
        };
        assert_eq!(err.to_string(), "voice sink closed");
    }
}
