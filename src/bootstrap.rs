//! Initial driver-state read with bounded retries.
//!
//! The driver-state source may not be ready when the orchestrator starts.
//! Each read is bounded by a timeout; failures back off exponentially
//! (`base · 2^attempt`) and after the last attempt the default state is used.

use crate::config::BootstrapConfig;
use crate::error::{SafetyError, SafetyResult};
use crate::types::DriverState;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, timeout};

/// Outcome of [`bootstrap_driver_state`].
#[derive(Clone, Debug, PartialEq)]
pub struct DriverStateBootstrap {
    pub state: DriverState,
    pub attempts: u32,
    pub used_fallback: bool,
    pub last_error: Option<SafetyError>,
}

/// Delay before retry number `attempt + 1`.
pub fn backoff_delay(attempt: u32, config: &BootstrapConfig) -> Duration {
    let factor = 2u64.saturating_pow(attempt);
    Duration::from_millis(config.base_backoff_ms.saturating_mul(factor))
}

pub async fn bootstrap_driver_state<F, Fut>(
    mut read: F,
    config: &BootstrapConfig,
) -> DriverStateBootstrap
where
    F: FnMut() -> Fut,
    Fut: Future<Output = SafetyResult<DriverState>>,
{
    let max_attempts = config.max_attempts.max(1);
    let per_attempt = Duration::from_millis(config.attempt_timeout_ms);
    let mut last_error = None;

    for attempt in 0..max_attempts {
        let result = match timeout(per_attempt, read()).await {
            Ok(result) => result,
            Err(_) => Err(SafetyError::DriverStateTimeout(config.attempt_timeout_ms)),
        };

        match result {
            Ok(state) => {
                if attempt > 0 {
                    log::info!("Driver state available after {} attempt(s)", attempt + 1);
                }
                return DriverStateBootstrap {
                    state,
                    attempts: attempt + 1,
                    used_fallback: false,
                    last_error,
                };
            }
            Err(e) => {
                log::debug!("Driver state attempt {} failed: {}", attempt + 1, e);
                last_error = Some(e);
                if attempt + 1 < max_attempts {
                    sleep(backoff_delay(attempt, config)).await;
                }
            }
        }
    }

    let fallback = DriverState::default();
    log::warn!(
        "Driver state unavailable after {} attempts, using default (stress={}, focus={})",
        max_attempts,
        fallback.stress_percent,
        fallback.focus_percent
    );
    DriverStateBootstrap {
        state: fallback,
        attempts: max_attempts,
        used_fallback: true,
        last_error,
    }
}
