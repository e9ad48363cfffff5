//! Bounded status polling for long-running server operations.

use std::thread;
use std::time::Duration;

/// Statuses that end polling with a failure.
pub const TERMINAL_ERROR_STATUSES: [&str; 2] = ["FAILED", "ERROR"];

/// Limits for [`poll_status`].
#[derive(Debug, Clone, Copy)]
pub struct PollConfig {
    /// Checks made before giving up.
    pub max_attempts: u32,
    /// Delay added per attempt.
    pub step: Duration,
    /// Upper bound on a single delay.
    pub max_delay: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            step: Duration::from_millis(500),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl PollConfig {
    /// Delay after the given (1-based) attempt.
    pub fn delay(&self, attempt: u32) -> Duration {
        self.step.saturating_mul(attempt).min(self.max_delay)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PollError {
    #[error(transparent)]
    Check(#[from] iobeam_client::Error),

    #[error("Operation failed with status {0}")]
    Failed(String),

    #[error("Gave up after {attempts} checks; last status was {last}")]
    Exhausted { attempts: u32, last: String },
}

/// Call `check` until it reports `wanted`.
///
/// Sleeps `min(step * attempt, max_delay)` between checks and stops early if
/// a check fails or reports a terminal error status.
pub fn poll_status<F>(mut check: F, wanted: &str, config: PollConfig) -> Result<String, PollError>
where
    F: FnMut() -> iobeam_client::Result<String>,
{
    let mut last = String::new();
    for attempt in 1..=config.max_attempts {
        let status = check()?;
        tracing::debug!(attempt, %status, wanted, "polled status");

        if status == wanted {
            return Ok(status);
        }
        if TERMINAL_ERROR_STATUSES.contains(&status.as_str()) {
            return Err(PollError::Failed(status));
        }
        last = status;

        if attempt < config.max_attempts {
            thread::sleep(config.delay(attempt));
        }
    }

    Err(PollError::Exhausted {
        attempts: config.max_attempts,
        last,
    })
}
