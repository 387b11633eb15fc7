//! Retry bookkeeping for the periodic health check.
//!
//! The tick itself lives on the controller (it needs the renderer and the
//! launcher); this module only decides what a tick should do.

use std::time::Duration;

use serde::Serialize;

/// Default tick period.
pub const SUPERVISOR_PERIOD_MS: u64 = 5_000;
/// Restarts allowed before the effect is switched off.
pub const MAX_RESTART_ATTEMPTS: u32 = 5;

/// Supervisor timing and retry ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SupervisorCfg {
    /// Delay between ticks. The first tick runs one period after enable.
    pub period: Duration,
    /// Consecutive failed checks tolerated before giving up.
    pub max_attempts: u32,
}

impl Default for SupervisorCfg {
    fn default() -> Self {
        Self {
            period: Duration::from_millis(SUPERVISOR_PERIOD_MS),
            max_attempts: MAX_RESTART_ATTEMPTS,
        }
    }
}

/// What a tick did. Returned for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The controller is not enabled.
    Idle,
    /// The host window handle is not available; nothing counted.
    WindowUnavailable,
    /// The renderer is running.
    Healthy,
    /// The renderer was dead and a new one was launched.
    Restarted {
        /// Consecutive failed checks so far, this one included.
        attempt: u32,
    },
    /// The renderer was dead and relaunching failed.
    RestartFailed {
        /// Consecutive failed checks so far, this one included.
        attempt: u32,
    },
    /// The controller was disabled or got another renderer while the
    /// relaunch ran; its result was thrown away.
    Superseded {
        /// Attempt the discarded relaunch belonged to.
        attempt: u32,
    },
    /// Too many consecutive failures; the effect was switched off.
    GaveUp,
}

/// Decision after a failed liveness check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Launch a replacement renderer.
    Restart {
        /// Consecutive failures, starting at 1.
        attempt: u32,
    },
    /// Stop retrying and switch the effect off.
    GiveUp,
}

/// Per-controller supervisor state.
#[derive(Debug)]
pub struct HealthSupervisor {
    /// Timing and retry ceiling.
    cfg: SupervisorCfg,
    /// Consecutive failed liveness checks.
    attempts: u32,
    /// Open-window count seen on the previous tick.
    last_window_count: Option<usize>,
}

impl HealthSupervisor {
    /// Fresh state with no failures recorded.
    pub fn new(cfg: SupervisorCfg) -> Self {
        Self {
            cfg,
            attempts: 0,
            last_window_count: None,
        }
    }

    /// Timing this supervisor runs with.
    pub fn cfg(&self) -> SupervisorCfg {
        self.cfg
    }

    /// Consecutive failed checks.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Forget history; called whenever supervision (re)starts.
    pub fn reset(&mut self) {
        self.attempts = 0;
        self.last_window_count = None;
    }

    /// Record `now` and report whether it differs from the previous tick.
    pub fn window_count_changed(&mut self, now: usize) -> bool {
        let changed = self.last_window_count != Some(now);
        self.last_window_count = Some(now);
        changed
    }

    /// The renderer answered; clear the failure streak.
    pub fn record_live(&mut self) {
        self.attempts = 0;
    }

    /// Count a failed check and decide whether to retry.
    pub fn record_failure(&mut self) -> Verdict {
        self.attempts += 1;
        if self.attempts > self.cfg.max_attempts {
            Verdict::GiveUp
        } else {
            Verdict::Restart {
                attempt: self.attempts,
            }
        }
    }
}
