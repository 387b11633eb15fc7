//! Periodic supervisor scheduling, one schedule per host window.
//!
//! A schedule sleeps one period, then calls its tick on tokio's blocking pool
//! and awaits it before the next period starts. Ticks for one window never
//! overlap, and a relaunch blocking on the handshake never stalls the runtime.

use std::{collections::HashMap, sync::Arc, time::Duration};

use parking_lot::Mutex;
use tokio::{
    runtime::Handle,
    task::{JoinHandle, spawn_blocking},
    time::{self, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::{trace, warn};

use crate::host::HostWindowId;

/// How long [`Ticker::shutdown`] waits for each schedule to wind down.
pub const SHUTDOWN_GRACE_MS: u64 = 50;

/// One scheduled window.
struct Schedule {
    /// Stops the loop.
    cancel: CancellationToken,
    /// The loop task.
    task: JoinHandle<()>,
}

/// Cancellable fixed-delay schedules keyed by host window.
#[derive(Clone)]
pub struct Ticker {
    /// Active schedules by window.
    schedules: Arc<Mutex<HashMap<HostWindowId, Schedule>>>,
    /// Runtime the schedule loops are spawned on.
    runtime: Handle,
}

impl Ticker {
    /// A ticker spawning its loops on `runtime`.
    pub fn new(runtime: Handle) -> Self {
        Self {
            schedules: Arc::new(Mutex::new(HashMap::new())),
            runtime,
        }
    }

    /// Whether `window` has a live schedule.
    pub fn is_scheduled(&self, window: HostWindowId) -> bool {
        self.schedules.lock().contains_key(&window)
    }

    /// Call `tick` every `period` for `window`, replacing any earlier schedule.
    /// The first call happens one period from now.
    pub fn schedule<F>(&self, window: HostWindowId, period: Duration, tick: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.cancel(window);

        let cancel = CancellationToken::new();
        let stopped = cancel.clone();
        let tick = Arc::new(tick);

        let task = self.runtime.spawn(async move {
            trace!(%window, period_ms = period.as_millis(), "schedule_start");
            tokio::select! {
                _ = time::sleep(period) => {}
                _ = stopped.cancelled() => return,
            }

            let mut every = time::interval(period);
            every.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = stopped.cancelled() => break,
                    _ = every.tick() => {
                        let f = tick.clone();
                        if let Err(e) = spawn_blocking(move || f()).await {
                            warn!(%window, error = %e, "supervisor_tick_panicked");
                        }
                    }
                }
            }
            trace!(%window, "schedule_end");
        });

        self.schedules.lock().insert(window, Schedule { cancel, task });
    }

    /// Cancel the schedule for `window` without waiting. A tick already
    /// running finishes first.
    pub fn cancel(&self, window: HostWindowId) {
        if let Some(s) = self.schedules.lock().remove(&window) {
            s.cancel.cancel();
            trace!(%window, "schedule_cancel");
        }
    }

    /// Cancel every schedule and wait briefly for the loops to exit.
    pub async fn shutdown(&self) {
        let drained: Vec<Schedule> = self.schedules.lock().drain().map(|(_, s)| s).collect();
        for s in &drained {
            s.cancel.cancel();
        }
        for s in drained {
            let _ = time::timeout(Duration::from_millis(SHUTDOWN_GRACE_MS), s.task).await;
        }
    }
}
