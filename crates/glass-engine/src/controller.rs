//! Per-window effect controller.
//!
//! A controller owns at most one renderer for its host window. Its public
//! operations are meant for the UI thread; the health supervisor runs on the
//! ticker's blocking pool and reaches the same state through the shared lock.
//! A relaunch runs with the lock released, and a contrast release owed after
//! the supervisor gives up is left to the UI thread.

use std::sync::{Arc, Weak};

use glass_protocol::{BlurType, EffectParameters, WindowHandle};
use glass_worker::{Error as WorkerError, Launcher, Renderer, Result as WorkerResult};
use parking_lot::Mutex;
use tracing::{debug, info, trace, warn};

use crate::{
    Error, Result,
    contrast::ContrastCoordinator,
    deps::WindowResolver,
    host::{HostWindowGuard, HostWindowId},
    notification::NotificationDispatcher,
    prefs::{PreferenceStore, Preferences},
    supervisor::{HealthSupervisor, SupervisorCfg, TickOutcome, Verdict},
    ticker::Ticker,
};

/// Collaborators injected into every controller.
#[derive(Clone)]
pub struct ControllerDeps {
    /// Starts renderers.
    pub launcher: Arc<dyn Launcher>,
    /// Finds the host window's native handle.
    pub resolver: Arc<dyn WindowResolver>,
    /// Shared high-contrast mode.
    pub contrast: ContrastCoordinator,
    /// Channel to the UI thread.
    pub notifier: NotificationDispatcher,
    /// Persisted defaults.
    pub prefs: Arc<dyn PreferenceStore>,
    /// Runs the health supervisor.
    pub ticker: Ticker,
    /// Supervisor timing.
    pub supervisor: SupervisorCfg,
}

/// Controller lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    /// No renderer, no supervision.
    Disabled,
    /// Launching the renderer.
    Enabling,
    /// Supervised; the renderer may be briefly down between ticks.
    Enabled,
    /// Tearing down.
    Disabling,
    /// A fatal error; every mutating call fails with [`Error::InitError`]
    /// until the controller is recreated.
    Faulted(String),
}

/// What a tick still has to do once the controller lock is released.
enum TickPlan {
    /// The tick is complete.
    Done(TickOutcome),
    /// Launch a replacement renderer, then hand it to
    /// [`ControllerCore::finish_restart`].
    Relaunch {
        /// Launcher cloned out of the deps.
        launcher: Arc<dyn Launcher>,
        /// Window the replacement is launched for.
        target: WindowHandle,
        /// Parameters at planning time.
        params: EffectParameters,
        /// Attempt number reported by the supervisor.
        attempt: u32,
    },
}

/// State behind the controller lock.
struct ControllerCore {
    /// Host window this core belongs to.
    id: HostWindowId,
    /// Handle given to the supervisor tick.
    this: Weak<Mutex<Self>>,
    /// Lifecycle phase.
    phase: Phase,
    /// Parameters for the next launch; kept in sync with the renderer.
    params: EffectParameters,
    /// Whether the window asks for the shared high-contrast mode.
    want_contrast: bool,
    /// Whether this controller has an outstanding contrast request.
    holding_contrast: bool,
    /// Resolved host window handle, cached after the first lookup.
    target: Option<WindowHandle>,
    /// The running renderer, if any.
    renderer: Option<Box<dyn Renderer>>,
    /// Retry bookkeeping for the supervisor tick.
    health: HealthSupervisor,
    /// Injected collaborators.
    deps: ControllerDeps,
}

/// One supervisor pass. The launcher runs without the controller lock held.
fn run_tick(core: &Mutex<ControllerCore>) -> TickOutcome {
    let plan = core.lock().plan_tick();
    match plan {
        TickPlan::Done(outcome) => outcome,
        TickPlan::Relaunch {
            launcher,
            target,
            params,
            attempt,
        } => {
            let launched = launcher.launch(target, &params);
            core.lock().finish_restart(target, &params, attempt, launched)
        }
    }
}

/// Bring a renderer launched with `from` up to date with `to`.
fn push_changed(
    renderer: &mut dyn Renderer,
    from: &EffectParameters,
    to: &EffectParameters,
) -> WorkerResult<()> {
    if from.opacity != to.opacity {
        renderer.set_opacity(to.opacity)?;
    }
    if from.brightness != to.brightness {
        renderer.set_brightness(to.brightness)?;
    }
    if from.text_brightness != to.text_brightness {
        renderer.set_text_brightness(to.text_brightness)?;
    }
    if from.blur != to.blur {
        renderer.set_blur_type(to.blur)?;
    }
    Ok(())
}

impl ControllerCore {
    /// Fail with [`Error::InitError`] once faulted.
    fn check_fault(&self) -> Result<()> {
        match &self.phase {
            Phase::Faulted(msg) => Err(Error::InitError(msg.clone())),
            _ => Ok(()),
        }
    }

    /// Whether the effect is on and supervised.
    fn is_enabled(&self) -> bool {
        self.phase == Phase::Enabled
    }

    /// Log undeliverable UI events; the receiver is gone only during shutdown.
    fn delivered(&self, sent: Result<()>) {
        if let Err(e) = sent {
            debug!(window = %self.id, error = %e, "ui_event_dropped");
        }
    }

    /// The host window handle, resolved once and cached.
    fn resolve_target(&mut self) -> Result<WindowHandle> {
        if let Some(t) = self.target {
            return Ok(t);
        }
        let t = self.deps.resolver.resolve().ok_or(Error::WindowResolution)?;
        debug!(window = %self.id, target = %t, "host_window_resolved");
        self.target = Some(t);
        Ok(t)
    }

    /// Launch a renderer for the host window and keep it.
    fn launch(&mut self, params: &EffectParameters) -> Result<()> {
        let target = self.resolve_target()?;
        let renderer = self.deps.launcher.launch(target, params)?;
        self.renderer = Some(renderer);
        Ok(())
    }

    /// Launch and start supervising. A missing platform faults the
    /// controller; other launch failures leave it disabled.
    fn enable(&mut self, params: EffectParameters, want_contrast: bool) -> Result<()> {
        self.check_fault()?;
        if self.is_enabled() {
            return Ok(());
        }
        self.phase = Phase::Enabling;
        if let Err(e) = self.launch(&params) {
            self.phase = match &e {
                Error::Worker(WorkerError::UnsupportedPlatform { .. }) => {
                    warn!(window = %self.id, error = %e, "effect_unsupported");
                    Phase::Faulted(e.to_string())
                }
                _ => Phase::Disabled,
            };
            return Err(e);
        }
        self.params = params;
        self.want_contrast = want_contrast;
        self.activate();
        info!(window = %self.id, ?params, "effect_enabled");
        Ok(())
    }

    /// Enter `Enabled` with supervision running, whether or not a renderer
    /// is up yet.
    fn activate(&mut self) {
        if !self.want_contrast {
            self.release_contrast();
        } else if let Err(e) = self.acquire_contrast() {
            let sent = self
                .deps
                .notifier
                .operation_failed(self.id, format!("Failed to switch to high contrast: {e}"));
            self.delivered(sent);
        }
        self.start_supervisor();
        self.phase = Phase::Enabled;
        let sent = self.deps.notifier.state_changed(self.id, true);
        self.delivered(sent);
    }

    /// Schedule the periodic health check with fresh retry history.
    fn start_supervisor(&mut self) {
        self.health.reset();
        let period = self.health.cfg().period;
        let weak = self.this.clone();
        self.deps.ticker.schedule(self.id, period, move || {
            if let Some(core) = weak.upgrade() {
                let outcome = run_tick(&core);
                trace!(?outcome, "supervisor_tick");
            }
        });
    }

    /// Stop supervision and shut the renderer down. The contrast request,
    /// if any, is left for the caller to release.
    fn stop(&mut self) {
        self.phase = Phase::Disabling;
        self.deps.ticker.cancel(self.id);
        if let Some(mut renderer) = self.renderer.take() {
            renderer.shutdown();
        }
        self.phase = Phase::Disabled;
        info!(window = %self.id, "effect_disabled");
        let sent = self.deps.notifier.state_changed(self.id, false);
        self.delivered(sent);
    }

    /// Stop if running and release contrast, including a release left
    /// pending by the supervisor.
    fn disable(&mut self) {
        if !matches!(self.phase, Phase::Disabled | Phase::Faulted(_)) {
            self.stop();
        }
        self.release_contrast();
    }

    /// Push a parameter to the renderer when enabled.
    fn forward(
        &mut self,
        push: impl FnOnce(&mut dyn Renderer) -> WorkerResult<()>,
    ) -> Result<()> {
        if !self.is_enabled() {
            return Ok(());
        }
        let renderer = self.renderer.as_mut().ok_or(WorkerError::NotRunning)?;
        Ok(push(renderer.as_mut())?)
    }

    /// Take this controller's contrast request. Idempotent.
    fn acquire_contrast(&mut self) -> Result<()> {
        if self.holding_contrast {
            return Ok(());
        }
        self.holding_contrast = true;
        let applied = self.deps.contrast.request()?;
        debug!(window = %self.id, applied, "contrast_requested");
        Ok(())
    }

    /// Give back this controller's contrast request. Idempotent.
    fn release_contrast(&mut self) {
        if self.holding_contrast {
            self.holding_contrast = false;
            self.deps.contrast.release();
            debug!(window = %self.id, "contrast_released");
        }
    }

    /// Record the preference and apply it when enabled.
    fn set_high_contrast(&mut self, want: bool) -> Result<()> {
        self.check_fault()?;
        self.want_contrast = want;
        if !self.is_enabled() {
            return Ok(());
        }
        if want {
            self.acquire_contrast()
        } else {
            self.release_contrast();
            Ok(())
        }
    }

    /// Re-request or reconcile contrast after the window count changed.
    fn reconcile_contrast(&mut self) {
        if !self.is_enabled() || !self.want_contrast {
            return;
        }
        let res = if self.holding_contrast {
            self.deps.contrast.reconcile().map(|_| ())
        } else {
            self.acquire_contrast()
        };
        if let Err(e) = res {
            let sent = self
                .deps
                .notifier
                .operation_failed(self.id, format!("Failed to switch to high contrast: {e}"));
            self.delivered(sent);
        }
    }

    /// The locked half of a health check. Anything that touches the appearance
    /// or launches a process is left to other threads.
    fn plan_tick(&mut self) -> TickPlan {
        if !self.is_enabled() {
            return TickPlan::Done(TickOutcome::Idle);
        }

        let open = self.deps.contrast.open_windows();
        if self.want_contrast && self.health.window_count_changed(open) {
            let sent = self.deps.notifier.reconcile_contrast(self.id);
            self.delivered(sent);
        }

        let Ok(target) = self.resolve_target() else {
            trace!(window = %self.id, "supervisor_window_unavailable");
            return TickPlan::Done(TickOutcome::WindowUnavailable);
        };

        if let Some(renderer) = self.renderer.as_mut()
            && renderer.is_live()
        {
            self.health.record_live();
            return TickPlan::Done(TickOutcome::Healthy);
        }

        match self.health.record_failure() {
            Verdict::GiveUp => {
                warn!(
                    window = %self.id,
                    attempts = self.health.attempts(),
                    "supervisor_giving_up"
                );
                // The UI thread releases contrast on EffectDisabledByFailure.
                self.stop();
                let sent = self.deps.notifier.effect_disabled_by_failure(self.id);
                self.delivered(sent);
                TickPlan::Done(TickOutcome::GaveUp)
            }
            Verdict::Restart { attempt } => {
                if let Some(mut dead) = self.renderer.take() {
                    dead.shutdown();
                }
                TickPlan::Relaunch {
                    launcher: self.deps.launcher.clone(),
                    target,
                    params: self.params,
                    attempt,
                }
            }
        }
    }

    /// Install a relaunched renderer, or discard it when the controller was
    /// disabled or got another renderer while the launch ran.
    fn finish_restart(
        &mut self,
        target: WindowHandle,
        launched_with: &EffectParameters,
        attempt: u32,
        launched: WorkerResult<Box<dyn Renderer>>,
    ) -> TickOutcome {
        let wanted = self.is_enabled() && self.renderer.is_none() && self.target == Some(target);
        match launched {
            Ok(mut renderer) if !wanted => {
                debug!(window = %self.id, attempt, "renderer_restart_discarded");
                renderer.shutdown();
                TickOutcome::Superseded { attempt }
            }
            Err(e) if !wanted => {
                debug!(window = %self.id, attempt, error = %e, "renderer_restart_discarded");
                TickOutcome::Superseded { attempt }
            }
            Ok(mut renderer) => {
                if let Err(e) = push_changed(renderer.as_mut(), launched_with, &self.params) {
                    warn!(window = %self.id, error = %e, "renderer_parameter_sync_failed");
                }
                info!(window = %self.id, attempt, "renderer_restarted");
                self.renderer = Some(renderer);
                TickOutcome::Restarted { attempt }
            }
            Err(e) => {
                warn!(window = %self.id, attempt, error = %e, "renderer_restart_failed");
                let sent = self.deps.notifier.operation_failed(
                    self.id,
                    format!("Failed to re-enable the effect (attempt {attempt}): {e}"),
                );
                self.delivered(sent);
                TickOutcome::RestartFailed { attempt }
            }
        }
    }
}

/// Glass effect for one host window.
///
/// Dropping the controller disables the effect and unregisters the window.
pub struct EffectController {
    /// State shared with the supervisor tick.
    core: Arc<Mutex<ControllerCore>>,
    /// Keeps the window counted while the controller exists.
    window: HostWindowGuard,
}

impl EffectController {
    /// A disabled controller with default parameters.
    pub fn new(window: HostWindowGuard, deps: ControllerDeps) -> Self {
        let id = window.id();
        let health = HealthSupervisor::new(deps.supervisor);
        let core = Arc::new_cyclic(|this| {
            Mutex::new(ControllerCore {
                id,
                this: this.clone(),
                phase: Phase::Disabled,
                params: EffectParameters::default(),
                want_contrast: false,
                holding_contrast: false,
                target: None,
                renderer: None,
                health,
                deps,
            })
        });
        Self { core, window }
    }

    /// A controller seeded from the preference store.
    ///
    /// When the stored defaults ask for it the effect is enabled right away.
    /// A host window without a handle yet does not fail this: the controller
    /// enters `Enabled` and the supervisor launches the renderer once the
    /// handle resolves. An unreadable store or an unsupported platform
    /// leaves the controller in [`Phase::Faulted`].
    pub fn init(window: HostWindowGuard, deps: ControllerDeps) -> Self {
        let loaded = deps.prefs.load();
        let ctl = Self::new(window, deps);
        let mut core = ctl.core.lock();
        match loaded {
            Err(e) => {
                warn!(window = %core.id, error = %e, "preferences_unavailable");
                core.phase = Phase::Faulted(e.to_string());
            }
            Ok(prefs) => {
                core.params = prefs.parameters();
                core.want_contrast = prefs.use_high_contrast;
                if prefs.enabled_on_startup {
                    let (params, want) = (core.params, core.want_contrast);
                    match core.enable(params, want) {
                        Ok(()) | Err(Error::Worker(WorkerError::UnsupportedPlatform { .. })) => {}
                        Err(Error::WindowResolution) => {
                            debug!(window = %core.id, "enable_deferred_to_supervisor");
                            core.activate();
                        }
                        Err(e) => {
                            let sent = core
                                .deps
                                .notifier
                                .operation_failed(core.id, format!("Failed to enable the effect: {e}"));
                            core.delivered(sent);
                        }
                    }
                }
            }
        }
        drop(core);
        ctl
    }

    /// Host window this controller belongs to.
    pub fn id(&self) -> HostWindowId {
        self.window.id()
    }

    /// Launch the renderer and start supervising it. No-op when enabled.
    pub fn enable(&self, params: EffectParameters, want_contrast: bool) -> Result<()> {
        self.core.lock().enable(params, want_contrast)
    }

    /// Stop supervision, shut the renderer down and release contrast.
    /// Safe to call repeatedly.
    pub fn disable(&self) {
        self.core.lock().disable();
    }

    /// Store the opacity and push it to the renderer when enabled.
    pub fn set_opacity(&self, value: i32) -> Result<()> {
        let mut core = self.core.lock();
        core.check_fault()?;
        core.params.opacity = value;
        core.forward(|r| r.set_opacity(value))
    }

    /// Store the brightness and push it to the renderer when enabled.
    pub fn set_brightness(&self, value: i32) -> Result<()> {
        let mut core = self.core.lock();
        core.check_fault()?;
        core.params.brightness = value;
        core.forward(|r| r.set_brightness(value))
    }

    /// Store the text brightness boost and push it when enabled.
    pub fn set_text_brightness(&self, value: i32) -> Result<()> {
        let mut core = self.core.lock();
        core.check_fault()?;
        core.params.text_brightness = value;
        core.forward(|r| r.set_text_brightness(value))
    }

    /// Store the blur type and push it when enabled.
    pub fn set_blur_type(&self, blur: BlurType) -> Result<()> {
        let mut core = self.core.lock();
        core.check_fault()?;
        core.params.blur = blur;
        core.forward(|r| r.set_blur_type(blur))
    }

    /// Record whether this window wants the shared high-contrast mode and,
    /// when enabled, request or release it.
    pub fn set_high_contrast(&self, want: bool) -> Result<()> {
        self.core.lock().set_high_contrast(want)
    }

    /// Re-evaluate the contrast request after the window count changed.
    /// Call in response to [`crate::UiEvent::ReconcileContrast`].
    pub fn reconcile_contrast(&self) {
        self.core.lock().reconcile_contrast();
    }

    /// Release a contrast request left behind when the supervisor switched
    /// the effect off. Call in response to
    /// [`crate::UiEvent::EffectDisabledByFailure`]; a no-op while enabled.
    pub fn release_contrast(&self) {
        let mut core = self.core.lock();
        if !core.is_enabled() {
            core.release_contrast();
        }
    }

    /// Run one supervisor check now, on the calling thread.
    pub fn supervise_tick(&self) -> TickOutcome {
        run_tick(&self.core)
    }

    /// Store the current parameters and flags as defaults for new windows.
    pub fn save_as_defaults(&self) -> Result<()> {
        let core = self.core.lock();
        core.check_fault()?;
        let prefs = Preferences {
            enabled_on_startup: core.is_enabled(),
            use_high_contrast: core.want_contrast,
            ..Preferences::default()
        }
        .with_parameters(&core.params);
        core.deps.prefs.save(&prefs)
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> Phase {
        self.core.lock().phase.clone()
    }

    /// Whether the effect is on (supervised), live or not.
    pub fn is_enabled(&self) -> bool {
        self.core.lock().is_enabled()
    }

    /// Whether a renderer exists and its process is running.
    pub fn is_live(&self) -> bool {
        self.core
            .lock()
            .renderer
            .as_mut()
            .is_some_and(|r| r.is_live())
    }

    /// Whether a renderer handle is held at all.
    pub fn has_renderer(&self) -> bool {
        self.core.lock().renderer.is_some()
    }

    /// Stored parameters, used for the next launch.
    pub fn parameters(&self) -> EffectParameters {
        self.core.lock().params
    }

    /// Whether this window asks for the shared high-contrast mode.
    pub fn wants_high_contrast(&self) -> bool {
        self.core.lock().want_contrast
    }

    /// Consecutive failed health checks.
    pub fn retry_attempts(&self) -> u32 {
        self.core.lock().health.attempts()
    }

    /// The sticky fault message, if any.
    pub fn fault(&self) -> Option<String> {
        match &self.core.lock().phase {
            Phase::Faulted(msg) => Some(msg.clone()),
            _ => None,
        }
    }

    /// Whether the supervisor ticker is scheduled.
    pub fn is_supervised(&self) -> bool {
        let core = self.core.lock();
        core.deps.ticker.is_scheduled(core.id)
    }
}

impl Drop for EffectController {
    fn drop(&mut self) {
        self.core.lock().disable();
    }
}
