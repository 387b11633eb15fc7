//! The `run` subcommand: one supervised effect until interrupted.

use std::sync::Arc;

use glass_engine::{
    ColorPair, ContrastCoordinator, ControllerDeps, DesktopWindow, EffectController,
    HostWindows, MemoryAppearance, MemoryPreferenceStore, NotificationDispatcher, Palette,
    Preferences, Rgb, SupervisorCfg, Ticker, UiEvent,
};
use glass_protocol::EffectParameters;
use glass_worker::WorkerLauncher;
use tokio::{
    runtime::{Builder, Runtime},
    sync::mpsc::{self, UnboundedReceiver},
};
use tracing::{debug, error, info, warn};

use crate::{RunArgs, desktop};

/// Appearance presented before any contrast switch.
fn default_palette() -> Palette {
    Palette {
        name: "Default".into(),
        pairs: vec![
            ColorPair::new("text", Rgb(30, 30, 30), Rgb(250, 250, 250)),
            ColorPair::new("selection", Rgb(30, 30, 30), Rgb(166, 210, 255)),
        ],
    }
}

impl RunArgs {
    /// Startup preferences described by the command line.
    fn preferences(&self) -> Preferences {
        let params = EffectParameters {
            opacity: self.opacity,
            brightness: self.brightness,
            text_brightness: self.text_brightness,
            blur: self.blur,
            gpu: !self.no_gpu,
        };
        Preferences {
            enabled_on_startup: true,
            use_high_contrast: self.high_contrast,
            ..Preferences::default()
        }
        .with_parameters(&params)
    }
}

/// Route one UI event back to the controller. Runs on the main thread.
fn handle_event(ctl: &EffectController, event: UiEvent) {
    match event {
        UiEvent::StateChanged { window, enabled } => info!(%window, enabled, "effect_state"),
        UiEvent::EffectDisabledByFailure { window } => {
            warn!(%window, "The effect kept crashing and has been switched off");
            ctl.release_contrast();
        }
        UiEvent::OperationFailed { window, message } => error!(%window, "{message}"),
        UiEvent::ReconcileContrast { window } => {
            debug!(%window, "reconcile_contrast");
            ctl.reconcile_contrast();
        }
    }
}

/// Drain events until Ctrl-C or until the effect is switched off.
fn event_loop(rt: &Runtime, ctl: &EffectController, rx: &mut UnboundedReceiver<UiEvent>) {
    rt.block_on(async {
        loop {
            tokio::select! {
                ev = rx.recv() => {
                    let Some(ev) = ev else { break };
                    let gave_up = matches!(ev, UiEvent::EffectDisabledByFailure { .. });
                    handle_event(ctl, ev);
                    if gave_up {
                        break;
                    }
                }
                res = tokio::signal::ctrl_c() => {
                    if let Err(e) = res {
                        error!(error = %e, "ctrl_c_handler_failed");
                    }
                    info!("interrupted");
                    break;
                }
            }
        }
    });
}

/// Run the effect until interrupted; returns the process exit code.
pub fn run(args: &RunArgs, log_spec: &str) -> i32 {
    let rt = match Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to start runtime: {e}");
            return 1;
        }
    };

    let desktop = desktop();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let windows = HostWindows::new();
    let ticker = Ticker::new(rt.handle().clone());
    let deps = ControllerDeps {
        launcher: Arc::new(WorkerLauncher::new(
            args.worker.config(log_spec),
            desktop.clone(),
        )),
        resolver: Arc::new(DesktopWindow::new(args.window, desktop)),
        contrast: ContrastCoordinator::new(MemoryAppearance::new(default_palette()), windows.clone()),
        notifier: NotificationDispatcher::new(tx),
        prefs: Arc::new(MemoryPreferenceStore::with_saved(args.preferences())),
        ticker: ticker.clone(),
        supervisor: SupervisorCfg::default(),
    };

    let ctl = EffectController::init(windows.open(), deps);
    if let Some(msg) = ctl.fault() {
        eprintln!("{msg}");
        return 1;
    }
    if !ctl.is_enabled() {
        while let Ok(ev) = rx.try_recv() {
            if let UiEvent::OperationFailed { message, .. } = ev {
                eprintln!("{message}");
            }
        }
        return 1;
    }
    info!(window = %args.window, params = ?ctl.parameters(), "glass_running");

    event_loop(&rt, &ctl, &mut rx);

    let code = if ctl.is_enabled() { 0 } else { 1 };
    ctl.disable();
    rt.block_on(ticker.shutdown());
    code
}
