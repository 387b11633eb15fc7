use std::{
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use glass_engine::{
    ContrastCoordinator, ControllerDeps, EffectController, Error, HostWindows, MemoryAppearance,
    MemoryPreferenceStore, NotificationDispatcher, Phase, PreferenceStore, Preferences,
    SupervisorCfg, TickOutcome, Ticker, UiEvent,
    test_support::{MockWindowResolver, drain, light_palette},
};
use glass_protocol::{BlurType, CommandId, EffectParameters, WindowHandle};
use glass_worker::{
    Error as WorkerError, MINIMUM_OS_BUILD,
    mock::{MockFailure, MockLauncher},
};
use tokio::{runtime::Handle, sync::mpsc};

const HOST: WindowHandle = WindowHandle(0x5150);

/// Mock collaborators shared by every controller in one test.
struct Harness {
    windows: HostWindows,
    launcher: MockLauncher,
    resolver: MockWindowResolver,
    appearance: MemoryAppearance,
    contrast: ContrastCoordinator,
    prefs: Arc<MemoryPreferenceStore>,
    rx: mpsc::UnboundedReceiver<UiEvent>,
    deps: ControllerDeps,
}

impl Harness {
    fn with_prefs(prefs: MemoryPreferenceStore) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let windows = HostWindows::new();
        let launcher = MockLauncher::new();
        let resolver = MockWindowResolver::new(Some(HOST));
        let appearance = MemoryAppearance::new(light_palette());
        let contrast = ContrastCoordinator::new(appearance.clone(), windows.clone());
        let prefs = Arc::new(prefs);
        let deps = ControllerDeps {
            launcher: Arc::new(launcher.clone()),
            resolver: Arc::new(resolver.clone()),
            contrast: contrast.clone(),
            notifier: NotificationDispatcher::new(tx),
            prefs: prefs.clone(),
            ticker: Ticker::new(Handle::current()),
            supervisor: SupervisorCfg::default(),
        };
        Self {
            windows,
            launcher,
            resolver,
            appearance,
            contrast,
            prefs,
            rx,
            deps,
        }
    }

    fn new() -> Self {
        Self::with_prefs(MemoryPreferenceStore::new())
    }

    fn controller(&self) -> EffectController {
        EffectController::new(self.windows.open(), self.deps.clone())
    }

    fn init(&self) -> EffectController {
        EffectController::init(self.windows.open(), self.deps.clone())
    }

    fn events(&mut self) -> Vec<UiEvent> {
        drain(&mut self.rx)
    }
}

fn scenario_a_params() -> EffectParameters {
    EffectParameters {
        opacity: 80,
        brightness: 60,
        blur: BlurType::None,
        gpu: false,
        ..EffectParameters::default()
    }
}

fn count_disabled_by_failure(events: &[UiEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, UiEvent::EffectDisabledByFailure { .. }))
        .count()
}

#[tokio::test]
async fn enable_then_set_opacity_sends_command() {
    let mut h = Harness::new();
    let ctl = h.controller();
    ctl.enable(scenario_a_params(), false).unwrap();
    assert!(ctl.is_enabled());
    assert!(ctl.is_live());
    assert!(ctl.is_supervised());

    let r = h.launcher.last().unwrap();
    assert_eq!(r.target, HOST);
    assert_eq!(r.params, scenario_a_params());

    ctl.set_opacity(40).unwrap();
    assert_eq!(r.sent(), vec![(CommandId::SetOpacity, 40)]);
    assert_eq!(ctl.parameters().opacity, 40);

    assert_eq!(
        h.events(),
        vec![UiEvent::StateChanged {
            window: ctl.id(),
            enabled: true
        }]
    );
}

#[tokio::test]
async fn enable_twice_launches_once() {
    let h = Harness::new();
    let ctl = h.controller();
    ctl.enable(EffectParameters::default(), false).unwrap();
    ctl.enable(scenario_a_params(), false).unwrap();
    assert_eq!(h.launcher.attempts(), 1);
    assert_eq!(ctl.parameters(), EffectParameters::default());
}

#[tokio::test]
async fn handshake_failure_leaves_no_renderer() {
    let h = Harness::new();
    h.launcher.set_failure(Some(MockFailure::Handshake));
    let ctl = h.controller();
    let err = ctl.enable(EffectParameters::default(), false).unwrap_err();
    assert!(matches!(err, Error::Worker(WorkerError::Handshake { .. })));
    assert!(!ctl.has_renderer());
    assert!(!ctl.is_live());
    assert_eq!(ctl.phase(), Phase::Disabled);
    assert!(!ctl.is_supervised());

    // Not sticky: a later enable may succeed.
    h.launcher.set_failure(None);
    ctl.enable(EffectParameters::default(), false).unwrap();
    assert!(ctl.is_live());
}

#[tokio::test]
async fn unsupported_platform_is_sticky() {
    let h = Harness::new();
    h.launcher
        .set_failure(Some(MockFailure::UnsupportedPlatform(18000)));
    let ctl = h.controller();
    let err = ctl.enable(EffectParameters::default(), false).unwrap_err();
    match err {
        Error::Worker(WorkerError::UnsupportedPlatform { build, required }) => {
            assert_eq!(build, Some(18000));
            assert_eq!(required, MINIMUM_OS_BUILD);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(h.launcher.launched().is_empty());
    assert!(matches!(ctl.phase(), Phase::Faulted(_)));

    h.launcher.set_failure(None);
    assert!(matches!(
        ctl.enable(EffectParameters::default(), false),
        Err(Error::InitError(_))
    ));
    assert!(matches!(ctl.set_opacity(10), Err(Error::InitError(_))));
    assert!(matches!(ctl.set_high_contrast(true), Err(Error::InitError(_))));
    assert_eq!(h.launcher.attempts(), 1);
    ctl.disable();
    assert!(ctl.fault().is_some());
}

#[tokio::test]
async fn window_resolution_failure_on_enable() {
    let h = Harness::new();
    h.resolver.set(None);
    let ctl = h.controller();
    assert!(matches!(
        ctl.enable(EffectParameters::default(), false),
        Err(Error::WindowResolution)
    ));
    assert_eq!(h.launcher.attempts(), 0);
    assert_eq!(ctl.phase(), Phase::Disabled);
}

#[tokio::test]
async fn disable_is_idempotent() {
    let mut h = Harness::new();
    let ctl = h.controller();
    ctl.enable(EffectParameters::default(), true).unwrap();
    let r = h.launcher.last().unwrap();
    h.events();

    ctl.disable();
    let after_one = (ctl.phase(), ctl.has_renderer(), h.contrast.holders());
    ctl.disable();
    let after_two = (ctl.phase(), ctl.has_renderer(), h.contrast.holders());

    assert_eq!(after_one, after_two);
    assert_eq!(after_one, (Phase::Disabled, false, 0));
    assert_eq!(r.shutdowns(), 1);
    assert!(!ctl.is_supervised());
    assert_eq!(
        h.events(),
        vec![UiEvent::StateChanged {
            window: ctl.id(),
            enabled: false
        }]
    );
}

#[tokio::test]
async fn setters_store_values_while_disabled() {
    let h = Harness::new();
    let ctl = h.controller();
    ctl.set_opacity(11).unwrap();
    ctl.set_brightness(22).unwrap();
    ctl.set_text_brightness(-33).unwrap();
    ctl.set_blur_type(BlurType::High).unwrap();
    assert_eq!(
        ctl.parameters(),
        EffectParameters {
            opacity: 11,
            brightness: 22,
            text_brightness: -33,
            blur: BlurType::High,
            gpu: true,
        }
    );
    assert_eq!(h.launcher.attempts(), 0);
}

#[tokio::test]
async fn setters_forward_every_parameter() {
    let h = Harness::new();
    let ctl = h.controller();
    ctl.enable(EffectParameters::default(), false).unwrap();
    ctl.set_brightness(5).unwrap();
    ctl.set_text_brightness(-7).unwrap();
    ctl.set_blur_type(BlurType::Medium).unwrap();
    assert_eq!(
        h.launcher.last().unwrap().sent(),
        vec![
            (CommandId::SetBrightness, 5),
            (CommandId::SetTextBrightness, -7),
            (CommandId::SetBlurType, 1),
        ]
    );
}

#[tokio::test]
async fn setter_on_dead_renderer_reports_not_running() {
    let h = Harness::new();
    let ctl = h.controller();
    ctl.enable(EffectParameters::default(), false).unwrap();
    h.launcher.last().unwrap().set_live(false);
    assert!(matches!(
        ctl.set_opacity(50),
        Err(Error::Worker(WorkerError::NotRunning))
    ));
    // The value is kept for the next restart.
    assert_eq!(ctl.parameters().opacity, 50);
}

#[tokio::test]
async fn rejected_send_is_surfaced() {
    let h = Harness::new();
    let ctl = h.controller();
    ctl.enable(EffectParameters::default(), false).unwrap();
    h.launcher.last().unwrap().set_reject(true);
    assert!(matches!(
        ctl.set_brightness(1),
        Err(Error::Worker(WorkerError::ChannelSend { .. }))
    ));
}

#[tokio::test]
async fn retries_up_to_ceiling_then_disables_once() {
    let mut h = Harness::new();
    let ctl = h.controller();
    ctl.enable(EffectParameters::default(), false).unwrap();
    assert_eq!(ctl.supervise_tick(), TickOutcome::Healthy);
    assert_eq!(ctl.retry_attempts(), 0);

    h.launcher.set_spawn_dead(true);
    h.launcher.last().unwrap().set_live(false);
    for n in 1..=5 {
        assert_eq!(ctl.supervise_tick(), TickOutcome::Restarted { attempt: n });
        assert!(ctl.is_enabled());
        assert_eq!(ctl.retry_attempts(), n);
    }
    assert_eq!(ctl.supervise_tick(), TickOutcome::GaveUp);
    assert!(!ctl.is_enabled());
    assert!(!ctl.is_supervised());
    assert_eq!(ctl.supervise_tick(), TickOutcome::Idle);

    let events = h.events();
    assert_eq!(count_disabled_by_failure(&events), 1);
    assert!(events.contains(&UiEvent::StateChanged {
        window: ctl.id(),
        enabled: false
    }));
    // One launch from enable plus five restarts.
    assert_eq!(h.launcher.attempts(), 6);
}

#[tokio::test]
async fn giving_up_leaves_contrast_release_to_ui_thread() {
    let mut h = Harness::new();
    let ctl = h.controller();
    ctl.enable(EffectParameters::default(), true).unwrap();
    assert!(h.contrast.is_applied());

    h.launcher.set_spawn_dead(true);
    h.launcher.last().unwrap().set_live(false);
    for n in 1..=5 {
        assert_eq!(ctl.supervise_tick(), TickOutcome::Restarted { attempt: n });
    }
    assert_eq!(ctl.supervise_tick(), TickOutcome::GaveUp);
    assert_eq!(ctl.phase(), Phase::Disabled);
    assert!(!ctl.has_renderer());
    // The tick did not present anything.
    assert!(h.contrast.is_applied());
    assert_eq!(h.appearance.presented().name, "High Contrast");
    assert_eq!(count_disabled_by_failure(&h.events()), 1);

    ctl.release_contrast();
    assert!(!h.contrast.is_applied());
    assert_eq!(h.contrast.holders(), 0);
    assert_eq!(h.appearance.presented(), light_palette());
}

#[tokio::test]
async fn reenabling_without_contrast_drops_pending_release() {
    let h = Harness::new();
    let ctl = h.controller();
    ctl.enable(EffectParameters::default(), true).unwrap();
    h.launcher.set_spawn_dead(true);
    h.launcher.last().unwrap().set_live(false);
    while ctl.supervise_tick() != TickOutcome::GaveUp {}
    assert_eq!(h.contrast.holders(), 1);

    h.launcher.set_spawn_dead(false);
    ctl.enable(EffectParameters::default(), false).unwrap();
    assert_eq!(h.contrast.holders(), 0);
    assert!(!h.contrast.is_applied());
    // Arrives late; nothing left to release.
    ctl.release_contrast();
    assert_eq!(h.contrast.holders(), 0);
}

#[tokio::test]
async fn slow_restart_does_not_block_setters() {
    let h = Harness::new();
    let ctl = Arc::new(h.controller());
    ctl.enable(EffectParameters::default(), false).unwrap();
    h.launcher.last().unwrap().set_live(false);
    h.launcher.set_launch_delay(Duration::from_millis(500));

    let tick = {
        let ctl = ctl.clone();
        thread::spawn(move || ctl.supervise_tick())
    };
    while h.launcher.attempts() < 2 {
        thread::sleep(Duration::from_millis(2));
    }
    let started = Instant::now();
    assert!(matches!(
        ctl.set_opacity(45),
        Err(Error::Worker(WorkerError::NotRunning))
    ));
    assert!(ctl.is_enabled());
    assert!(started.elapsed() < Duration::from_millis(250));

    assert_eq!(tick.join().unwrap(), TickOutcome::Restarted { attempt: 1 });
    let r = h.launcher.last().unwrap();
    assert_eq!(r.params.opacity, EffectParameters::default().opacity);
    // The value set during the launch reaches the new renderer.
    assert_eq!(r.sent(), vec![(CommandId::SetOpacity, 45)]);
    assert!(ctl.is_live());
}

#[tokio::test]
async fn disable_during_restart_discards_new_renderer() {
    let h = Harness::new();
    let ctl = Arc::new(h.controller());
    ctl.enable(EffectParameters::default(), false).unwrap();
    h.launcher.last().unwrap().set_live(false);
    h.launcher.set_launch_delay(Duration::from_millis(200));

    let tick = {
        let ctl = ctl.clone();
        thread::spawn(move || ctl.supervise_tick())
    };
    while h.launcher.attempts() < 2 {
        thread::sleep(Duration::from_millis(2));
    }
    ctl.disable();
    assert_eq!(
        tick.join().unwrap(),
        TickOutcome::Superseded { attempt: 1 }
    );
    assert_eq!(h.launcher.launched().len(), 2);
    assert_eq!(h.launcher.last().unwrap().shutdowns(), 1);
    assert!(!ctl.has_renderer());
    assert_eq!(ctl.phase(), Phase::Disabled);
}

#[tokio::test]
async fn restart_forwards_current_parameters() {
    let h = Harness::new();
    let ctl = h.controller();
    ctl.enable(EffectParameters::default(), false).unwrap();
    let first = h.launcher.last().unwrap();
    ctl.set_text_brightness(-5).unwrap();
    ctl.set_blur_type(BlurType::High).unwrap();

    first.set_live(false);
    assert_eq!(ctl.supervise_tick(), TickOutcome::Restarted { attempt: 1 });
    assert_eq!(first.shutdowns(), 1);
    let second = h.launcher.last().unwrap();
    assert_eq!(second.params.text_brightness, -5);
    assert_eq!(second.params.blur, BlurType::High);

    assert_eq!(ctl.supervise_tick(), TickOutcome::Healthy);
    assert_eq!(ctl.retry_attempts(), 0);
}

#[tokio::test]
async fn failed_restart_is_reported_and_retried() {
    let mut h = Harness::new();
    let ctl = h.controller();
    ctl.enable(EffectParameters::default(), false).unwrap();
    h.events();

    h.launcher.last().unwrap().set_live(false);
    h.launcher.set_failure(Some(MockFailure::Launch));
    assert_eq!(
        ctl.supervise_tick(),
        TickOutcome::RestartFailed { attempt: 1 }
    );
    assert!(ctl.is_enabled());
    assert!(!ctl.has_renderer());
    let events = h.events();
    assert_eq!(events.len(), 1);
    match &events[0] {
        UiEvent::OperationFailed { window, message } => {
            assert_eq!(*window, ctl.id());
            assert!(message.contains("attempt 1"), "{message}");
        }
        other => panic!("unexpected event: {other:?}"),
    }

    h.launcher.set_failure(None);
    assert_eq!(ctl.supervise_tick(), TickOutcome::Restarted { attempt: 2 });
    assert_eq!(ctl.supervise_tick(), TickOutcome::Healthy);
    assert_eq!(ctl.retry_attempts(), 0);
}

#[tokio::test]
async fn startup_enable_waits_for_window() {
    let h = Harness::with_prefs(MemoryPreferenceStore::with_saved(Preferences {
        enabled_on_startup: true,
        use_high_contrast: false,
        opacity: 55,
        ..Preferences::default()
    }));
    h.resolver.set(None);
    let ctl = h.init();
    assert!(ctl.is_enabled());
    assert!(ctl.is_supervised());
    assert!(!ctl.has_renderer());

    assert_eq!(ctl.supervise_tick(), TickOutcome::WindowUnavailable);
    assert_eq!(ctl.retry_attempts(), 0);

    h.resolver.set(Some(HOST));
    assert_eq!(ctl.supervise_tick(), TickOutcome::Restarted { attempt: 1 });
    assert_eq!(h.launcher.last().unwrap().params.opacity, 55);
    assert_eq!(ctl.supervise_tick(), TickOutcome::Healthy);
}

#[tokio::test]
async fn init_reads_defaults() {
    let h = Harness::new();
    let ctl = h.init();
    assert_eq!(ctl.phase(), Phase::Disabled);
    assert_eq!(ctl.parameters(), EffectParameters::default());
    assert!(ctl.wants_high_contrast());
    assert_eq!(h.launcher.attempts(), 0);
}

#[tokio::test]
async fn init_on_unsupported_platform_faults() {
    let h = Harness::with_prefs(MemoryPreferenceStore::with_saved(Preferences {
        enabled_on_startup: true,
        ..Preferences::default()
    }));
    h.launcher
        .set_failure(Some(MockFailure::UnsupportedPlatform(18000)));
    let ctl = h.init();
    let msg = ctl.fault().unwrap();
    assert!(msg.contains("19041"), "{msg}");
    assert!(!ctl.is_supervised());
}

#[tokio::test]
async fn save_as_defaults_writes_current_state() {
    let h = Harness::new();
    let ctl = h.controller();
    ctl.enable(EffectParameters::default(), true).unwrap();
    ctl.set_opacity(33).unwrap();
    ctl.set_high_contrast(false).unwrap();
    ctl.save_as_defaults().unwrap();
    assert_eq!(
        h.prefs.load().unwrap(),
        Preferences {
            opacity: 33,
            enabled_on_startup: true,
            use_high_contrast: false,
            ..Preferences::default()
        }
    );
    h.prefs.reset_to_defaults().unwrap();
    assert_eq!(h.prefs.load().unwrap(), Preferences::default());
}

#[tokio::test]
async fn save_as_defaults_fails_when_faulted() {
    let h = Harness::new();
    h.launcher
        .set_failure(Some(MockFailure::UnsupportedPlatform(18000)));
    let ctl = h.controller();
    assert!(ctl.enable(EffectParameters::default(), false).is_err());
    assert!(matches!(ctl.save_as_defaults(), Err(Error::InitError(_))));
    assert_eq!(h.prefs.load().unwrap(), Preferences::default());
}

#[tokio::test]
async fn dropping_controller_disposes_it() {
    let h = Harness::new();
    let ctl = h.controller();
    ctl.enable(EffectParameters::default(), true).unwrap();
    let r = h.launcher.last().unwrap();
    assert_eq!(h.windows.count(), 1);
    assert!(h.contrast.is_applied());
    drop(ctl);
    assert_eq!(r.shutdowns(), 1);
    assert_eq!(h.windows.count(), 0);
    assert!(!h.contrast.is_applied());
    assert_eq!(h.appearance.presented(), light_palette());
}

#[tokio::test]
async fn contrast_never_applies_with_two_windows() {
    let mut h = Harness::new();
    let a = h.controller();
    let b = h.controller();
    a.enable(EffectParameters::default(), true).unwrap();
    assert!(!h.contrast.is_applied());
    b.enable(EffectParameters::default(), true).unwrap();
    assert!(!h.contrast.is_applied());
    assert_eq!(h.contrast.holders(), 2);

    // Closing one window leaves a single requester.
    drop(b);
    assert_eq!(h.contrast.holders(), 1);
    assert!(!h.contrast.is_applied());
    h.events();

    assert_eq!(a.supervise_tick(), TickOutcome::Healthy);
    assert!(h
        .events()
        .contains(&UiEvent::ReconcileContrast { window: a.id() }));
    a.reconcile_contrast();
    assert!(h.contrast.is_applied());
    assert_eq!(h.contrast.saved(), Some(light_palette()));

    a.disable();
    assert!(!h.contrast.is_applied());
    assert_eq!(h.appearance.presented(), light_palette());
}

#[tokio::test]
async fn second_window_tears_down_contrast() {
    let mut h = Harness::new();
    let a = h.controller();
    a.enable(EffectParameters::default(), true).unwrap();
    assert!(h.contrast.is_applied());
    let presented = h.appearance.presented();
    assert_eq!(presented.name, "High Contrast");
    assert!(presented
        .pairs
        .iter()
        .all(|p| p.fg.luminance() >= p.bg.luminance()));

    assert_eq!(a.supervise_tick(), TickOutcome::Healthy);
    h.events();

    let other = h.windows.open();
    assert_eq!(a.supervise_tick(), TickOutcome::Healthy);
    assert_eq!(
        h.events(),
        vec![UiEvent::ReconcileContrast { window: a.id() }]
    );
    a.reconcile_contrast();
    assert!(!h.contrast.is_applied());
    assert_eq!(h.appearance.presented(), light_palette());

    drop(other);
    assert_eq!(a.supervise_tick(), TickOutcome::Healthy);
    a.reconcile_contrast();
    assert!(h.contrast.is_applied());
}

#[tokio::test]
async fn high_contrast_toggle_round_trips_appearance() {
    let h = Harness::new();
    let ctl = h.controller();
    ctl.enable(EffectParameters::default(), false).unwrap();
    assert!(!h.contrast.is_applied());

    ctl.set_high_contrast(true).unwrap();
    assert!(h.contrast.is_applied());
    let saved = h.contrast.saved().unwrap();

    ctl.set_high_contrast(false).unwrap();
    assert!(!h.contrast.is_applied());
    assert_eq!(h.appearance.presented(), saved);

    // Toggling while disabled only records the flag.
    ctl.disable();
    ctl.set_high_contrast(true).unwrap();
    assert!(ctl.wants_high_contrast());
    assert_eq!(h.contrast.holders(), 0);
}
