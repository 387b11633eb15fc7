//! Scriptable stand-ins for the desktop and the worker (enabled with the
//! `test-utils` feature).

use std::{
    collections::{HashMap, HashSet},
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    thread,
    time::Duration,
};

use glass_protocol::{ChannelAddress, CommandId, CommandRecord, EffectParameters, WindowHandle};
use parking_lot::Mutex;

use crate::{
    Error, Result,
    desktop::Desktop,
    ops::{Launcher, Renderer},
};

/// One record captured by [`MockDesktop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    /// Control window addressed.
    pub to: ChannelAddress,
    /// Sender named in the message.
    pub from: WindowHandle,
    /// The record itself.
    pub record: CommandRecord,
}

/// In-memory desktop.
#[derive(Clone)]
pub struct MockDesktop {
    /// Reported OS build.
    build: Arc<Mutex<Option<u32>>>,
    /// Records accepted by `deliver`.
    delivered: Arc<Mutex<Vec<Delivery>>>,
    /// Refuse every delivery.
    reject: Arc<AtomicBool>,
    /// Per-window layered alpha.
    alpha: Arc<Mutex<HashMap<WindowHandle, u8>>>,
    /// Windows reported as gone.
    missing: Arc<Mutex<HashSet<WindowHandle>>>,
}

impl Default for MockDesktop {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDesktop {
    /// A desktop on a supported build with every window present.
    pub fn new() -> Self {
        Self {
            build: Arc::new(Mutex::new(Some(22631))),
            delivered: Arc::new(Mutex::new(Vec::new())),
            reject: Arc::new(AtomicBool::new(false)),
            alpha: Arc::new(Mutex::new(HashMap::new())),
            missing: Arc::new(Mutex::new(HashSet::new())),
        }
    }
    /// Report `build` as the OS build.
    pub fn set_build(&self, build: Option<u32>) {
        *self.build.lock() = build;
    }
    /// Refuse (or accept again) every delivery.
    pub fn set_reject(&self, v: bool) {
        self.reject.store(v, Ordering::SeqCst);
    }
    /// Set a window's layered alpha.
    pub fn set_alpha(&self, window: WindowHandle, alpha: u8) {
        self.alpha.lock().insert(window, alpha);
    }
    /// A window's layered alpha, if one was set.
    pub fn alpha(&self, window: WindowHandle) -> Option<u8> {
        self.alpha.lock().get(&window).copied()
    }
    /// Report `window` as destroyed, or present again.
    pub fn set_window_missing(&self, window: WindowHandle, missing: bool) {
        let mut g = self.missing.lock();
        if missing {
            g.insert(window);
        } else {
            g.remove(&window);
        }
    }
    /// Every record delivered so far.
    pub fn deliveries(&self) -> Vec<Delivery> {
        self.delivered.lock().clone()
    }
}

impl Desktop for MockDesktop {
    fn os_build(&self) -> Option<u32> {
        *self.build.lock()
    }

    fn window_exists(&self, window: WindowHandle) -> bool {
        !self.missing.lock().contains(&window)
    }

    fn deliver(&self, to: ChannelAddress, from: WindowHandle, record: CommandRecord) -> bool {
        if self.reject.load(Ordering::SeqCst) {
            return false;
        }
        self.delivered.lock().push(Delivery { to, from, record });
        true
    }

    fn window_alpha(&self, window: WindowHandle) -> Option<u8> {
        self.alpha(window)
    }

    fn set_window_alpha(&self, window: WindowHandle, alpha: u8) -> Result<()> {
        self.set_alpha(window, alpha);
        Ok(())
    }
}

/// Shared state behind one [`MockRenderer`].
#[derive(Default)]
struct RendererState {
    /// Reported liveness.
    live: AtomicBool,
    /// Fail sends.
    reject: AtomicBool,
    /// `shutdown` calls.
    shutdowns: AtomicUsize,
    /// Commands accepted.
    sent: Mutex<Vec<(CommandId, i32)>>,
}

/// Test handle observing a renderer produced by [`MockLauncher`].
#[derive(Clone)]
pub struct MockRendererHandle {
    /// State shared with the renderer.
    state: Arc<RendererState>,
    /// Window the renderer was launched for.
    pub target: WindowHandle,
    /// Parameters it was launched with.
    pub params: EffectParameters,
}

impl MockRendererHandle {
    /// Simulate a crash (or revive).
    pub fn set_live(&self, v: bool) {
        self.state.live.store(v, Ordering::SeqCst);
    }
    /// Whether the renderer currently reports live.
    pub fn is_live(&self) -> bool {
        self.state.live.load(Ordering::SeqCst)
    }
    /// Make every subsequent command fail to send.
    pub fn set_reject(&self, v: bool) {
        self.state.reject.store(v, Ordering::SeqCst);
    }
    /// Commands sent so far, in order.
    pub fn sent(&self) -> Vec<(CommandId, i32)> {
        self.state.sent.lock().clone()
    }
    /// Times `shutdown` was called.
    pub fn shutdowns(&self) -> usize {
        self.state.shutdowns.load(Ordering::SeqCst)
    }
}

/// Renderer whose liveness is controlled by the test.
pub struct MockRenderer {
    /// State shared with the test handle.
    state: Arc<RendererState>,
}

impl Renderer for MockRenderer {
    fn is_live(&mut self) -> bool {
        self.state.live.load(Ordering::SeqCst)
    }

    fn send_command(&mut self, command: CommandId, value: i32) -> Result<()> {
        if self.state.reject.load(Ordering::SeqCst) {
            return Err(Error::ChannelSend { command, value });
        }
        self.state.sent.lock().push((command, value));
        Ok(())
    }

    fn shutdown(&mut self) {
        self.state.shutdowns.fetch_add(1, Ordering::SeqCst);
        self.state.live.store(false, Ordering::SeqCst);
    }
}

/// Failure a [`MockLauncher`] should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    /// Fail the platform gate with the given build.
    UnsupportedPlatform(u32),
    /// Worker starts but never completes the handshake.
    Handshake,
    /// Worker cannot be spawned.
    Launch,
}

impl MockFailure {
    /// The worker error this failure stands for.
    fn to_error(self) -> Error {
        match self {
            Self::UnsupportedPlatform(build) => Error::UnsupportedPlatform {
                build: Some(build),
                required: crate::desktop::MINIMUM_OS_BUILD,
            },
            Self::Handshake => Error::Handshake {
                reason: "worker exited before announcing its control window".into(),
                logs: String::new(),
            },
            Self::Launch => Error::Launch("mock launch failure".into()),
        }
    }
}

/// Launcher that hands out [`MockRenderer`]s.
#[derive(Clone, Default)]
pub struct MockLauncher {
    /// Failure every launch produces, if any.
    failure: Arc<Mutex<Option<MockFailure>>>,
    /// Whether new renderers start dead.
    spawn_dead: Arc<AtomicBool>,
    /// Time each launch blocks for.
    delay: Arc<Mutex<Duration>>,
    /// Launch calls, successful or not.
    attempts: Arc<AtomicUsize>,
    /// Handles to every renderer handed out.
    launched: Arc<Mutex<Vec<MockRendererHandle>>>,
}

impl MockLauncher {
    /// A launcher whose renderers start live.
    pub fn new() -> Self {
        Self::default()
    }
    /// Make every subsequent launch fail (or succeed again with `None`).
    pub fn set_failure(&self, failure: Option<MockFailure>) {
        *self.failure.lock() = failure;
    }
    /// Launch renderers that are already dead.
    pub fn set_spawn_dead(&self, v: bool) {
        self.spawn_dead.store(v, Ordering::SeqCst);
    }
    /// Block every subsequent launch for `delay`, like a slow handshake.
    pub fn set_launch_delay(&self, delay: Duration) {
        *self.delay.lock() = delay;
    }
    /// Launch attempts, successful or not.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
    /// Every renderer launched so far, oldest first.
    pub fn launched(&self) -> Vec<MockRendererHandle> {
        self.launched.lock().clone()
    }
    /// The most recently launched renderer.
    pub fn last(&self) -> Option<MockRendererHandle> {
        self.launched.lock().last().cloned()
    }
}

impl Launcher for MockLauncher {
    fn launch(
        &self,
        target: WindowHandle,
        params: &EffectParameters,
    ) -> Result<Box<dyn Renderer>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock();
        if !delay.is_zero() {
            thread::sleep(delay);
        }
        if let Some(f) = *self.failure.lock() {
            return Err(f.to_error());
        }
        let state = Arc::new(RendererState::default());
        state
            .live
            .store(!self.spawn_dead.load(Ordering::SeqCst), Ordering::SeqCst);
        self.launched.lock().push(MockRendererHandle {
            state: state.clone(),
            target,
            params: *params,
        });
        Ok(Box::new(MockRenderer { state }))
    }
}
