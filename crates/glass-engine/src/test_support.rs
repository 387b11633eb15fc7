//! Test support utilities for glass-engine integration/unit tests.
//! These helpers are public to avoid dead_code warnings and are lightweight.
//! They are intended for use by the test suite only.

use std::{sync::Arc, time::Duration};

use glass_protocol::WindowHandle;
use parking_lot::Mutex;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::{
    ColorPair, Palette, Rgb, UiEvent, WindowResolver, supervisor::SupervisorCfg,
};

/// Resolver whose answer the test controls.
#[derive(Clone, Default)]
pub struct MockWindowResolver {
    /// Answer returned by `resolve`.
    handle: Arc<Mutex<Option<WindowHandle>>>,
}

impl MockWindowResolver {
    /// Resolver answering `handle`.
    pub fn new(handle: Option<WindowHandle>) -> Self {
        Self {
            handle: Arc::new(Mutex::new(handle)),
        }
    }

    /// Change the answer.
    pub fn set(&self, handle: Option<WindowHandle>) {
        *self.handle.lock() = handle;
    }
}

impl WindowResolver for MockWindowResolver {
    fn resolve(&self) -> Option<WindowHandle> {
        *self.handle.lock()
    }
}

/// A plain light palette to start tests from.
pub fn light_palette() -> Palette {
    Palette {
        name: "Light".into(),
        pairs: vec![
            ColorPair::new("text", Rgb(0, 0, 0), Rgb(255, 255, 255)),
            ColorPair::new("selection", Rgb(0, 0, 0), Rgb(173, 214, 255)),
        ],
    }
}

/// Supervisor configuration with a short period for ticker-driven tests.
pub fn fast_supervisor_cfg(period_ms: u64) -> SupervisorCfg {
    SupervisorCfg {
        period: Duration::from_millis(period_ms),
        ..SupervisorCfg::default()
    }
}

/// Take every event already queued.
pub fn drain(rx: &mut UnboundedReceiver<UiEvent>) -> Vec<UiEvent> {
    let mut out = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        out.push(ev);
    }
    out
}

/// Receive UI events until `pred` matches or `timeout_ms` elapses.
pub async fn recv_until<F>(rx: &mut UnboundedReceiver<UiEvent>, timeout_ms: u64, mut pred: F) -> bool
where
    F: FnMut(&UiEvent) -> bool,
{
    tokio::time::timeout(Duration::from_millis(timeout_ms), async {
        while let Some(ev) = rx.recv().await {
            if pred(&ev) {
                return true;
            }
        }
        false
    })
    .await
    .unwrap_or(false)
}
