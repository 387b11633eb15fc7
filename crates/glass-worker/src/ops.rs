//! Seams between the effect controller and the worker layer.
//!
//! The controller only sees [`Launcher`] and [`Renderer`]; the real
//! implementations spawn [`EffectProcess`]es, and the mocks (behind the
//! `test-utils` feature) script liveness and failures without touching the OS.

use std::sync::Arc;

use glass_protocol::{BlurType, CommandId, EffectParameters, WindowHandle};

use crate::{Error, Result, desktop::Desktop, process::EffectProcess, process::WorkerConfig};

/// A running effect that can be driven and torn down.
pub trait Renderer: Send {
    /// True while the underlying worker is running.
    fn is_live(&mut self) -> bool;

    /// Deliver a raw command.
    fn send_command(&mut self, command: CommandId, value: i32) -> Result<()>;

    /// Stop the worker and restore the host window.
    fn shutdown(&mut self);

    /// Send `command` if the worker is live, otherwise fail with `NotRunning`.
    fn send_if_live(&mut self, command: CommandId, value: i32) -> Result<()> {
        if !self.is_live() {
            return Err(Error::NotRunning);
        }
        self.send_command(command, value)
    }

    /// Push a new opacity.
    fn set_opacity(&mut self, value: i32) -> Result<()> {
        self.send_if_live(CommandId::SetOpacity, value)
    }

    /// Push a new brightness.
    fn set_brightness(&mut self, value: i32) -> Result<()> {
        self.send_if_live(CommandId::SetBrightness, value)
    }

    /// Push a new text brightness boost.
    fn set_text_brightness(&mut self, value: i32) -> Result<()> {
        self.send_if_live(CommandId::SetTextBrightness, value)
    }

    /// Push a new blur type.
    fn set_blur_type(&mut self, blur: BlurType) -> Result<()> {
        self.send_if_live(CommandId::SetBlurType, blur.as_i32())
    }
}

/// Starts renderers for a target window.
pub trait Launcher: Send + Sync {
    /// Launch a renderer and wait for it to become controllable.
    fn launch(&self, target: WindowHandle, params: &EffectParameters)
    -> Result<Box<dyn Renderer>>;
}

impl Renderer for EffectProcess {
    fn is_live(&mut self) -> bool {
        Self::is_live(self)
    }

    fn send_command(&mut self, command: CommandId, value: i32) -> Result<()> {
        Self::send_command(self, command, value)
    }

    fn shutdown(&mut self) {
        Self::shutdown(self);
    }
}

/// Launcher that spawns real worker processes.
pub struct WorkerLauncher {
    /// How to start the worker.
    config: WorkerConfig,
    /// Platform services shared by every process.
    desktop: Arc<dyn Desktop>,
}

impl WorkerLauncher {
    /// Create a launcher from a worker configuration.
    pub fn new(config: WorkerConfig, desktop: Arc<dyn Desktop>) -> Self {
        Self { config, desktop }
    }

    /// The worker configuration.
    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }
}

impl Launcher for WorkerLauncher {
    fn launch(
        &self,
        target: WindowHandle,
        params: &EffectParameters,
    ) -> Result<Box<dyn Renderer>> {
        let process = EffectProcess::launch(&self.config, self.desktop.clone(), target, params)?;
        Ok(Box::new(process))
    }
}
