//! Native desktop services used by the worker layer.
//!
//! The renderer itself is opaque; the host only needs a handful of window
//! manager calls around it: the OS build gate, a structured-message send to
//! the worker's control window, and the layered-window alpha of the host
//! window so a crashed worker cannot leave it translucent.

use std::sync::Arc;

use glass_protocol::{ChannelAddress, CommandRecord, WindowHandle};

use crate::Result;

/// Minimum OS build the renderer's capture path requires.
pub const MINIMUM_OS_BUILD: u32 = 19041;

/// Window-manager operations the worker layer depends on.
pub trait Desktop: Send + Sync {
    /// The running OS build number, or `None` when it cannot host the renderer.
    fn os_build(&self) -> Option<u32>;

    /// Whether `window` still refers to a live top-level window.
    fn window_exists(&self, window: WindowHandle) -> bool;

    /// Deliver one command record to the control window at `to`, naming
    /// `from` as the sender. Returns `false` when the transport rejects it.
    fn deliver(&self, to: ChannelAddress, from: WindowHandle, record: CommandRecord) -> bool;

    /// Current layered alpha of `window`; `None` when the window is not layered.
    fn window_alpha(&self, window: WindowHandle) -> Option<u8>;

    /// Set the layered alpha of `window`.
    fn set_window_alpha(&self, window: WindowHandle, alpha: u8) -> Result<()>;
}

/// Desktop for hosts that cannot run the renderer at all.
///
/// Reports no OS build so every launch fails the platform gate.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedDesktop;

impl Desktop for UnsupportedDesktop {
    fn os_build(&self) -> Option<u32> {
        None
    }

    fn window_exists(&self, _window: WindowHandle) -> bool {
        false
    }

    fn deliver(&self, _to: ChannelAddress, _from: WindowHandle, _record: CommandRecord) -> bool {
        false
    }

    fn window_alpha(&self, _window: WindowHandle) -> Option<u8> {
        None
    }

    fn set_window_alpha(&self, _window: WindowHandle, _alpha: u8) -> Result<()> {
        Ok(())
    }
}

/// The desktop implementation for the current platform.
pub fn native_desktop() -> Arc<dyn Desktop> {
    #[cfg(windows)]
    {
        Arc::new(crate::win::WindowsDesktop)
    }
    #[cfg(not(windows))]
    {
        Arc::new(UnsupportedDesktop)
    }
}
