//! Host window lookup.

use std::sync::Arc;

use glass_protocol::WindowHandle;
use glass_worker::Desktop;

/// Locates the native handle of the host window the effect targets.
///
/// Returns `None` while the window has no usable handle yet (not realised,
/// or already destroyed).
pub trait WindowResolver: Send + Sync {
    /// The handle, or `None` while unavailable.
    fn resolve(&self) -> Option<WindowHandle>;
}

/// Resolver for a handle known up front.
pub struct FixedWindow(pub WindowHandle);

impl WindowResolver for FixedWindow {
    fn resolve(&self) -> Option<WindowHandle> {
        Some(self.0)
    }
}

/// Resolver that only reports `handle` while the desktop says it exists.
pub struct DesktopWindow {
    /// Handle given on the command line.
    handle: WindowHandle,
    /// Used to check the window still exists.
    desktop: Arc<dyn Desktop>,
}

impl DesktopWindow {
    /// Resolver for a known `handle`.
    pub fn new(handle: WindowHandle, desktop: Arc<dyn Desktop>) -> Self {
        Self { handle, desktop }
    }
}

impl WindowResolver for DesktopWindow {
    fn resolve(&self) -> Option<WindowHandle> {
        self.desktop
            .window_exists(self.handle)
            .then_some(self.handle)
    }
}
