//! Glass Engine
//!
//! Keeps a translucent glass effect running behind host windows:
//! - [`EffectController`]: one per host window, drives the renderer lifecycle
//! - a periodic health supervisor that restarts crashed renderers with a
//!   bounded number of attempts
//! - [`ContrastCoordinator`]: the shared high-contrast mode, applied only
//!   while a single host window is open
//! - [`UiEvent`]: everything the engine needs the UI thread to know
//!
//! Renderers are started through the [`glass_worker::Launcher`] seam, so the
//! whole crate runs against mocks in tests.

mod contrast;
mod controller;
mod deps;
mod error;
mod host;
mod notification;
mod prefs;
mod supervisor;
pub mod test_support;
mod ticker;

pub use contrast::{Appearance, ColorPair, ContrastCoordinator, MemoryAppearance, Palette, Rgb};
pub use controller::{ControllerDeps, EffectController, Phase};
pub use deps::{DesktopWindow, FixedWindow, WindowResolver};
pub use error::{Error, Result};
pub use host::{HostWindowGuard, HostWindowId, HostWindows};
pub use notification::{NotificationDispatcher, UiEvent};
pub use prefs::{MemoryPreferenceStore, PreferenceStore, Preferences};
pub use supervisor::{MAX_RESTART_ATTEMPTS, SUPERVISOR_PERIOD_MS, SupervisorCfg, TickOutcome};
pub use ticker::Ticker;
