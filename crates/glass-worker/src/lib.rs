//! Out-of-process renderer management for the glass effect.
//!
//! The pixel work happens in a separate worker binary that may crash at any
//! time. This crate owns everything the host does with that worker:
//!
//! - [`EffectProcess`]: launch with positional arguments, read stdout until
//!   the `MSG_WINDOW=` handshake, drive it through a [`CommandChannel`], and
//!   shut it down with a bounded grace period.
//! - [`Desktop`]: the few native calls involved (OS build gate, structured
//!   message delivery, host window alpha). Windows gets a real
//!   implementation; everything else is reported as unsupported.
//! - [`Launcher`] / [`Renderer`]: the seam the controller is written against.
//!
//! Liveness is process-handle based: no heartbeat is exchanged with the
//! worker.
#![warn(missing_docs)]

mod channel;
mod desktop;
mod error;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
mod ops;
mod process;
#[cfg(windows)]
mod win;

pub use channel::CommandChannel;
pub use desktop::{Desktop, MINIMUM_OS_BUILD, UnsupportedDesktop, native_desktop};
pub use error::{Error, Result};
pub use ops::{Launcher, Renderer, WorkerLauncher};
pub use process::{EffectProcess, HANDSHAKE_TIMEOUT_MS, SHUTDOWN_TIMEOUT_MS, WorkerConfig};
