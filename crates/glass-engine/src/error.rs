//! Engine error type.

use std::result::Result as StdResult;

use thiserror::Error;

/// Convenient result type for the engine crate.
pub type Result<T> = StdResult<T, Error>;

/// Unified error type for the glass engine.
#[derive(Debug, Error)]
pub enum Error {
    /// Errors originating from the worker layer.
    #[error(transparent)]
    Worker(#[from] glass_worker::Error),

    /// The host window handle is not available yet.
    #[error("Failed to detect the host window handle")]
    WindowResolution,

    /// The controller hit a fatal error earlier and refuses further work.
    #[error("{0}")]
    InitError(String),

    /// Switching the shared presentation mode failed.
    #[error("Appearance error: {0}")]
    Appearance(String),

    /// The preference store could not be read or written.
    #[error("Preference store error: {0}")]
    Preferences(String),

    /// The UI event channel has been closed by the receiver.
    #[error("UI channel closed")]
    ChannelClosed,
}
