//! Worker error type.

use std::{io::Error as IoError, result::Result as StdResult};

use glass_protocol::CommandId;
use thiserror::Error;

/// Errors raised while launching or talking to a renderer worker.
#[derive(Error, Debug)]
pub enum Error {
    /// The OS is older than the renderer supports. Not retried.
    #[error("{}", unsupported_platform_message(.build, .required))]
    UnsupportedPlatform {
        /// Detected OS build, if any.
        build: Option<u32>,
        /// Minimum build the renderer needs.
        required: u32,
    },

    /// The worker could not be started.
    #[error("Failed to start the renderer worker: {0}")]
    Launch(String),

    /// The worker started but never announced its control window.
    #[error("Failed to communicate with the renderer worker: {reason}{}", log_suffix(.logs))]
    Handshake {
        /// What went wrong.
        reason: String,
        /// Diagnostic output captured before the failure.
        logs: String,
    },

    /// The transport refused a command.
    #[error("Failed to send command {command} (value {value})")]
    ChannelSend {
        /// Command that was refused.
        command: CommandId,
        /// Its argument.
        value: i32,
    },

    /// A command was attempted while the worker was not running.
    #[error("Renderer worker is not running")]
    NotRunning,

    /// The worker's protocol revision has no such command.
    #[error("Command {0} is not supported by this renderer revision")]
    UnsupportedCommand(CommandId),

    /// A native platform call failed.
    #[error("Platform error: {0}")]
    Platform(String),

    /// IO-related errors
    #[error("IO error: {0}")]
    Io(#[from] IoError),
}

/// Convenience type alias for Results using our Error type
pub type Result<T> = StdResult<T, Error>;

/// User-facing remediation text for an outdated OS.
fn unsupported_platform_message(build: &Option<u32>, required: &u32) -> String {
    match build {
        Some(b) => format!(
            "The OS build number ({b}) is too old for this effect. Update the operating system \
             to enable it.\n\nMinimum required OS build number: {required}"
        ),
        None => format!(
            "This effect is only available on Windows (build {required} or newer)."
        ),
    }
}

/// Format captured worker output for inclusion in an error message.
fn log_suffix(logs: &str) -> String {
    if logs.is_empty() {
        String::new()
    } else {
        format!(". Renderer logs:\n{logs}")
    }
}
