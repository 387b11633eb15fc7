//! Wire-level types for the glass effect.
//!
//! The host and the renderer worker share three contracts:
//! - the positional command line the worker is launched with ([`worker_args`]),
//! - the handshake line the worker prints to announce its control window
//!   ([`parse_handshake_line`]),
//! - the fixed two-field command record delivered to that window
//!   ([`CommandRecord`]).
//!
//! Everything here is plain data. Process management lives in `glass-worker`.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

mod args;
mod command;
mod error;
mod handshake;

pub use args::worker_args;
pub use command::{CommandId, CommandRecord, ProtocolRevision};
pub use error::{Error, Result};
pub use handshake::{HANDSHAKE_PREFIX, HandshakeLine, parse_handshake_line};

/// Native handle of a top-level host window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WindowHandle(pub u64);

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl FromStr for WindowHandle {
    type Err = Error;

    /// Accepts decimal or `0x`-prefixed hex.
    fn from_str(s: &str) -> Result<Self> {
        let t = s.trim();
        let parsed = match t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
            Some(hex) => u64::from_str_radix(hex, 16),
            None => t.parse::<u64>(),
        };
        match parsed {
            Ok(v) if v != 0 => Ok(Self(v)),
            _ => Err(Error::InvalidWindowHandle(s.to_string())),
        }
    }
}

/// Address of the worker's message-only control window, learned at handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelAddress(pub u64);

impl fmt::Display for ChannelAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Blur applied behind the translucent window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlurType {
    /// No blur.
    #[default]
    None,
    /// Moderate blur.
    Medium,
    /// Strong blur.
    High,
}

impl BlurType {
    /// Integer encoding used on the command line and in command records.
    pub fn as_i32(self) -> i32 {
        match self {
            Self::None => 0,
            Self::Medium => 1,
            Self::High => 2,
        }
    }

    /// Decode the integer encoding.
    pub fn from_i32(v: i32) -> Option<Self> {
        match v {
            0 => Some(Self::None),
            1 => Some(Self::Medium),
            2 => Some(Self::High),
            _ => None,
        }
    }
}

impl FromStr for BlurType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "0" => Ok(Self::None),
            "medium" | "1" => Ok(Self::Medium),
            "high" | "2" => Ok(Self::High),
            _ => Err(Error::InvalidBlurType(s.to_string())),
        }
    }
}

/// Live parameters of one effect instance.
///
/// Ranges are validated by whoever produces the values (sliders, CLI); the
/// effect layer forwards them unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectParameters {
    /// Window opacity, 0..=100.
    pub opacity: i32,
    /// Background brightness, 0..=100.
    pub brightness: i32,
    /// Extra brightness applied to text pixels. Signed.
    pub text_brightness: i32,
    /// Blur behind the window.
    pub blur: BlurType,
    /// Render on the GPU when available.
    pub gpu: bool,
}

impl Default for EffectParameters {
    fn default() -> Self {
        Self {
            opacity: 70,
            brightness: 70,
            text_brightness: 70,
            blur: BlurType::None,
            gpu: true,
        }
    }
}
