//! Command ids, their wire numbering and the structured message record.

use std::{fmt, mem::size_of};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Commands understood by the renderer's control window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandId {
    /// Ask the worker to tear down and exit.
    Exit,
    /// Set window opacity.
    SetOpacity,
    /// Set background brightness.
    SetBrightness,
    /// Set the extra brightness applied to text.
    SetTextBrightness,
    /// Set the blur type.
    SetBlurType,
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Exit => "Exit",
            Self::SetOpacity => "SetOpacity",
            Self::SetBrightness => "SetBrightness",
            Self::SetTextBrightness => "SetTextBrightness",
            Self::SetBlurType => "SetBlurType",
        };
        f.write_str(s)
    }
}

/// Worker protocol generation.
///
/// Legacy workers predate the text brightness parameter: they take one
/// positional argument fewer and number `SetBlurType` as 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolRevision {
    /// Five positional arguments, no text brightness.
    Legacy,
    /// Six positional arguments.
    #[default]
    Current,
}

impl ProtocolRevision {
    /// Wire id for `cmd`, or `None` when this revision has no such command.
    pub fn wire_id(self, cmd: CommandId) -> Option<i32> {
        match (self, cmd) {
            (_, CommandId::Exit) => Some(0),
            (_, CommandId::SetOpacity) => Some(1),
            (_, CommandId::SetBrightness) => Some(2),
            (Self::Current, CommandId::SetTextBrightness) => Some(3),
            (Self::Legacy, CommandId::SetTextBrightness) => None,
            (Self::Current, CommandId::SetBlurType) => Some(4),
            (Self::Legacy, CommandId::SetBlurType) => Some(3),
        }
    }

    /// Inverse of [`wire_id`](Self::wire_id).
    pub fn command_for(self, id: i32) -> Option<CommandId> {
        [
            CommandId::Exit,
            CommandId::SetOpacity,
            CommandId::SetBrightness,
            CommandId::SetTextBrightness,
            CommandId::SetBlurType,
        ]
        .into_iter()
        .find(|c| self.wire_id(*c) == Some(id))
    }

    /// Whether the worker takes a text brightness argument.
    pub fn has_text_brightness(self) -> bool {
        matches!(self, Self::Current)
    }
}

/// The fixed-layout `{commandId, commandValue}` record carried by one
/// structured message. The layout is two native-endian `i32`s, in order.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandRecord {
    /// Revision-specific wire id.
    pub command_id: i32,
    /// Command argument; zero for `Exit`.
    pub command_value: i32,
}

impl CommandRecord {
    /// Size of the record on the wire.
    pub const SIZE: usize = size_of::<Self>();

    /// Build the record for `cmd` under `rev`.
    pub fn new(rev: ProtocolRevision, cmd: CommandId, value: i32) -> Option<Self> {
        rev.wire_id(cmd).map(|command_id| Self {
            command_id,
            command_value: value,
        })
    }

    /// Serialize to the wire layout.
    pub fn to_bytes(self) -> [u8; 8] {
        let mut out = [0u8; 8];
        out[..4].copy_from_slice(&self.command_id.to_ne_bytes());
        out[4..].copy_from_slice(&self.command_value.to_ne_bytes());
        out
    }

    /// Parse the wire layout.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let [a, b, c, d, e, f, g, h] = bytes else {
            return Err(Error::RecordSize {
                expected: Self::SIZE,
                got: bytes.len(),
            });
        };
        Ok(Self {
            command_id: i32::from_ne_bytes([*a, *b, *c, *d]),
            command_value: i32::from_ne_bytes([*e, *f, *g, *h]),
        })
    }
}
