//! Parsing of the worker's startup output.

use crate::{ChannelAddress, Error, Result};

/// Prefix of the line announcing the control window address.
pub const HANDSHAKE_PREFIX: &str = "MSG_WINDOW=";

/// Classification of one line of worker stdout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeLine {
    /// The control window announcement.
    Address(ChannelAddress),
    /// Anything else; kept for error reports.
    Diagnostic(String),
}

/// Classify a line of worker output.
///
/// Lines that start with [`HANDSHAKE_PREFIX`] must carry a non-zero hex
/// address; a malformed announcement is an error rather than a diagnostic.
pub fn parse_handshake_line(line: &str) -> Result<HandshakeLine> {
    let line = line.trim_end_matches(['\r', '\n']);
    let Some(rest) = line.strip_prefix(HANDSHAKE_PREFIX) else {
        return Ok(HandshakeLine::Diagnostic(line.to_string()));
    };
    let hex = rest.trim();
    let hex = hex
        .strip_prefix("0x")
        .or_else(|| hex.strip_prefix("0X"))
        .unwrap_or(hex);
    let addr =
        u64::from_str_radix(hex, 16).map_err(|_| Error::InvalidAddress(rest.to_string()))?;
    if addr == 0 {
        return Err(Error::NullAddress);
    }
    Ok(HandshakeLine::Address(ChannelAddress(addr)))
}
