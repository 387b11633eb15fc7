//! Protocol decoding errors.

use std::result::Result as StdResult;

use thiserror::Error;

/// Convenient result type for protocol parsing.
pub type Result<T> = StdResult<T, Error>;

/// Errors produced while decoding protocol values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// A handshake line carried an address that is not valid hex.
    #[error("invalid channel address {0:?}")]
    InvalidAddress(String),

    /// The worker announced the null address.
    #[error("worker announced a null channel address")]
    NullAddress,

    /// A window handle could not be parsed.
    #[error("invalid window handle {0:?}")]
    InvalidWindowHandle(String),

    /// Unknown blur type name or value.
    #[error("unknown blur type {0:?}")]
    InvalidBlurType(String),

    /// A command record had the wrong size.
    #[error("command record must be {expected} bytes, got {got}")]
    RecordSize {
        /// Required record size in bytes.
        expected: usize,
        /// Size that was supplied.
        got: usize,
    },
}
