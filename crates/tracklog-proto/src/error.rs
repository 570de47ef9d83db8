//! Protocol error types.

use thiserror::Error;

/// Protocol-level errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The frame did not start with a known command.
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// A header line had no `:` separator.
    #[error("malformed header line: {0}")]
    MalformedHeader(String),

    /// A header contained an escape sequence the protocol does not define.
    #[error("invalid escape sequence in header: \\{0}")]
    InvalidEscape(char),

    /// The frame was not terminated by a NUL octet.
    #[error("frame is missing its NUL terminator")]
    MissingTerminator,

    /// `content-length` was not a number or exceeded the body.
    #[error("invalid content-length: {0}")]
    InvalidContentLength(String),

    /// The frame ended before the blank line separating headers and body.
    #[error("frame ended inside the header block")]
    Truncated,
}
