//! Codec error taxonomy.
//!
//! All of these are non-fatal to the caller: a decode failure is reported
//! upward (the session wraps it in a parse-error value) and the connection
//! stays open.

use thiserror::Error;

/// Errors that can arise when encoding/decoding a wire message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Buffer does not start with the binary magic byte.
    #[error("missing or mismatched magic byte")]
    BadMagic,

    /// Unknown or unsupported message type byte / record tag.
    #[error("unknown message type: 0x{0:02x}")]
    UnknownType(u8),

    /// Buffer too short for the expected fields.
    #[error("buffer truncated")]
    Truncated,

    /// A field failed to parse (non-decimal, malformed symbol, wrong arity).
    #[error("invalid field: {0}")]
    ParseField(&'static str),

    /// Side byte/char other than `'B'` / `'S'`.
    #[error("unknown side: {0:?}")]
    UnknownSide(char),
}
