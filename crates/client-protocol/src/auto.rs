//! Automatic protocol discrimination.
//!
//! Every binary frame starts with the magic byte `0x4D` (`'M'`), and no
//! event record in the text form starts with it (those start with
//! `A X T B R`). One byte is therefore enough to classify a payload.

use client_core::Event;

use crate::binary_codec::decode_event_binary;
use crate::csv_codec::parse_event_line;
use crate::error::CodecError;
use crate::wire_types::MAGIC;

/// True when `buf` should be decoded as a binary frame.
pub fn is_binary(buf: &[u8]) -> bool {
    buf.first() == Some(&MAGIC)
}

/// Decode one received payload as an event, picking the codec by the
/// leading byte. A non-binary payload is decoded as one CSV record,
/// stripping a single trailing `\n` if present.
pub fn decode_event_auto(buf: &[u8]) -> Result<Event, CodecError> {
    if buf.is_empty() {
        return Err(CodecError::Truncated);
    }

    if is_binary(buf) {
        return decode_event_binary(buf);
    }

    let buf = match buf.last() {
        Some(b'\n') => &buf[..buf.len() - 1],
        _ => buf,
    };
    let line = std::str::from_utf8(buf).map_err(|_| CodecError::ParseField("utf-8"))?;
    parse_event_line(line)
}
