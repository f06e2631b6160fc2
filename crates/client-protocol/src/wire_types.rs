//! Low-level wire constants and field helpers.
//!
//! This module defines:
//! - The magic byte and per-message type bytes.
//! - Fixed frame sizes for both directions.
//! - Helpers for the fixed 8-byte symbol field.
//!
//! The actual encode/decode logic lives in `binary_codec` / `csv_codec`.

use crate::error::CodecError;

/// Every binary message starts with this byte (`'M'`).
///
/// No CSV record starts with it, so a single byte is enough to classify
/// a received payload (see [`crate::auto`]).
pub const MAGIC: u8 = 0x4D;

/// Symbol field width on the binary wire.
pub const SYMBOL_WIRE_LEN: usize = 8;

/// Pad byte used when encoding symbols. Decode also accepts `0x20`.
pub const SYMBOL_PAD: u8 = 0x00;

/// Request message types (client → engine), second byte of each frame.
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RequestType {
    NewOrder = b'N',
    Cancel = b'C',
    Flush = b'F',
}

impl RequestType {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            b'N' => Some(RequestType::NewOrder),
            b'C' => Some(RequestType::Cancel),
            b'F' => Some(RequestType::Flush),
            _ => None,
        }
    }
}

/// Event message types (engine → client), second byte of each frame.
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EventType {
    Ack = b'A',
    CancelAck = b'X',
    Trade = b'T',
    TopOfBook = b'B',
    Reject = b'R',
}

impl EventType {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            b'A' => Some(EventType::Ack),
            b'X' => Some(EventType::CancelAck),
            b'T' => Some(EventType::Trade),
            b'B' => Some(EventType::TopOfBook),
            b'R' => Some(EventType::Reject),
            _ => None,
        }
    }
}

// Fixed frame sizes, magic + type byte included.
pub const NEW_ORDER_FRAME_LEN: usize = 27;
pub const CANCEL_FRAME_LEN: usize = 18;
pub const FLUSH_FRAME_LEN: usize = 2;
pub const ACK_FRAME_LEN: usize = 18;
pub const CANCEL_ACK_FRAME_LEN: usize = 18;
pub const TRADE_FRAME_LEN: usize = 34;
pub const TOP_OF_BOOK_FRAME_LEN: usize = 20;
pub const REJECT_FRAME_LEN: usize = 19;

/// Encode a symbol into the fixed 8-byte field, right-padded with
/// [`SYMBOL_PAD`].
///
/// Symbols must be 1..=8 bytes of ASCII.
pub fn pad_symbol(symbol: &str) -> Result<[u8; SYMBOL_WIRE_LEN], CodecError> {
    let bytes = symbol.as_bytes();
    if bytes.is_empty() || bytes.len() > SYMBOL_WIRE_LEN || !symbol.is_ascii() {
        return Err(CodecError::ParseField("symbol"));
    }

    let mut field = [SYMBOL_PAD; SYMBOL_WIRE_LEN];
    field[..bytes.len()].copy_from_slice(bytes);
    Ok(field)
}

/// Decode the fixed 8-byte symbol field, stripping trailing padding.
///
/// Both `0x00` and `0x20` are accepted as padding (different engine builds
/// pad differently); the remaining prefix must be non-empty ASCII.
pub fn unpad_symbol(field: &[u8]) -> Result<String, CodecError> {
    if field.len() < SYMBOL_WIRE_LEN {
        return Err(CodecError::Truncated);
    }

    let mut end = SYMBOL_WIRE_LEN;
    while end > 0 && (field[end - 1] == 0x00 || field[end - 1] == 0x20) {
        end -= 1;
    }

    let trimmed = &field[..end];
    if trimmed.is_empty() || !trimmed.is_ascii() {
        return Err(CodecError::ParseField("symbol"));
    }

    Ok(std::str::from_utf8(trimmed)
        .map_err(|_| CodecError::ParseField("symbol"))?
        .to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_round_trips_with_nul_padding() {
        let field = pad_symbol("IBM").unwrap();
        assert_eq!(&field, b"IBM\x00\x00\x00\x00\x00");
        assert_eq!(unpad_symbol(&field).unwrap(), "IBM");
    }

    #[test]
    fn symbol_decode_accepts_space_padding() {
        assert_eq!(unpad_symbol(b"IBM     ").unwrap(), "IBM");
        assert_eq!(unpad_symbol(b"GOOG\x00\x00\x00\x00").unwrap(), "GOOG");
    }

    #[test]
    fn symbol_rejects_empty_and_oversized() {
        assert_eq!(pad_symbol(""), Err(CodecError::ParseField("symbol")));
        assert_eq!(pad_symbol("TOOLONGXX"), Err(CodecError::ParseField("symbol")));
        assert_eq!(
            unpad_symbol(b"\x00\x00\x00\x00\x00\x00\x00\x00"),
            Err(CodecError::ParseField("symbol"))
        );
    }

    #[test]
    fn eight_char_symbol_uses_the_whole_field() {
        let field = pad_symbol("ABCDEFGH").unwrap();
        assert_eq!(&field, b"ABCDEFGH");
        assert_eq!(unpad_symbol(&field).unwrap(), "ABCDEFGH");
    }
}
