//! client-protocol
//!
//! Wire-level encoding/decoding for the matching engine client.
//!
//! This crate turns logical `client_core::Request` / `Event` values into
//! bytes and back again, in two forms:
//!
//! - [`binary_codec`] : compact binary protocol (magic byte + type byte)
//! - [`csv_codec`]    : line-oriented text protocol
//! - [`auto`]         : one-byte protocol discrimination between the two

pub mod auto;
pub mod binary_codec;
pub mod csv_codec;
pub mod error;
pub mod wire_types;

pub use auto::{decode_event_auto, is_binary};
pub use binary_codec::{
    decode_event_binary,
    decode_request_binary,
    encode_event_binary,
    encode_request_binary,
};
pub use csv_codec::{format_event_csv, format_request_csv, parse_event_line, parse_request_line};
pub use error::CodecError;
