//! Windows-1251 text codec.
//!
//! MRIM predates UTF-8 adoption: every string on the wire is a single-byte
//! windows-1251 sequence. Decoding never fails (unmapped bytes become
//! U+FFFD); encoding refuses characters the codepage cannot represent rather
//! than silently substituting them.

use encoding_rs::WINDOWS_1251;

use crate::errors::{ProtocolError, Result};

/// Encode `text` as windows-1251 bytes.
///
/// # Errors
///
/// - `ProtocolError::Unencodable` if any character has no windows-1251 byte
pub fn encode(text: &str) -> Result<Vec<u8>> {
    let (bytes, _, unmappable) = WINDOWS_1251.encode(text);
    if unmappable {
        return Err(ProtocolError::Unencodable(text.to_owned()));
    }

    debug_assert_eq!(bytes.len(), text.chars().count());
    Ok(bytes.into_owned())
}

/// Decode windows-1251 bytes, substituting U+FFFD for unmapped bytes.
pub fn decode(bytes: &[u8]) -> String {
    let (text, _) = WINDOWS_1251.decode_without_bom_handling(bytes);
    text.into_owned()
}

/// Whether `ch` survives an encode/decode round trip.
pub fn is_representable(ch: char) -> bool {
    let mut buf = [0u8; 4];
    let (_, _, unmappable) = WINDOWS_1251.encode(ch.encode_utf8(&mut buf));
    !unmappable
}
