//! Handshake payloads.

use crate::{BinaryCursor, errors::Result};

/// `SC_HELLO_ACK` body: how often the client should ping, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HelloAck {
    /// Ping interval in seconds
    pub ping_interval_secs: u32,
}

impl HelloAck {
    /// Encode as a 4-byte little-endian integer.
    pub fn encode(&self) -> BinaryCursor {
        let mut cursor = BinaryCursor::new();
        cursor.write_u32(self.ping_interval_secs);
        cursor
    }

    /// Decode from a payload cursor.
    pub fn decode(cursor: &mut BinaryCursor) -> Result<Self> {
        Ok(Self { ping_interval_secs: cursor.read_u32()? })
    }
}
