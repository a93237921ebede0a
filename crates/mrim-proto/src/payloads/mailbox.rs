//! `SC_MAILBOX_STATUS` body.

use crate::{BinaryCursor, errors::Result};

/// Unread mail counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MailboxStatus {
    /// Unread messages
    pub unread: u32,
}

impl MailboxStatus {
    /// Encode as a 4-byte little-endian integer.
    pub fn encode(&self) -> BinaryCursor {
        let mut cursor = BinaryCursor::new();
        cursor.write_u32(self.unread);
        cursor
    }

    /// Decode from a payload cursor.
    pub fn decode(cursor: &mut BinaryCursor) -> Result<Self> {
        Ok(Self { unread: cursor.read_u32()? })
    }
}
