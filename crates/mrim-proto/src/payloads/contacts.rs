//! `SC_CONTACT_LIST2` body.

use crate::{BinaryCursor, errors::Result};

/// Contact list header.
///
/// Only the empty list is ever sent. The two masks describe the field types
/// of each group and contact record (`u` = u32, `s` = string), which clients
/// need even when there are no records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactList {
    /// Result code, 0 = OK
    pub status: u32,
    /// Number of group records that follow
    pub group_count: u32,
    /// Field layout of a group record
    pub group_mask: String,
    /// Field layout of a contact record
    pub contact_mask: String,
}

impl ContactList {
    /// Status code for a successful list.
    pub const STATUS_OK: u32 = 0;

    /// Group record layout: flags, name.
    pub const GROUP_MASK: &'static str = "us";

    /// Contact record layout: flags, group, address, nickname, server flags,
    /// status, phone.
    pub const CONTACT_MASK: &'static str = "uussuus";

    /// List with no groups and no contacts.
    pub fn empty() -> Self {
        Self {
            status: Self::STATUS_OK,
            group_count: 0,
            group_mask: Self::GROUP_MASK.to_string(),
            contact_mask: Self::CONTACT_MASK.to_string(),
        }
    }

    /// Encode the list header.
    pub fn encode(&self) -> Result<BinaryCursor> {
        let mut cursor = BinaryCursor::new();
        cursor.write_u32(self.status);
        cursor.write_u32(self.group_count);
        cursor.write_string(&self.group_mask)?;
        cursor.write_string(&self.contact_mask)?;
        Ok(cursor)
    }

    /// Decode the list header.
    pub fn decode(cursor: &mut BinaryCursor) -> Result<Self> {
        Ok(Self {
            status: cursor.read_u32()?,
            group_count: cursor.read_u32()?,
            group_mask: cursor.read_string()?,
            contact_mask: cursor.read_string()?,
        })
    }
}
