//! `SC_USER_INFO` body: ordered string key/value pairs.

use crate::{BinaryCursor, errors::Result};

/// Account attributes pushed to the client after login.
///
/// Encoded as consecutive `string key, string value` pairs with no count
/// prefix; the payload length delimits the list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserInfo {
    entries: Vec<(String, String)>,
}

impl UserInfo {
    /// Display name.
    pub const NICKNAME: &'static str = "MRIM.NICKNAME";
    /// Total messages in the mailbox.
    pub const MESSAGES_TOTAL: &'static str = "MESSAGES.TOTAL";
    /// Unread messages in the mailbox.
    pub const MESSAGES_UNREAD: &'static str = "MESSAGES.UNREAD";
    /// Address the server sees the client connecting from.
    pub const CLIENT_ENDPOINT: &'static str = "client.endpoint";

    /// Empty attribute set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attributes sent on login. The message counters are left empty, which
    /// clients read as a mailbox with no messages.
    pub fn for_session(nickname: &str, endpoint: &str) -> Self {
        let mut info = Self::new();
        info.set(Self::NICKNAME, nickname);
        info.set(Self::MESSAGES_TOTAL, "");
        info.set(Self::MESSAGES_UNREAD, "");
        info.set(Self::CLIENT_ENDPOINT, endpoint);
        info
    }

    /// Set `key`, replacing an existing value in place or appending.
    pub fn set(&mut self, key: &str, value: &str) {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => value.clone_into(v),
            None => self.entries.push((key.to_owned(), value.to_owned())),
        }
    }

    /// Value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    /// Pairs in wire order.
    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    /// Encode all pairs.
    pub fn encode(&self) -> Result<BinaryCursor> {
        let mut cursor = BinaryCursor::new();
        for (key, value) in &self.entries {
            cursor.write_string(key)?;
            cursor.write_string(value)?;
        }
        Ok(cursor)
    }

    /// Decode pairs until the cursor is exhausted.
    pub fn decode(cursor: &mut BinaryCursor) -> Result<Self> {
        let mut entries = Vec::new();
        while cursor.remaining() > 0 {
            let key = cursor.read_string()?;
            let value = cursor.read_string()?;
            entries.push((key, value));
        }
        Ok(Self { entries })
    }
}
