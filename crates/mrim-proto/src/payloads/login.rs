//! `CS_LOGIN2` request body.

use crate::{BinaryCursor, errors::Result};

/// Login request.
///
/// Fields are consecutive on the wire, so each offset depends on the lengths
/// of the strings before it:
///
/// ```text
/// string login       "alice@mail.ru"
/// string password    cleartext
/// u32    status      initial presence
/// string user_agent  client identification
/// ```
///
/// Newer clients append further fields after `user_agent`; they are ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Login {
    /// Full login address
    pub login: String,
    /// Cleartext password
    pub password: String,
    /// Requested presence status
    pub status: u32,
    /// Client user agent
    pub user_agent: String,
}

impl Login {
    /// Part of the login before the first `@` (the whole login if absent).
    pub fn localpart(&self) -> &str {
        self.login.split_once('@').map_or(self.login.as_str(), |(local, _)| local)
    }

    /// Encode the request body.
    pub fn encode(&self) -> Result<BinaryCursor> {
        let mut cursor = BinaryCursor::new();
        cursor.write_string(&self.login)?;
        cursor.write_string(&self.password)?;
        cursor.write_u32(self.status);
        cursor.write_string(&self.user_agent)?;
        Ok(cursor)
    }

    /// Decode from a payload cursor.
    pub fn decode(cursor: &mut BinaryCursor) -> Result<Self> {
        let login = cursor.read_string()?;
        let password = cursor.read_string()?;
        let status = cursor.read_u32()?;
        let user_agent = cursor.read_string()?;

        Ok(Self { login, password, status, user_agent })
    }
}
