//! MRIM command codes.
//!
//! Client-to-server codes are requests; server-to-client codes are the
//! responses and unsolicited state packets sent after login.

/// Command codes understood or produced by this server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Opcode {
    /// `CS_HELLO`: first packet on every connection
    Hello = 0x1001,
    /// `SC_HELLO_ACK`: carries the ping interval
    HelloAck = 0x1002,
    /// `SC_LOGIN_ACK`: credentials accepted
    LoginAck = 0x1004,
    /// `SC_LOGIN_REJ`: credentials refused
    LoginRej = 0x1005,
    /// `CS_PING`: keep-alive
    Ping = 0x1006,
    /// `SC_USER_INFO`: key/value account attributes
    UserInfo = 0x1015,
    /// `SC_MAILBOX_STATUS`: unread mail counter
    MailboxStatus = 0x1033,
    /// `SC_CONTACT_LIST2`: groups and contacts
    ContactList2 = 0x1037,
    /// `CS_LOGIN2`: credentials, status and user agent
    Login2 = 0x1038,
}

impl Opcode {
    /// Every known opcode.
    pub const ALL: [Self; 9] = [
        Self::Hello,
        Self::HelloAck,
        Self::LoginAck,
        Self::LoginRej,
        Self::Ping,
        Self::UserInfo,
        Self::MailboxStatus,
        Self::ContactList2,
        Self::Login2,
    ];

    /// Parse a raw command code. `None` if unknown.
    pub fn from_u32(value: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.to_u32() == value)
    }

    /// Raw command code.
    pub const fn to_u32(self) -> u32 {
        self as u32
    }

    /// Whether clients send this code.
    pub const fn is_request(self) -> bool {
        matches!(self, Self::Hello | Self::Ping | Self::Login2)
    }
}

impl From<Opcode> for u32 {
    fn from(op: Opcode) -> Self {
        op.to_u32()
    }
}
