//! Typed packet bodies.
//!
//! Headers are decoded eagerly; bodies are only parsed by the code that
//! needs them. `Payload` ties each body type to its opcode so handlers can
//! build replies without touching cursors directly.
//!
//! # Invariants
//!
//! Each variant maps to exactly one [`Opcode`] (enforced by match
//! exhaustiveness), and every known opcode has a variant.

pub mod contacts;
pub mod hello;
pub mod login;
pub mod mailbox;
pub mod user_info;

pub use contacts::ContactList;
pub use hello::HelloAck;
pub use login::Login;
pub use mailbox::MailboxStatus;
pub use user_info::UserInfo;

use crate::{
    BinaryCursor, Opcode, Packet, PacketHeader,
    errors::{ProtocolError, Result},
};

/// Body of any packet this server understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// `CS_HELLO` (no body)
    Hello,
    /// `SC_HELLO_ACK`
    HelloAck(HelloAck),
    /// `CS_PING` (no body)
    Ping,
    /// `CS_LOGIN2`
    Login(Login),
    /// `SC_LOGIN_ACK` (no body)
    LoginAck,
    /// `SC_LOGIN_REJ` (no body)
    LoginRej,
    /// `SC_CONTACT_LIST2`
    ContactList(ContactList),
    /// `SC_MAILBOX_STATUS`
    MailboxStatus(MailboxStatus),
    /// `SC_USER_INFO`
    UserInfo(UserInfo),
}

impl Payload {
    /// Opcode carrying this body.
    pub fn opcode(&self) -> Opcode {
        match self {
            Self::Hello => Opcode::Hello,
            Self::HelloAck(_) => Opcode::HelloAck,
            Self::Ping => Opcode::Ping,
            Self::Login(_) => Opcode::Login2,
            Self::LoginAck => Opcode::LoginAck,
            Self::LoginRej => Opcode::LoginRej,
            Self::ContactList(_) => Opcode::ContactList2,
            Self::MailboxStatus(_) => Opcode::MailboxStatus,
            Self::UserInfo(_) => Opcode::UserInfo,
        }
    }

    /// Encode the body. `None` for bodiless packets.
    pub fn encode(&self) -> Result<Option<BinaryCursor>> {
        let cursor = match self {
            Self::Hello | Self::Ping | Self::LoginAck | Self::LoginRej => return Ok(None),
            Self::HelloAck(ack) => ack.encode(),
            Self::Login(login) => login.encode()?,
            Self::ContactList(list) => list.encode()?,
            Self::MailboxStatus(status) => status.encode(),
            Self::UserInfo(info) => info.encode()?,
        };
        Ok(Some(cursor))
    }

    /// Parse a body for `opcode`.
    ///
    /// Bodies of bodiless opcodes are ignored rather than rejected.
    pub fn decode(opcode: Opcode, payload: Option<BinaryCursor>) -> Result<Self> {
        let mut cursor = payload.unwrap_or_default();
        Ok(match opcode {
            Opcode::Hello => Self::Hello,
            Opcode::Ping => Self::Ping,
            Opcode::LoginAck => Self::LoginAck,
            Opcode::LoginRej => Self::LoginRej,
            Opcode::HelloAck => Self::HelloAck(HelloAck::decode(&mut cursor)?),
            Opcode::Login2 => Self::Login(Login::decode(&mut cursor)?),
            Opcode::ContactList2 => Self::ContactList(ContactList::decode(&mut cursor)?),
            Opcode::MailboxStatus => Self::MailboxStatus(MailboxStatus::decode(&mut cursor)?),
            Opcode::UserInfo => Self::UserInfo(UserInfo::decode(&mut cursor)?),
        })
    }

    /// Parse the body of a decoded packet.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::UnknownOpcode` if the command code is not recognised
    /// - Any cursor error from the body parser
    pub fn from_packet(packet: Packet) -> Result<Self> {
        let opcode = packet.opcode().ok_or(ProtocolError::UnknownOpcode(packet.header.command()))?;
        Self::decode(opcode, packet.payload)
    }

    /// Build the reply packet for `request` carrying this body.
    pub fn into_reply(self, request: &PacketHeader) -> Result<Packet> {
        let payload = self.encode()?;
        Ok(Packet::reply(request, self.opcode(), payload))
    }

    /// Build a packet from `header`, overriding its command code.
    pub fn into_packet(self, mut header: PacketHeader) -> Result<Packet> {
        header.set_command(self.opcode().to_u32());
        let payload = self.encode()?;
        Ok(Packet::new(header, payload))
    }
}
