//! Command handlers.
//!
//! One module per request opcode. Handlers are plain functions: they get the
//! request and whatever collaborators they need, and return what should go
//! back on the wire. They never write to a socket and never log; the
//! executor and session driver do both.

pub mod hello;
pub mod login;
pub mod ping;

use mrim_proto::{Opcode, Packet, ProtocolError};
use thiserror::Error;

use crate::auth::AuthError;

/// What a handler produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Request handled, nothing to send
    Handled,

    /// Response packets, in send order
    Respond(Vec<Packet>),
}

/// Errors raised inside a handler.
///
/// The executor turns every one of these into a reject; none reach the
/// transport.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Request body missing for an opcode that requires one
    #[error("{0:?} request has no payload")]
    MissingPayload(Opcode),

    /// Request body or response could not be (de)serialized
    #[error("payload error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Authentication collaborator failed
    #[error("authentication failed: {0}")]
    Auth(#[from] AuthError),
}

/// Handler bound to an opcode in the executor's table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// `CS_HELLO`
    Hello,
    /// `CS_PING`
    Ping,
    /// `CS_LOGIN2`
    Login,
}

impl Command {
    /// Every command the server handles.
    pub const ALL: [Self; 3] = [Self::Hello, Self::Ping, Self::Login];

    /// Request opcode this command answers.
    pub const fn opcode(self) -> Opcode {
        match self {
            Self::Hello => Opcode::Hello,
            Self::Ping => Opcode::Ping,
            Self::Login => Opcode::Login2,
        }
    }
}
