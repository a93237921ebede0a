//! Per-connection state machine.
//!
//! A `Connection` owns the reassembly buffer for one TCP peer and tracks
//! where the peer is in the session lifecycle. It performs no I/O: the
//! runtime feeds it bytes with [`Connection::receive`], asks
//! [`Connection::admit`] whether a decoded command may run, and reports what
//! it sent with [`Connection::on_sent`].
//!
//! # State Machine
//!
//! ```text
//! ┌──────────────┐ HELLO_ACK sent ┌─────────┐ LOGIN_ACK sent ┌───────────────┐
//! │ AwaitingHello│───────────────>│ Greeted │───────────────>│ Authenticated │
//! └──────────────┘                └─────────┘                └───────────────┘
//!        │                             │                             │
//!        │           close / fatal error (any state)                 │
//!        └─────────────────────────────┼─────────────────────────────┘
//!                                      ↓
//!                                 ┌────────┐
//!                                 │ Closed │
//!                                 └────────┘
//! ```
//!
//! Transitions follow what the server *sent*, not what the client asked
//! for: a rejected login leaves the connection `Greeted`.

use std::net::SocketAddr;

use mrim_proto::{Opcode, Packet};

use crate::{
    error::ConnectionError,
    framer::{FrameEvent, Framer},
};

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Connected, no `CS_HELLO` acknowledged yet
    AwaitingHello,
    /// `SC_HELLO_ACK` sent, not logged in
    Greeted,
    /// `SC_LOGIN_ACK` sent
    Authenticated,
    /// No further input is processed
    Closed,
}

/// One client connection.
///
/// # Invariants
///
/// - The framer belongs to this connection alone and is reset when the
///   connection closes, so no partial frame outlives it.
/// - State only moves forward: `AwaitingHello` → `Greeted` →
///   `Authenticated`, with `Closed` reachable from anywhere.
#[derive(Debug)]
pub struct Connection {
    id: u64,
    peer: SocketAddr,
    state: ConnectionState,
    framer: Framer,
}

impl Connection {
    /// New connection in [`ConnectionState::AwaitingHello`].
    pub fn new(id: u64, peer: SocketAddr) -> Self {
        Self { id, peer, state: ConnectionState::AwaitingHello, framer: Framer::new() }
    }

    /// Runtime-assigned connection id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Remote socket address.
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Remote TCP port.
    pub fn remote_port(&self) -> u16 {
        self.peer.port()
    }

    /// Current state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Whether a login has been acknowledged.
    pub fn is_authenticated(&self) -> bool {
        self.state == ConnectionState::Authenticated
    }

    /// Whether the connection has been closed.
    pub fn is_closed(&self) -> bool {
        self.state == ConnectionState::Closed
    }

    /// Feed inbound bytes.
    ///
    /// Returns the next complete packet, if the bytes finished one. At most
    /// one packet is produced per call; bytes past its end stay buffered.
    ///
    /// # Errors
    ///
    /// - `ConnectionError::InvalidState` if the connection is closed
    /// - `ConnectionError::Framing` if the stream is not MRIM (buffer
    ///   discarded)
    /// - `ConnectionError::Protocol` if a complete frame fails to decode
    pub fn receive(&mut self, chunk: &[u8]) -> Result<Option<Packet>, ConnectionError> {
        if self.is_closed() {
            return Err(ConnectionError::InvalidState { state: self.state, operation: "receive" });
        }

        match self.framer.write(chunk) {
            FrameEvent::NeedMore => Ok(None),
            FrameEvent::Malformed(err) => Err(err.into()),
            FrameEvent::Packet(raw) => Ok(Some(Packet::decode(&raw)?)),
        }
    }

    /// Check that `packet` may be dispatched in the current state.
    ///
    /// Only the request opcodes are gated. Anything else is left for the
    /// executor, which rejects what it does not know.
    ///
    /// # Errors
    ///
    /// - `ConnectionError::InvalidState` if the connection is closed
    /// - `ConnectionError::UnexpectedCommand` for a repeated `CS_HELLO`, a
    ///   command before `CS_HELLO`, or `CS_LOGIN2` outside `Greeted`
    pub fn admit(&self, packet: &Packet) -> Result<(), ConnectionError> {
        use ConnectionState::{Authenticated, AwaitingHello, Closed, Greeted};

        let allowed = match (self.state, packet.opcode()) {
            (Closed, _) => {
                return Err(ConnectionError::InvalidState { state: Closed, operation: "dispatch" });
            },
            (AwaitingHello, Some(Opcode::Hello))
            | (Greeted, Some(Opcode::Login2))
            | (Greeted | Authenticated, Some(Opcode::Ping)) => true,
            (_, Some(op)) => !op.is_request(),
            (_, None) => true,
        };

        if allowed {
            Ok(())
        } else {
            Err(ConnectionError::UnexpectedCommand {
                state: self.state,
                opcode: packet.header.command(),
            })
        }
    }

    /// Record packets handed to the transport and advance the lifecycle.
    ///
    /// Returns the new state if it changed.
    pub fn on_sent(&mut self, packets: &[Packet]) -> Option<ConnectionState> {
        let before = self.state;

        for packet in packets {
            self.state = match (self.state, packet.opcode()) {
                (ConnectionState::AwaitingHello, Some(Opcode::HelloAck)) => ConnectionState::Greeted,
                (ConnectionState::Greeted, Some(Opcode::LoginAck)) => ConnectionState::Authenticated,
                (state, _) => state,
            };
        }

        (self.state != before).then_some(self.state)
    }

    /// Close the connection and drop any partially received frame.
    pub fn close(&mut self) {
        self.state = ConnectionState::Closed;
        self.framer.reset();
    }

    /// Bytes held by the framer.
    pub fn buffered_len(&self) -> usize {
        self.framer.buffered_len()
    }
}
