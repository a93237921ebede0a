//! Per-connection session driver.
//!
//! Ties one [`Connection`] (framing + lifecycle) to the shared
//! [`CommandExecutor`]. Like the core, it performs no I/O: every call returns
//! [`SessionAction`]s for the runtime to carry out, including log lines, so
//! the driver is tested without sockets or a subscriber.
//!
//! # Violation policy
//!
//! Malformed frames, commands the connection state does not admit, unknown
//! commands and handler failures are all protocol violations. Before login
//! they close the connection. After login they are logged and the connection
//! stays open.

use std::{net::SocketAddr, sync::Arc};

use bytes::{Bytes, BytesMut};
use mrim_core::{Connection, ConnectionError, ConnectionState};
use mrim_proto::Packet;

use crate::{
    auth::Authenticator,
    executor::{CommandExecutor, Execution},
};

/// Log levels for session actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug information
    Debug,
    /// Informational message
    Info,
    /// Warning
    Warn,
    /// Error
    Error,
}

/// Actions the runtime must carry out, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// Write these bytes to the peer (one complete response set)
    Send(Bytes),

    /// Close the connection
    Close {
        /// Reason for closure
        reason: String,
    },

    /// Log a message
    Log {
        /// Log level
        level: LogLevel,
        /// Message to log
        message: String,
    },
}

/// Drives one client connection.
#[derive(Debug)]
pub struct Session<A: Authenticator> {
    connection: Connection,
    executor: Arc<CommandExecutor<A>>,
    /// The last call consumed a frame and more bytes are buffered
    pending: bool,
}

impl<A: Authenticator> Session<A> {
    /// Create a session for a freshly accepted connection.
    pub fn new(id: u64, peer: SocketAddr, executor: Arc<CommandExecutor<A>>) -> Self {
        Self { connection: Connection::new(id, peer), executor, pending: false }
    }

    /// Underlying connection state machine.
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// Whether buffered bytes may hold another frame.
    ///
    /// Several frames can arrive in one chunk. After carrying out the actions
    /// of a call, the runtime keeps calling [`Session::poll_buffered`] while
    /// this is true.
    pub fn has_pending_input(&self) -> bool {
        self.pending
    }

    /// Process the next frame already sitting in the reassembly buffer.
    pub async fn poll_buffered(&mut self) -> Vec<SessionAction> {
        self.handle_data(&[]).await
    }

    /// Process one inbound chunk.
    ///
    /// At most one command runs per call, and its responses are fully
    /// encoded before anything is handed out: either one `Send` with every
    /// response packet, or no `Send` at all. Bytes past the first frame stay
    /// buffered; see [`Session::has_pending_input`].
    pub async fn handle_data(&mut self, chunk: &[u8]) -> Vec<SessionAction> {
        self.pending = false;
        if self.connection.is_closed() {
            return Vec::new();
        }

        let actions = match self.connection.receive(chunk) {
            Ok(Some(packet)) => self.dispatch(&packet).await,
            Ok(None) => return Vec::new(),
            Err(err) => self.connection_error(&err),
        };

        self.pending = !self.connection.is_closed() && self.connection.buffered_len() > 0;
        actions
    }

    async fn dispatch(&mut self, packet: &Packet) -> Vec<SessionAction> {
        if let Err(err) = self.connection.admit(packet) {
            return self.connection_error(&err);
        }

        let execution = self.executor.execute(packet, &self.connection).await;
        match execution {
            Execution::NoResponse => vec![log(
                LogLevel::Debug,
                format!("command {:#06x} handled, no response", packet.header.command()),
            )],
            Execution::Reject(reason) => self.violation(format!("rejected: {reason}")),
            Execution::Respond(packets) => self.respond(&packets),
        }
    }

    /// The peer or the transport ended the connection.
    pub fn handle_closed(&mut self, reason: &str) -> Vec<SessionAction> {
        let was = self.connection.state();
        self.connection.close();
        self.pending = false;

        vec![log(LogLevel::Debug, format!("connection closed in state {was:?}: {reason}"))]
    }

    fn respond(&mut self, packets: &[Packet]) -> Vec<SessionAction> {
        let mut buf = BytesMut::with_capacity(packets.iter().map(Packet::encoded_len).sum());
        for packet in packets {
            if let Err(err) = packet.encode(&mut buf) {
                return self.violation(format!("cannot encode response: {err}"));
            }
        }

        let mut actions = vec![SessionAction::Send(buf.freeze())];
        if let Some(state) = self.connection.on_sent(packets) {
            actions.push(log(LogLevel::Info, format!("connection is now {state:?}")));
        }
        actions
    }

    fn connection_error(&mut self, err: &ConnectionError) -> Vec<SessionAction> {
        if err.is_fatal() {
            self.connection.close();
            return vec![SessionAction::Close { reason: err.to_string() }];
        }
        self.violation(err.to_string())
    }

    fn violation(&mut self, message: String) -> Vec<SessionAction> {
        if self.connection.is_authenticated() {
            return vec![log(LogLevel::Warn, format!("{message}; keeping authenticated connection"))];
        }

        self.connection.close();
        vec![log(LogLevel::Warn, message.clone()), SessionAction::Close { reason: message }]
    }
}

fn log(level: LogLevel, message: String) -> SessionAction {
    SessionAction::Log { level, message }
}
