//! Command registry and executor.
//!
//! The opcode → command table is built once, at construction, and never
//! changes; connections share one executor behind an `Arc`. Execution
//! never fails: unknown opcodes and handler errors both come back as
//! [`Execution::Reject`], and the session driver decides what a rejection
//! costs the connection.

use std::collections::HashMap;

use mrim_core::Connection;
use mrim_proto::Packet;

use crate::{
    auth::Authenticator,
    commands::{self, Command, CommandError, CommandOutcome},
};

/// Why a request was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// No command is registered for this code
    UnknownCommand(u32),

    /// The handler raised an error
    HandlerFailed {
        /// Command that failed
        command: Command,
        /// What went wrong
        error: CommandError,
    },
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownCommand(code) => write!(f, "unknown command {code:#06x}"),
            Self::HandlerFailed { command, error } => write!(f, "{command:?} failed: {error}"),
        }
    }
}

/// Result of executing one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Execution {
    /// Handled; nothing to send
    NoResponse,

    /// Not handled; see the reason
    Reject(RejectReason),

    /// Send these packets, in order
    Respond(Vec<Packet>),
}

/// Dispatches requests to command handlers.
#[derive(Debug)]
pub struct CommandExecutor<A: Authenticator> {
    /// Opcode → command, fixed at construction
    commands: HashMap<u32, Command>,
    /// Credential check for `CS_LOGIN2`
    authenticator: A,
    /// Announced in `SC_HELLO_ACK`
    ping_interval_secs: u32,
}

impl<A: Authenticator> CommandExecutor<A> {
    /// Create an executor with every built-in command registered.
    pub fn new(authenticator: A, ping_interval_secs: u32) -> Self {
        let commands =
            Command::ALL.into_iter().map(|command| (command.opcode().to_u32(), command)).collect();

        Self { commands, authenticator, ping_interval_secs }
    }

    /// Command registered for `code`, if any.
    pub fn command(&self, code: u32) -> Option<Command> {
        self.commands.get(&code).copied()
    }

    /// Configured ping interval in seconds.
    pub fn ping_interval_secs(&self) -> u32 {
        self.ping_interval_secs
    }

    /// Authentication collaborator.
    pub fn authenticator(&self) -> &A {
        &self.authenticator
    }

    /// Run the command for `packet`.
    ///
    /// A handler that responds with an empty packet list is treated as
    /// handled with no response.
    pub async fn execute(&self, packet: &Packet, connection: &Connection) -> Execution {
        let code = packet.header.command();
        let Some(command) = self.command(code) else {
            return Execution::Reject(RejectReason::UnknownCommand(code));
        };

        let outcome = match command {
            Command::Hello => commands::hello::execute(packet, self.ping_interval_secs),
            Command::Ping => commands::ping::execute(packet),
            Command::Login => {
                commands::login::execute(packet, connection.peer(), &self.authenticator).await
            },
        };

        match outcome {
            Ok(CommandOutcome::Handled) => Execution::NoResponse,
            Ok(CommandOutcome::Respond(packets)) if packets.is_empty() => Execution::NoResponse,
            Ok(CommandOutcome::Respond(packets)) => Execution::Respond(packets),
            Err(error) => Execution::Reject(RejectReason::HandlerFailed { command, error }),
        }
    }
}
