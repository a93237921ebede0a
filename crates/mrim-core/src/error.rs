//! Error types for the MRIM connection core.
//!
//! Framing errors come from the stream reassembler, protocol errors from
//! packet decoding, and state errors from the connection lifecycle. Whether
//! an error closes the connection is decided by the caller from
//! [`ConnectionError::is_fatal`] and the authentication state.

use mrim_proto::ProtocolError;
use thiserror::Error;

use crate::{connection::ConnectionState, framer::FramingError};

/// Errors that can occur while driving a connection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// Inbound byte stream is not MRIM
    #[error("framing error: {0}")]
    Framing(#[from] FramingError),

    /// Complete frame failed structural decode
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Known command arrived in a state that does not accept it
    #[error("unexpected command {opcode:#06x} in state {state:?}")]
    UnexpectedCommand {
        /// State when the command arrived
        state: ConnectionState,
        /// Raw command code
        opcode: u32,
    },

    /// Operation on a connection that can no longer perform it
    #[error("invalid state: cannot {operation} in {state:?}")]
    InvalidState {
        /// Current state
        state: ConnectionState,
        /// Operation that was attempted
        operation: &'static str,
    },
}

impl ConnectionError {
    /// Returns true if the connection must close regardless of its
    /// authentication state.
    ///
    /// Framing errors leave the byte stream unusable only if reassembly could
    /// not recover; the framer discards its buffer on error, so an
    /// authenticated connection may keep going. Only operating on a closed
    /// connection is unconditionally fatal.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::InvalidState { state: ConnectionState::Closed, .. })
    }
}
