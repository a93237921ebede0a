//! `CS_PING`: keep-alive, never answered.

use mrim_proto::Packet;

use super::{CommandError, CommandOutcome};

/// Accept a keep-alive.
pub fn execute(_request: &Packet) -> Result<CommandOutcome, CommandError> {
    Ok(CommandOutcome::Handled)
}
