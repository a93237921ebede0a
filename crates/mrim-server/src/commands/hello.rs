//! `CS_HELLO` → `SC_HELLO_ACK`.

use mrim_proto::{Packet, Payload, payloads::HelloAck};

use super::{CommandError, CommandOutcome};

/// Acknowledge the handshake and announce the ping interval.
///
/// The reply echoes the request's version and sequence number. Whether a
/// hello is allowed at all is decided by the connection before dispatch.
pub fn execute(request: &Packet, ping_interval_secs: u32) -> Result<CommandOutcome, CommandError> {
    let reply = Payload::HelloAck(HelloAck { ping_interval_secs }).into_reply(&request.header)?;
    Ok(CommandOutcome::Respond(vec![reply]))
}

#[cfg(test)]
mod tests {
    use mrim_proto::{Opcode, PacketHeader, ProtocolVersion};

    use super::*;

    #[test]
    fn echoes_version_and_seq() {
        let mut header = PacketHeader::new(Opcode::Hello);
        header.set_seq(9);
        header.set_version(ProtocolVersion::new(1, 7));

        let CommandOutcome::Respond(packets) = execute(&Packet::new(header, None), 30).unwrap()
        else {
            panic!("hello must respond");
        };

        assert_eq!(packets.len(), 1);
        assert_eq!(packets[0].opcode(), Some(Opcode::HelloAck));
        assert_eq!(packets[0].header.seq(), 9);
        assert_eq!(packets[0].header.version(), ProtocolVersion::new(1, 7));
        assert_eq!(packets[0].payload_bytes(), [30, 0, 0, 0]);
    }
}
