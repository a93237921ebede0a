//! Fuzz target for Packet::decode and payload parsing
//!
//! Feeds arbitrary bytes to the frame decoder, then to the typed payload
//! parser for whatever opcode the header claims.
//!
//! # Invariants
//!
//! - Never panic; every invalid input is an `Err`
//! - A decoded packet's payload length equals `raw.len() - 44`
//! - Re-encoding a decoded packet yields the same length

#![no_main]

use libfuzzer_sys::fuzz_target;
use mrim_proto::{Packet, PacketHeader, Payload};

fuzz_target!(|data: &[u8]| {
    let Ok(packet) = Packet::decode(data) else {
        return;
    };

    assert_eq!(packet.payload_bytes().len(), data.len() - PacketHeader::SIZE);
    assert_eq!(packet.encoded_len(), data.len());

    let _ = Payload::from_packet(packet);
});
