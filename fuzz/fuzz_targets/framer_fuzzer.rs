//! Fuzz target for stream reassembly
//!
//! Splits a stream of frames (valid, corrupted or random) at arbitrary points
//! and feeds the pieces through a `Framer`.
//!
//! # Strategy
//!
//! - Valid frames with arbitrary payloads, back to back
//! - Magic: valid, one byte flipped, random
//! - Payload length: honest, at the 1 MiB limit, just over, `u32::MAX`
//! - Chunk boundaries anywhere, including inside the header
//!
//! # Invariants
//!
//! - Never panic
//! - Every emitted packet is at least a header long and exactly
//!   `44 + payload_len` bytes
//! - After `Malformed` the framer holds no bytes

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use mrim_core::{FrameEvent, Framer};
use mrim_proto::{BinaryCursor, Opcode, Packet, PacketHeader};

#[derive(Debug, Clone, Arbitrary)]
struct Input {
    frames: Vec<FuzzFrame>,
    cuts: Vec<u16>,
}

#[derive(Debug, Clone, Arbitrary)]
struct FuzzFrame {
    seq: u32,
    payload: Vec<u8>,
    magic: MagicBytes,
    length: LengthField,
}

#[derive(Debug, Clone, Arbitrary)]
enum MagicBytes {
    Valid,
    Flipped(u8),
    Random([u8; 4]),
}

#[derive(Debug, Clone, Arbitrary)]
enum LengthField {
    Honest,
    AtMax,
    JustOverMax,
    MaxU32,
}

fn build(frame: &FuzzFrame) -> Vec<u8> {
    let mut header = PacketHeader::new(Opcode::Hello);
    header.set_seq(frame.seq);
    let payload = (!frame.payload.is_empty()).then(|| BinaryCursor::from_bytes(frame.payload.clone()));
    let Ok(bytes) = Packet::new(header, payload).to_bytes() else {
        return Vec::new();
    };
    let mut bytes = bytes.to_vec();

    match frame.magic {
        MagicBytes::Valid => {},
        MagicBytes::Flipped(idx) => bytes[(idx % 4) as usize] ^= 0x01,
        MagicBytes::Random(magic) => bytes[0..4].copy_from_slice(&magic),
    }

    let declared = match frame.length {
        LengthField::Honest => None,
        LengthField::AtMax => Some(PacketHeader::MAX_PAYLOAD_SIZE),
        LengthField::JustOverMax => Some(PacketHeader::MAX_PAYLOAD_SIZE + 1),
        LengthField::MaxU32 => Some(u32::MAX),
    };
    if let Some(len) = declared {
        bytes[PacketHeader::PAYLOAD_LEN_RANGE].copy_from_slice(&len.to_le_bytes());
    }

    bytes
}

fuzz_target!(|input: Input| {
    let stream: Vec<u8> = input.frames.iter().flat_map(build).collect();

    let mut framer = Framer::new();
    let mut start = 0;
    let mut cuts = input.cuts.iter().map(|&c| c as usize);

    while start < stream.len() {
        let len = cuts.next().unwrap_or(stream.len()).clamp(1, stream.len() - start);
        let chunk = &stream[start..start + len];
        start += len;

        match framer.write(chunk) {
            FrameEvent::Packet(raw) => {
                assert!(raw.len() >= PacketHeader::SIZE);
                let declared = u32::from_le_bytes([raw[16], raw[17], raw[18], raw[19]]);
                assert_eq!(raw.len(), PacketHeader::SIZE + declared as usize);
            },
            FrameEvent::Malformed(_) => assert_eq!(framer.buffered_len(), 0),
            FrameEvent::NeedMore => {},
        }
    }
});
