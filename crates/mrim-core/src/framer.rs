//! Stream reassembly.
//!
//! TCP delivers bytes, not packets. The `Framer` accumulates inbound chunks
//! for one connection and hands out complete raw frames, one per call to
//! [`Framer::write`]. It owns no socket and performs no decoding beyond the
//! two header fields it needs for delimiting (magic and payload length); the
//! full header is re-validated by [`mrim_proto::Packet::decode`].
//!
//! # State Machine
//!
//! ```text
//!            chunk == one whole frame
//!          ┌──────────────────────────┐
//!          │                          │
//!      ┌───┴──┐  partial frame   ┌────▼──────┐
//!  ───>│ Idle │─────────────────>│ Buffering │──┐ more bytes,
//!      └──▲───┘                  └────┬──────┘<─┘ still partial
//!         │   frame complete, or      │
//!         └───── bad magic / oversize ┘
//! ```
//!
//! Bytes that arrive after the end of a frame in the same chunk stay
//! buffered and are examined on the next `write`; at most one frame is
//! emitted per call.

use bytes::{Bytes, BytesMut};
use mrim_proto::PacketHeader;
use thiserror::Error;

/// Why a stream was rejected.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramingError {
    /// Frame does not start with the MRIM magic
    #[error("frame does not start with magic {magic:#010x}", magic = PacketHeader::MAGIC)]
    InvalidMagic,

    /// Declared payload exceeds the protocol limit
    #[error("declared payload of {0} bytes exceeds {max}", max = PacketHeader::MAX_PAYLOAD_SIZE)]
    PayloadTooLarge(u32),
}

/// Result of feeding one chunk to the framer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameEvent {
    /// No complete frame yet
    NeedMore,

    /// Stream is not MRIM; buffered bytes were discarded
    Malformed(FramingError),

    /// One complete raw frame (header + payload)
    Packet(Bytes),
}

/// Observable framer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramerState {
    /// Nothing buffered
    Idle,
    /// Holding part of a frame, or bytes that followed a frame
    Buffering,
}

/// Per-connection reassembly buffer.
///
/// # Invariants
///
/// - When buffering, the buffered bytes start with the magic (or a prefix of
///   it, if fewer than 4 bytes are held).
/// - A `Packet` event is exactly `44 + payload_len` bytes long.
/// - After `Malformed` or [`Framer::reset`] the framer is `Idle`.
#[derive(Debug, Default)]
pub struct Framer {
    buf: BytesMut,
}

impl Framer {
    /// Empty framer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    pub fn state(&self) -> FramerState {
        if self.buf.is_empty() { FramerState::Idle } else { FramerState::Buffering }
    }

    /// Bytes currently held.
    pub fn buffered_len(&self) -> usize {
        self.buf.len()
    }

    /// Discard any buffered bytes.
    pub fn reset(&mut self) {
        self.buf.clear();
    }

    /// Feed one inbound chunk.
    ///
    /// Returns exactly one event. An empty chunk re-examines whatever is
    /// already buffered.
    pub fn write(&mut self, chunk: &[u8]) -> FrameEvent {
        // Idle with a whole frame in hand: emit without copying into the buffer
        if self.buf.is_empty() {
            match delimit(chunk) {
                Ok(Some(len)) if len == chunk.len() => {
                    return FrameEvent::Packet(Bytes::copy_from_slice(chunk));
                },
                Ok(_) => {},
                Err(err) => return FrameEvent::Malformed(err),
            }
        }

        self.buf.extend_from_slice(chunk);

        match delimit(&self.buf) {
            Ok(Some(len)) => FrameEvent::Packet(self.buf.split_to(len).freeze()),
            Ok(None) => FrameEvent::NeedMore,
            Err(err) => {
                self.reset();
                FrameEvent::Malformed(err)
            },
        }
    }
}

/// Length of the frame at the start of `bytes`, `None` if incomplete.
fn delimit(bytes: &[u8]) -> Result<Option<usize>, FramingError> {
    let magic = PacketHeader::MAGIC.to_le_bytes();
    let prefix = bytes.len().min(magic.len());
    if bytes[..prefix] != magic[..prefix] {
        return Err(FramingError::InvalidMagic);
    }

    if bytes.len() < PacketHeader::SIZE {
        return Ok(None);
    }

    let mut raw_len = [0u8; 4];
    raw_len.copy_from_slice(&bytes[PacketHeader::PAYLOAD_LEN_RANGE]);
    let payload_len = u32::from_le_bytes(raw_len);
    if payload_len > PacketHeader::MAX_PAYLOAD_SIZE {
        return Err(FramingError::PayloadTooLarge(payload_len));
    }

    let frame_len = PacketHeader::SIZE + payload_len as usize;
    Ok((bytes.len() >= frame_len).then_some(frame_len))
}

#[cfg(test)]
mod tests {
    use mrim_proto::{BinaryCursor, Opcode, Packet};

    use super::*;

    fn frame(payload: &[u8]) -> Vec<u8> {
        let payload = (!payload.is_empty()).then(|| BinaryCursor::from_bytes(payload));
        Packet::new(PacketHeader::new(Opcode::Hello), payload).to_bytes().unwrap().to_vec()
    }

    #[test]
    fn whole_frame_in_one_chunk() {
        let raw = frame(&[1, 2, 3]);
        let mut framer = Framer::new();

        assert_eq!(framer.write(&raw), FrameEvent::Packet(Bytes::from(raw)));
        assert_eq!(framer.state(), FramerState::Idle);
    }

    #[test]
    fn frame_split_across_chunks() {
        let raw = frame(&[9; 20]);
        let mut framer = Framer::new();

        assert_eq!(framer.write(&raw[..50]), FrameEvent::NeedMore);
        assert_eq!(framer.state(), FramerState::Buffering);
        assert_eq!(framer.write(&raw[50..60]), FrameEvent::NeedMore);
        assert_eq!(framer.write(&raw[60..]), FrameEvent::Packet(Bytes::from(raw)));
        assert_eq!(framer.state(), FramerState::Idle);
    }

    #[test]
    fn header_split_across_chunks() {
        let raw = frame(&[]);
        let mut framer = Framer::new();

        assert_eq!(framer.write(&raw[..3]), FrameEvent::NeedMore);
        assert_eq!(framer.write(&raw[3..30]), FrameEvent::NeedMore);
        assert_eq!(framer.write(&raw[30..]), FrameEvent::Packet(Bytes::from(raw)));
    }

    #[test]
    fn bad_magic_is_malformed() {
        let mut raw = frame(&[]);
        raw[0] = 0x00;
        let mut framer = Framer::new();

        assert_eq!(framer.write(&raw), FrameEvent::Malformed(FramingError::InvalidMagic));
        assert_eq!(framer.state(), FramerState::Idle);
    }

    #[test]
    fn short_garbage_is_malformed() {
        let mut framer = Framer::new();
        assert_eq!(framer.write(b"GET"), FrameEvent::Malformed(FramingError::InvalidMagic));
    }

    #[test]
    fn oversized_payload_is_malformed() {
        let mut raw = frame(&[]);
        raw[16..20].copy_from_slice(&(PacketHeader::MAX_PAYLOAD_SIZE + 1).to_le_bytes());
        let mut framer = Framer::new();

        assert_eq!(
            framer.write(&raw),
            FrameEvent::Malformed(FramingError::PayloadTooLarge(PacketHeader::MAX_PAYLOAD_SIZE + 1))
        );
    }

    #[test]
    fn trailing_bytes_wait_for_next_write() {
        let first = frame(&[1]);
        let second = frame(&[2, 2]);
        let mut chunk = first.clone();
        chunk.extend_from_slice(&second);

        let mut framer = Framer::new();
        assert_eq!(framer.write(&chunk), FrameEvent::Packet(Bytes::from(first)));
        assert_eq!(framer.buffered_len(), second.len());

        assert_eq!(framer.write(&[]), FrameEvent::Packet(Bytes::from(second)));
        assert_eq!(framer.state(), FramerState::Idle);
    }

    #[test]
    fn trailing_garbage_is_caught_on_next_write() {
        let mut chunk = frame(&[]);
        chunk.extend_from_slice(b"junk");

        let mut framer = Framer::new();
        assert!(matches!(framer.write(&chunk), FrameEvent::Packet(_)));
        assert_eq!(framer.write(&[]), FrameEvent::Malformed(FramingError::InvalidMagic));
    }

    #[test]
    fn reset_discards_partial_frame() {
        let raw = frame(&[5; 8]);
        let mut framer = Framer::new();

        assert_eq!(framer.write(&raw[..10]), FrameEvent::NeedMore);
        framer.reset();
        assert_eq!(framer.state(), FramerState::Idle);
        assert_eq!(framer.write(&raw), FrameEvent::Packet(Bytes::from(raw)));
    }

    #[test]
    fn empty_write_when_idle() {
        let mut framer = Framer::new();
        assert_eq!(framer.write(&[]), FrameEvent::NeedMore);
        assert_eq!(framer.state(), FramerState::Idle);
    }
}
