//! Packet type combining header and payload.
//!
//! A `Packet` is one MRIM message:
//! - 44-byte little-endian header
//! - optional payload, held in a [`BinaryCursor`] for structured access
//!
//! [`Packet::decode`] and [`Packet::encode`] are the only places raw frames
//! turn into packets and back.

use bytes::{BufMut, Bytes, BytesMut};

use crate::{
    BinaryCursor, Opcode, PacketHeader,
    errors::{ProtocolError, Result},
};

/// Complete MRIM packet.
///
/// Layout on the wire:
/// `[PacketHeader: 44 bytes] + [payload: header.payload_len() bytes]`
///
/// # Invariants
///
/// - A decoded packet has `payload_len() == raw.len() - 44` and its payload
///   cursor positioned at offset 0.
/// - An empty payload is represented as `None`, never as an empty cursor.
/// - The header's `payload_len` of an outbound packet is not trusted: it is
///   recomputed from the payload on [`Packet::encode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Packet header
    pub header: PacketHeader,

    /// Payload, if any
    pub payload: Option<BinaryCursor>,
}

impl Packet {
    /// Assemble a packet. An empty payload cursor is stored as `None`.
    pub fn new(header: PacketHeader, payload: Option<BinaryCursor>) -> Self {
        let payload = payload.filter(|cursor| !cursor.is_empty());
        Self { header, payload }
    }

    /// Reply to `request`: echoes version and sequence number.
    pub fn reply(request: &PacketHeader, opcode: Opcode, payload: Option<BinaryCursor>) -> Self {
        Self::new(PacketHeader::reply_to(request, opcode), payload)
    }

    /// Command code as enum. `None` if unrecognized.
    pub fn opcode(&self) -> Option<Opcode> {
        self.header.opcode()
    }

    /// Payload bytes (empty slice if there is no payload).
    pub fn payload_bytes(&self) -> &[u8] {
        match &self.payload {
            Some(cursor) => cursor.as_bytes(),
            None => &[],
        }
    }

    /// Decode one complete raw frame.
    ///
    /// The header is fully re-validated here; this function does not rely
    /// on whoever delimited `raw` having checked anything.
    ///
    /// # Errors
    ///
    /// - Any header error from [`PacketHeader::from_bytes`]
    /// - `ProtocolError::LengthMismatch` if `raw` is not exactly
    ///   `44 + payload_len` bytes long
    pub fn decode(raw: &[u8]) -> Result<Self> {
        let header = *PacketHeader::from_bytes(raw)?;

        let declared = header.payload_len() as usize;
        let actual = raw.len() - PacketHeader::SIZE;
        if declared != actual {
            return Err(ProtocolError::LengthMismatch { declared, actual });
        }

        let payload = (declared > 0).then(|| BinaryCursor::from_bytes(&raw[PacketHeader::SIZE..]));

        Ok(Self { header, payload })
    }

    /// Encode into `dst`.
    ///
    /// Writes the header with `payload_len` recomputed and the source
    /// address zeroed, then the payload bytes.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::PayloadTooLarge` if the payload exceeds
    ///   [`PacketHeader::MAX_PAYLOAD_SIZE`]
    pub fn encode(&self, dst: &mut impl BufMut) -> Result<()> {
        let payload = self.payload_bytes();

        let payload_len = u32::try_from(payload.len())
            .ok()
            .filter(|&len| len <= PacketHeader::MAX_PAYLOAD_SIZE)
            .ok_or(ProtocolError::PayloadTooLarge {
                size: payload.len(),
                max: PacketHeader::MAX_PAYLOAD_SIZE as usize,
            })?;

        let mut header = self.header;
        header.set_payload_len(payload_len);
        header.clear_source();

        dst.put_slice(&header.to_bytes());
        dst.put_slice(payload);

        Ok(())
    }

    /// Encode into a fresh buffer.
    pub fn to_bytes(&self) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        self.encode(&mut buf)?;
        Ok(buf.freeze())
    }

    /// Size of the encoded packet.
    pub fn encoded_len(&self) -> usize {
        PacketHeader::SIZE + self.payload_bytes().len()
    }
}
