//! Packet header with zero-copy parsing.
//!
//! The `PacketHeader` is the fixed 44-byte prefix of every MRIM packet. All
//! integers are little-endian. Fields are stored as raw byte arrays so the
//! struct has alignment 1 and can be read straight out of a receive buffer.

use std::{fmt, net::Ipv4Addr};

use zerocopy::{FromBytes, FromZeros, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::{
    Opcode,
    errors::{ProtocolError, Result},
};

/// Protocol version as carried in the header.
///
/// On the wire this is a single little-endian u32 with the major version in
/// the high 16 bits and the minor version in the low 16 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProtocolVersion {
    /// Major version
    pub major: u16,
    /// Minor version
    pub minor: u16,
}

impl ProtocolVersion {
    /// Version stamped on headers built from scratch.
    pub const DEFAULT: Self = Self::new(1, 22);

    /// Construct from components.
    pub const fn new(major: u16, minor: u16) -> Self {
        Self { major, minor }
    }

    /// Unpack the wire u32.
    pub const fn from_u32(raw: u32) -> Self {
        Self { major: (raw >> 16) as u16, minor: (raw & 0xFFFF) as u16 }
    }

    /// Pack into the wire u32.
    pub const fn to_u32(self) -> u32 {
        ((self.major as u32) << 16) | self.minor as u32
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Fixed 44-byte packet header (little-endian).
///
/// # Layout
///
/// ```text
///  0..4   magic          0xDEADBEEF
///  4..8   version        (major << 16) | minor
///  8..12  seq            client correlation id, echoed in replies
/// 12..16  command        opcode
/// 16..20  payload_len    bytes following the header
/// 20..24  from_addr      IPv4, informational
/// 24..28  from_port      informational
/// 28..44  reserved       must be zero
/// ```
///
/// # Security
///
/// Every 44-byte pattern is a valid `PacketHeader` value, so casting
/// untrusted bytes is sound. Semantic validation (magic, reserved bytes,
/// payload limit) happens in [`PacketHeader::from_bytes`]; a header obtained
/// any other way is unchecked.
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
pub struct PacketHeader {
    magic: [u8; 4],
    version: [u8; 4],
    seq: [u8; 4],
    pub(crate) command: [u8; 4],
    pub(crate) payload_len: [u8; 4],
    from_addr: [u8; 4],
    from_port: [u8; 4],
    reserved: [u8; 16],
}

impl PacketHeader {
    /// Size of the serialized header (44 bytes)
    pub const SIZE: usize = 44;

    /// Frame synchronisation marker
    pub const MAGIC: u32 = 0xDEAD_BEEF;

    /// Largest payload accepted from a peer (1 MiB)
    pub const MAX_PAYLOAD_SIZE: u32 = 1024 * 1024;

    /// Byte range of the payload length field.
    pub const PAYLOAD_LEN_RANGE: std::ops::Range<usize> = 16..20;

    /// Header for `opcode` with the default version and everything else zero.
    pub fn new(opcode: Opcode) -> Self {
        let mut header = Self::new_zeroed();
        header.magic = Self::MAGIC.to_le_bytes();
        header.set_version(ProtocolVersion::DEFAULT);
        header.set_command(opcode.to_u32());
        header
    }

    /// Header for a reply: same version and sequence number as `request`,
    /// new command code, no payload, zero source address.
    pub fn reply_to(request: &Self, opcode: Opcode) -> Self {
        let mut header = Self::new(opcode);
        header.set_version(request.version());
        header.set_seq(request.seq());
        header
    }

    /// Parse and validate a header from the start of `bytes`.
    ///
    /// Trailing bytes after the first 44 are ignored.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::FrameTooShort` if fewer than 44 bytes are given
    /// - `ProtocolError::InvalidMagic` if the magic is wrong
    /// - `ProtocolError::ReservedNotZero` if any reserved byte is set
    /// - `ProtocolError::PayloadTooLarge` if the declared payload exceeds
    ///   [`Self::MAX_PAYLOAD_SIZE`]
    ///
    /// # Security
    ///
    /// Cheapest checks run first. The reserved-byte check catches a stream
    /// that has slipped out of frame alignment even when the magic happens to
    /// line up.
    pub fn from_bytes(bytes: &[u8]) -> Result<&Self> {
        let header = Self::ref_from_prefix(bytes)
            .map_err(|_| ProtocolError::FrameTooShort {
                expected: Self::SIZE,
                actual: bytes.len(),
            })?
            .0;

        if header.magic() != Self::MAGIC {
            return Err(ProtocolError::InvalidMagic(header.magic()));
        }

        if header.reserved.iter().any(|&b| b != 0) {
            return Err(ProtocolError::ReservedNotZero);
        }

        if header.payload_len() > Self::MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::PayloadTooLarge {
                size: header.payload_len() as usize,
                max: Self::MAX_PAYLOAD_SIZE as usize,
            });
        }

        Ok(header)
    }

    /// Serialize to wire bytes.
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut arr = [0u8; Self::SIZE];
        arr.copy_from_slice(self.as_bytes());
        arr
    }

    /// Magic number.
    pub fn magic(&self) -> u32 {
        u32::from_le_bytes(self.magic)
    }

    /// Protocol version.
    pub fn version(&self) -> ProtocolVersion {
        ProtocolVersion::from_u32(u32::from_le_bytes(self.version))
    }

    /// Client-assigned sequence number.
    pub fn seq(&self) -> u32 {
        u32::from_le_bytes(self.seq)
    }

    /// Raw command code.
    pub fn command(&self) -> u32 {
        u32::from_le_bytes(self.command)
    }

    /// Command code as enum. `None` if unrecognized.
    pub fn opcode(&self) -> Option<Opcode> {
        Opcode::from_u32(self.command())
    }

    /// Declared payload length in bytes.
    pub fn payload_len(&self) -> u32 {
        u32::from_le_bytes(self.payload_len)
    }

    /// Informational source IPv4 address.
    pub fn source_ip(&self) -> Ipv4Addr {
        Ipv4Addr::from(u32::from_le_bytes(self.from_addr))
    }

    /// Informational source port.
    pub fn source_port(&self) -> u32 {
        u32::from_le_bytes(self.from_port)
    }

    /// Set protocol version.
    pub fn set_version(&mut self, version: ProtocolVersion) {
        self.version = version.to_u32().to_le_bytes();
    }

    /// Set sequence number.
    pub fn set_seq(&mut self, seq: u32) {
        self.seq = seq.to_le_bytes();
    }

    /// Set raw command code.
    pub fn set_command(&mut self, command: u32) {
        self.command = command.to_le_bytes();
    }

    /// Set declared payload length.
    pub fn set_payload_len(&mut self, len: u32) {
        self.payload_len = len.to_le_bytes();
    }

    /// Set the informational source address.
    pub fn set_source(&mut self, ip: Ipv4Addr, port: u32) {
        self.from_addr = u32::from(ip).to_le_bytes();
        self.from_port = port.to_le_bytes();
    }

    /// Zero the source address (server-generated packets).
    pub fn clear_source(&mut self) {
        self.from_addr = [0; 4];
        self.from_port = [0; 4];
    }
}

impl fmt::Debug for PacketHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PacketHeader")
            .field("magic", &format!("{:#010x}", self.magic()))
            .field("version", &self.version().to_string())
            .field("seq", &self.seq())
            .field("command", &format!("{:#06x}", self.command()))
            .field("payload_len", &self.payload_len())
            .field("source", &format!("{}:{}", self.source_ip(), self.source_port()))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    impl Arbitrary for PacketHeader {
        type Parameters = ();
        type Strategy = BoxedStrategy<Self>;

        fn arbitrary_with((): Self::Parameters) -> Self::Strategy {
            (
                any::<u16>(),                  // major
                any::<u16>(),                  // minor
                any::<u32>(),                  // seq
                any::<u32>(),                  // command
                0u32..=Self::MAX_PAYLOAD_SIZE, // payload_len
                any::<u32>(),                  // from_addr
                any::<u32>(),                  // from_port
            )
                .prop_map(|(major, minor, seq, command, payload_len, from_addr, from_port)| {
                    let mut header = Self::new_zeroed();
                    header.magic = Self::MAGIC.to_le_bytes();
                    header.set_version(ProtocolVersion::new(major, minor));
                    header.set_seq(seq);
                    header.set_command(command);
                    header.set_payload_len(payload_len);
                    header.set_source(Ipv4Addr::from(from_addr), from_port);
                    header
                })
                .boxed()
        }
    }

    fn valid_bytes() -> [u8; 44] {
        PacketHeader::new(Opcode::Hello).to_bytes()
    }

    #[test]
    fn header_size() {
        assert_eq!(std::mem::size_of::<PacketHeader>(), PacketHeader::SIZE);
        assert_eq!(PacketHeader::SIZE, 44);
    }

    #[test]
    fn wire_layout() {
        let mut header = PacketHeader::new(Opcode::Login2);
        header.set_seq(7);
        header.set_payload_len(3);
        header.set_source(Ipv4Addr::new(10, 0, 0, 1), 2041);

        let bytes = header.to_bytes();
        assert_eq!(bytes[0..4], [0xEF, 0xBE, 0xAD, 0xDE]);
        assert_eq!(bytes[4..8], [22, 0, 1, 0]);
        assert_eq!(bytes[8..12], [7, 0, 0, 0]);
        assert_eq!(bytes[12..16], [0x38, 0x10, 0, 0]);
        assert_eq!(bytes[16..20], [3, 0, 0, 0]);
        assert_eq!(bytes[20..24], [1, 0, 0, 10]);
        assert_eq!(bytes[24..28], 2041u32.to_le_bytes());
        assert!(bytes[28..44].iter().all(|&b| b == 0));
    }

    #[test]
    fn version_packing() {
        let version = ProtocolVersion::new(1, 22);
        assert_eq!(version.to_u32(), 0x0001_0016);
        assert_eq!(ProtocolVersion::from_u32(0x0001_0016), version);
        assert_eq!(version.to_string(), "1.22");
    }

    #[test]
    fn reply_echoes_version_and_seq() {
        let mut request = PacketHeader::new(Opcode::Hello);
        request.set_version(ProtocolVersion::new(1, 7));
        request.set_seq(42);
        request.set_payload_len(12);
        request.set_source(Ipv4Addr::LOCALHOST, 5000);

        let reply = PacketHeader::reply_to(&request, Opcode::HelloAck);
        assert_eq!(reply.version(), ProtocolVersion::new(1, 7));
        assert_eq!(reply.seq(), 42);
        assert_eq!(reply.opcode(), Some(Opcode::HelloAck));
        assert_eq!(reply.payload_len(), 0);
        assert_eq!(reply.source_ip(), Ipv4Addr::UNSPECIFIED);
        assert_eq!(reply.source_port(), 0);
    }

    proptest! {
        #[test]
        fn header_round_trip(header in any::<PacketHeader>()) {
            let bytes = header.to_bytes();
            let parsed = PacketHeader::from_bytes(&bytes).unwrap();
            prop_assert_eq!(&header, parsed);
        }

        #[test]
        fn header_accessors(header in any::<PacketHeader>()) {
            prop_assert_eq!(header.magic(), PacketHeader::MAGIC);
            prop_assert!(header.payload_len() <= PacketHeader::MAX_PAYLOAD_SIZE);
        }
    }

    #[test]
    fn reject_short_buffer() {
        let result = PacketHeader::from_bytes(&[0u8; 43]);
        assert_eq!(result, Err(ProtocolError::FrameTooShort { expected: 44, actual: 43 }));
    }

    #[test]
    fn reject_invalid_magic() {
        let mut buf = valid_bytes();
        buf[0..4].copy_from_slice(&[0xFF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(PacketHeader::from_bytes(&buf), Err(ProtocolError::InvalidMagic(0xFFFF_FFFF)));
    }

    #[test]
    fn reject_reserved_bytes() {
        for idx in 28..44 {
            let mut buf = valid_bytes();
            buf[idx] = 1;
            assert_eq!(PacketHeader::from_bytes(&buf), Err(ProtocolError::ReservedNotZero));
        }
    }

    #[test]
    fn reject_oversized_payload() {
        let mut buf = valid_bytes();
        buf[16..20].copy_from_slice(&(PacketHeader::MAX_PAYLOAD_SIZE + 1).to_le_bytes());
        assert!(matches!(
            PacketHeader::from_bytes(&buf),
            Err(ProtocolError::PayloadTooLarge { .. })
        ));
    }

    #[test]
    fn trailing_bytes_are_ignored() {
        let mut buf = valid_bytes().to_vec();
        buf.extend_from_slice(&[0xAA; 10]);
        assert!(PacketHeader::from_bytes(&buf).is_ok());
    }
}
