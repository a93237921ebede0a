//! Error types for MRIM wire decoding and encoding.

use thiserror::Error;

use crate::cursor::IntKind;

/// Errors raised while parsing or building MRIM packets.
///
/// Everything here is a property of the bytes on the wire. None of these
/// errors is retryable: the same input always fails the same way.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Buffer shorter than a full header
    #[error("frame too short: expected at least {expected} bytes, got {actual}")]
    FrameTooShort {
        /// Minimum number of bytes required
        expected: usize,
        /// Bytes actually available
        actual: usize,
    },

    /// First four bytes are not the MRIM magic
    #[error("invalid magic number: {0:#010x}")]
    InvalidMagic(u32),

    /// The 16 trailing header bytes carry data
    #[error("reserved header bytes are not zero")]
    ReservedNotZero,

    /// Declared payload length disagrees with the frame size
    #[error("payload length mismatch: header declares {declared} bytes, frame carries {actual}")]
    LengthMismatch {
        /// Length from the header
        declared: usize,
        /// Bytes present after the header
        actual: usize,
    },

    /// Declared payload length exceeds the protocol limit
    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge {
        /// Declared or actual size
        size: usize,
        /// Maximum allowed size
        max: usize,
    },

    /// Command code with no known body layout
    #[error("unknown opcode: {0:#06x}")]
    UnknownOpcode(u32),

    /// Read past the end of a cursor
    #[error("unexpected end of buffer: need {needed} bytes at offset {offset}, {available} available")]
    UnexpectedEnd {
        /// Cursor offset at the time of the read
        offset: usize,
        /// Bytes the read required
        needed: usize,
        /// Bytes left in the buffer
        available: usize,
    },

    /// Seek target outside `[0, len]`
    #[error("seek out of bounds: position {position} outside buffer of {len} bytes")]
    SeekOutOfBounds {
        /// Absolute position the seek resolved to
        position: i64,
        /// Buffer length
        len: usize,
    },

    /// Shrink by more bytes than the buffer holds
    #[error("cannot shrink buffer of {len} bytes by {count}")]
    ShrinkTooLarge {
        /// Buffer length
        len: usize,
        /// Requested shrink
        count: usize,
    },

    /// Grow by more bytes than can be allocated
    #[error("cannot grow buffer of {len} bytes by {count}")]
    GrowTooLarge {
        /// Buffer length
        len: usize,
        /// Requested growth
        count: usize,
    },

    /// Integer does not fit the requested wire width
    #[error("value {value} does not fit in {kind:?}")]
    ValueOutOfRange {
        /// Value that was written
        value: i64,
        /// Target integer kind
        kind: IntKind,
    },

    /// String contains characters outside windows-1251
    #[error("string is not representable in windows-1251: {0:?}")]
    Unencodable(String),
}

/// Result alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;
