//! MRIM wire format.
//!
//! Everything needed to turn MRIM bytes into typed values and back, with no
//! I/O:
//!
//! - [`BinaryCursor`]: little-endian integers and windows-1251 strings
//! - [`PacketHeader`]: the fixed 44-byte header, parsed zero-copy
//! - [`Packet`]: header plus optional payload, with the frame-level
//!   [`Packet::decode`]/[`Packet::encode`] pair
//! - [`payloads`]: typed bodies for every packet the server handles
//!
//! Stream reassembly lives in `mrim-core`; this crate only ever sees
//! complete frames.

#![forbid(unsafe_code)]

pub mod codepage;
pub mod cursor;
pub mod errors;
pub mod header;
pub mod opcode;
pub mod packet;
pub mod payloads;

pub use cursor::{BinaryCursor, IntKind, Resize, SeekOrigin};
pub use errors::{ProtocolError, Result};
pub use header::{PacketHeader, ProtocolVersion};
pub use opcode::Opcode;
pub use packet::Packet;
pub use payloads::Payload;
