//! Positioned reader/writer over an owned byte buffer.
//!
//! `BinaryCursor` is how every MRIM payload is built and parsed: fixed-width
//! little-endian integers and length-prefixed windows-1251 strings, read or
//! written at a moving offset.
//!
//! # Invariants
//!
//! - `offset <= buf.len()` after every operation, successful or not.
//! - Writes never truncate: writing past the end grows the buffer with the
//!   written bytes (zero-filling any gap), reads past the end fail.

use crate::{
    codepage,
    errors::{ProtocolError, Result},
};

/// Integer widths supported on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntKind {
    /// Signed 8-bit
    I8,
    /// Unsigned 8-bit
    U8,
    /// Signed 16-bit little-endian
    I16,
    /// Unsigned 16-bit little-endian
    U16,
    /// Signed 32-bit little-endian
    I32,
    /// Unsigned 32-bit little-endian
    U32,
}

impl IntKind {
    /// Kind for a byte width and signedness. `None` for widths other than 1,
    /// 2 or 4.
    pub const fn new(width: usize, signed: bool) -> Option<Self> {
        match (width, signed) {
            (1, true) => Some(Self::I8),
            (1, false) => Some(Self::U8),
            (2, true) => Some(Self::I16),
            (2, false) => Some(Self::U16),
            (4, true) => Some(Self::I32),
            (4, false) => Some(Self::U32),
            _ => None,
        }
    }

    /// Encoded size in bytes.
    pub const fn width(self) -> usize {
        match self {
            Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::I32 | Self::U32 => 4,
        }
    }

    /// Whether the kind is two's-complement signed.
    pub const fn is_signed(self) -> bool {
        matches!(self, Self::I8 | Self::I16 | Self::I32)
    }

    fn contains(self, value: i64) -> bool {
        let (min, max) = match self {
            Self::I8 => (i64::from(i8::MIN), i64::from(i8::MAX)),
            Self::U8 => (0, i64::from(u8::MAX)),
            Self::I16 => (i64::from(i16::MIN), i64::from(i16::MAX)),
            Self::U16 => (0, i64::from(u16::MAX)),
            Self::I32 => (i64::from(i32::MIN), i64::from(i32::MAX)),
            Self::U32 => (0, i64::from(u32::MAX)),
        };
        (min..=max).contains(&value)
    }
}

/// Reference point for [`BinaryCursor::seek`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekOrigin {
    /// Absolute position from the first byte
    Start,
    /// Relative to the current offset (may be negative)
    Current,
    /// Counted back from the end of the buffer
    End,
}

/// Direction for [`BinaryCursor::resize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resize {
    /// Append zero bytes
    Grow,
    /// Drop bytes from the end
    Shrink,
}

/// Cursor over a growable byte buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BinaryCursor {
    buf: Vec<u8>,
    offset: usize,
}

impl BinaryCursor {
    /// Empty cursor at offset 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cursor over `len` zero bytes.
    pub fn zeroed(len: usize) -> Self {
        Self { buf: vec![0; len], offset: 0 }
    }

    /// Cursor over existing bytes, positioned at offset 0.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self { buf: bytes.into(), offset: 0 }
    }

    /// Buffer length in bytes.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether the buffer holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Current offset.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Bytes between the offset and the end of the buffer.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.offset
    }

    /// Whole buffer, independent of the offset.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consume the cursor, returning the buffer.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Read an integer of the given kind, widened to `i64`.
    pub fn read_int(&mut self, kind: IntKind) -> Result<i64> {
        match kind {
            IntKind::I8 => self.read_i8().map(i64::from),
            IntKind::U8 => self.read_u8().map(i64::from),
            IntKind::I16 => self.read_i16().map(i64::from),
            IntKind::U16 => self.read_u16().map(i64::from),
            IntKind::I32 => self.read_i32().map(i64::from),
            IntKind::U32 => self.read_u32().map(i64::from),
        }
    }

    /// Write `value` as the given kind.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::ValueOutOfRange` if `value` does not fit; nothing is
    ///   written in that case
    pub fn write_int(&mut self, kind: IntKind, value: i64) -> Result<()> {
        if !kind.contains(value) {
            return Err(ProtocolError::ValueOutOfRange { value, kind });
        }

        match kind {
            IntKind::I8 => self.write_i8(value as i8),
            IntKind::U8 => self.write_u8(value as u8),
            IntKind::I16 => self.write_i16(value as i16),
            IntKind::U16 => self.write_u16(value as u16),
            IntKind::I32 => self.write_i32(value as i32),
            IntKind::U32 => self.write_u32(value as u32),
        }
        Ok(())
    }

    /// Read one unsigned byte.
    pub fn read_u8(&mut self) -> Result<u8> {
        self.take::<1>().map(u8::from_le_bytes)
    }

    /// Read one signed byte.
    pub fn read_i8(&mut self) -> Result<i8> {
        self.take::<1>().map(i8::from_le_bytes)
    }

    /// Read a little-endian `u16`.
    pub fn read_u16(&mut self) -> Result<u16> {
        self.take::<2>().map(u16::from_le_bytes)
    }

    /// Read a little-endian `i16`.
    pub fn read_i16(&mut self) -> Result<i16> {
        self.take::<2>().map(i16::from_le_bytes)
    }

    /// Read a little-endian `u32`.
    pub fn read_u32(&mut self) -> Result<u32> {
        self.take::<4>().map(u32::from_le_bytes)
    }

    /// Read a little-endian `i32`.
    pub fn read_i32(&mut self) -> Result<i32> {
        self.take::<4>().map(i32::from_le_bytes)
    }

    /// Write one unsigned byte.
    pub fn write_u8(&mut self, value: u8) {
        self.put(&value.to_le_bytes());
    }

    /// Write one signed byte.
    pub fn write_i8(&mut self, value: i8) {
        self.put(&value.to_le_bytes());
    }

    /// Write a little-endian `u16`.
    pub fn write_u16(&mut self, value: u16) {
        self.put(&value.to_le_bytes());
    }

    /// Write a little-endian `i16`.
    pub fn write_i16(&mut self, value: i16) {
        self.put(&value.to_le_bytes());
    }

    /// Write a little-endian `u32`.
    pub fn write_u32(&mut self, value: u32) {
        self.put(&value.to_le_bytes());
    }

    /// Write a little-endian `i32`.
    pub fn write_i32(&mut self, value: i32) {
        self.put(&value.to_le_bytes());
    }

    /// Read `len` raw bytes.
    pub fn read_bytes(&mut self, len: usize) -> Result<&[u8]> {
        self.ensure_readable(len)?;
        let start = self.offset;
        self.offset += len;
        Ok(&self.buf[start..self.offset])
    }

    /// Write raw bytes.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.put(bytes);
    }

    /// Read a length-prefixed windows-1251 string.
    ///
    /// On error the offset is left where it was before the call.
    pub fn read_string(&mut self) -> Result<String> {
        let start = self.offset;
        let len = self.read_u32()? as usize;

        match self.read_bytes(len) {
            Ok(bytes) => Ok(codepage::decode(bytes)),
            Err(err) => {
                self.offset = start;
                Err(err)
            },
        }
    }

    /// Write a length-prefixed windows-1251 string.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::Unencodable` if `value` has characters outside the
    ///   codepage; nothing is written in that case
    pub fn write_string(&mut self, value: &str) -> Result<()> {
        let bytes = codepage::encode(value)?;
        let len = u32::try_from(bytes.len()).map_err(|_| ProtocolError::ValueOutOfRange {
            value: i64::try_from(bytes.len()).unwrap_or(i64::MAX),
            kind: IntKind::U32,
        })?;

        self.reserve_from_offset(4 + bytes.len());
        self.write_u32(len);
        self.put(&bytes);
        Ok(())
    }

    /// Move the offset. Returns the new absolute offset.
    ///
    /// For [`SeekOrigin::End`], `position` counts back from the end, so
    /// `seek(0, End)` lands at `len()`.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::SeekOutOfBounds` if the target is outside `[0, len]`;
    ///   the offset is unchanged
    pub fn seek(&mut self, position: i64, origin: SeekOrigin) -> Result<usize> {
        let len = self.buf.len() as i64;
        let target = match origin {
            SeekOrigin::Start => Some(position),
            SeekOrigin::Current => (self.offset as i64).checked_add(position),
            SeekOrigin::End => len.checked_sub(position),
        };

        match target {
            Some(target) if (0..=len).contains(&target) => {
                self.offset = target as usize;
                Ok(self.offset)
            },
            // Overflowing targets report the requested position
            _ => Err(ProtocolError::SeekOutOfBounds {
                position: target.unwrap_or(position),
                len: self.buf.len(),
            }),
        }
    }

    /// Grow the buffer with zero bytes or shrink it from the end.
    ///
    /// Shrinking below the offset pulls the offset back to the new end.
    pub fn resize(&mut self, direction: Resize, count: usize) -> Result<()> {
        match direction {
            Resize::Grow => {
                let len = self.buf.len();
                self.buf
                    .try_reserve_exact(count)
                    .map_err(|_| ProtocolError::GrowTooLarge { len, count })?;
                self.buf.resize(len + count, 0);
            },
            Resize::Shrink => {
                let len = self.buf.len();
                if count > len {
                    return Err(ProtocolError::ShrinkTooLarge { len, count });
                }
                self.buf.truncate(len - count);
                self.offset = self.offset.min(self.buf.len());
            },
        }
        Ok(())
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N]> {
        self.ensure_readable(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(&self.buf[self.offset..self.offset + N]);
        self.offset += N;
        Ok(out)
    }

    fn ensure_readable(&self, needed: usize) -> Result<()> {
        if needed > self.remaining() {
            return Err(ProtocolError::UnexpectedEnd {
                offset: self.offset,
                needed,
                available: self.remaining(),
            });
        }
        Ok(())
    }

    fn reserve_from_offset(&mut self, additional: usize) {
        let end = self.offset + additional;
        if end > self.buf.len() {
            self.buf.reserve(end - self.buf.len());
        }
    }

    fn put(&mut self, bytes: &[u8]) {
        let end = self.offset + bytes.len();
        if end > self.buf.len() {
            self.buf.resize(end, 0);
        }
        self.buf[self.offset..end].copy_from_slice(bytes);
        self.offset = end;

        debug_assert!(self.offset <= self.buf.len());
    }
}

impl From<Vec<u8>> for BinaryCursor {
    fn from(bytes: Vec<u8>) -> Self {
        Self::from_bytes(bytes)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn integers_are_little_endian() {
        let mut cursor = BinaryCursor::new();
        cursor.write_u32(0x0102_0304);
        cursor.write_u16(0x0506);
        cursor.write_i8(-1);

        assert_eq!(cursor.as_bytes(), [0x04, 0x03, 0x02, 0x01, 0x06, 0x05, 0xFF]);
        assert_eq!(cursor.offset(), 7);

        cursor.seek(0, SeekOrigin::Start).unwrap();
        assert_eq!(cursor.read_u32().unwrap(), 0x0102_0304);
        assert_eq!(cursor.read_u16().unwrap(), 0x0506);
        assert_eq!(cursor.read_i8().unwrap(), -1);
        assert_eq!(cursor.remaining(), 0);
    }

    #[test]
    fn read_past_end_fails_without_moving() {
        let mut cursor = BinaryCursor::from_bytes(vec![1, 2, 3]);
        let err = cursor.read_u32().unwrap_err();

        assert_eq!(err, ProtocolError::UnexpectedEnd { offset: 0, needed: 4, available: 3 });
        assert_eq!(cursor.offset(), 0);
    }

    #[test]
    fn write_int_checks_range() {
        let mut cursor = BinaryCursor::new();
        assert!(cursor.write_int(IntKind::U8, 255).is_ok());
        assert_eq!(
            cursor.write_int(IntKind::U8, 256),
            Err(ProtocolError::ValueOutOfRange { value: 256, kind: IntKind::U8 })
        );
        assert!(cursor.write_int(IntKind::I16, -32768).is_ok());
        assert!(cursor.write_int(IntKind::U32, -1).is_err());
        assert_eq!(cursor.len(), 3);
    }

    #[test]
    fn int_kind_from_width() {
        assert_eq!(IntKind::new(2, true), Some(IntKind::I16));
        assert_eq!(IntKind::new(4, false), Some(IntKind::U32));
        assert_eq!(IntKind::new(8, false), None);
        assert_eq!(IntKind::I32.width(), 4);
        assert!(!IntKind::U16.is_signed());
    }

    #[test]
    fn string_is_length_prefixed_cp1251() {
        let mut cursor = BinaryCursor::new();
        cursor.write_string("us").unwrap();
        cursor.write_string("ёж").unwrap();

        assert_eq!(cursor.as_bytes(), [2, 0, 0, 0, b'u', b's', 2, 0, 0, 0, 0xB8, 0xE6]);

        cursor.seek(0, SeekOrigin::Start).unwrap();
        assert_eq!(cursor.read_string().unwrap(), "us");
        assert_eq!(cursor.read_string().unwrap(), "ёж");
    }

    #[test]
    fn truncated_string_restores_offset() {
        let mut cursor = BinaryCursor::from_bytes(vec![10, 0, 0, 0, b'a']);
        assert!(matches!(cursor.read_string(), Err(ProtocolError::UnexpectedEnd { .. })));
        assert_eq!(cursor.offset(), 0);
    }

    #[test]
    fn unencodable_string_writes_nothing() {
        let mut cursor = BinaryCursor::new();
        assert!(cursor.write_string("☃").is_err());
        assert!(cursor.is_empty());
    }

    #[test]
    fn overwrite_in_the_middle_does_not_grow() {
        let mut cursor = BinaryCursor::zeroed(8);
        cursor.seek(2, SeekOrigin::Start).unwrap();
        cursor.write_u16(0xFFFF);
        assert_eq!(cursor.len(), 8);
        assert_eq!(cursor.as_bytes(), [0, 0, 0xFF, 0xFF, 0, 0, 0, 0]);
    }

    #[test]
    fn seek_origins() {
        let mut cursor = BinaryCursor::zeroed(10);
        assert_eq!(cursor.seek(4, SeekOrigin::Start).unwrap(), 4);
        assert_eq!(cursor.seek(-2, SeekOrigin::Current).unwrap(), 2);
        assert_eq!(cursor.seek(3, SeekOrigin::End).unwrap(), 7);
        assert_eq!(cursor.seek(0, SeekOrigin::End).unwrap(), 10);
        assert_eq!(cursor.seek(10, SeekOrigin::Start).unwrap(), 10);
    }

    #[test]
    fn seek_out_of_bounds() {
        let mut cursor = BinaryCursor::zeroed(4);
        cursor.seek(2, SeekOrigin::Start).unwrap();

        assert_eq!(
            cursor.seek(5, SeekOrigin::Start),
            Err(ProtocolError::SeekOutOfBounds { position: 5, len: 4 })
        );
        assert!(cursor.seek(-3, SeekOrigin::Current).is_err());
        assert!(cursor.seek(5, SeekOrigin::End).is_err());
        assert_eq!(cursor.offset(), 2);
    }

    #[test]
    fn resize_grow_and_shrink() {
        let mut cursor = BinaryCursor::from_bytes(vec![1, 2, 3, 4]);
        cursor.seek(0, SeekOrigin::End).unwrap();

        cursor.resize(Resize::Grow, 2).unwrap();
        assert_eq!(cursor.as_bytes(), [1, 2, 3, 4, 0, 0]);
        assert_eq!(cursor.offset(), 4);

        cursor.resize(Resize::Shrink, 3).unwrap();
        assert_eq!(cursor.as_bytes(), [1, 2, 3]);
        assert_eq!(cursor.offset(), 3);

        assert_eq!(
            cursor.resize(Resize::Shrink, 4),
            Err(ProtocolError::ShrinkTooLarge { len: 3, count: 4 })
        );
    }

    #[test]
    fn seek_extremes_fail_without_panicking() {
        let mut cursor = BinaryCursor::zeroed(4);
        cursor.seek(2, SeekOrigin::Start).unwrap();

        assert_eq!(
            cursor.seek(i64::MAX, SeekOrigin::Current),
            Err(ProtocolError::SeekOutOfBounds { position: i64::MAX, len: 4 })
        );
        assert_eq!(
            cursor.seek(i64::MIN, SeekOrigin::End),
            Err(ProtocolError::SeekOutOfBounds { position: i64::MIN, len: 4 })
        );
        assert!(cursor.seek(i64::MIN, SeekOrigin::Current).is_err());
        assert!(cursor.seek(i64::MAX, SeekOrigin::End).is_err());
        assert!(cursor.seek(i64::MIN, SeekOrigin::Start).is_err());
        assert_eq!(cursor.offset(), 2);
    }

    #[test]
    fn grow_beyond_address_space_fails() {
        let mut cursor = BinaryCursor::zeroed(4);

        assert_eq!(
            cursor.resize(Resize::Grow, usize::MAX),
            Err(ProtocolError::GrowTooLarge { len: 4, count: usize::MAX })
        );
        assert_eq!(cursor.len(), 4);
    }

    proptest! {
        #[test]
        fn offset_stays_in_bounds(ops in prop::collection::vec((0u8..6, any::<i32>()), 0..64)) {
            let mut cursor = BinaryCursor::new();
            for (op, arg) in ops {
                let _ = match op {
                    0 => { cursor.write_i32(arg); Ok(()) },
                    1 => cursor.read_u16().map(|_| ()),
                    2 => cursor.seek(i64::from(arg % 16), SeekOrigin::Current).map(|_| ()),
                    3 => cursor.resize(Resize::Shrink, (arg.unsigned_abs() % 8) as usize),
                    4 => cursor.resize(Resize::Grow, (arg.unsigned_abs() % 8) as usize),
                    _ => cursor.write_string("abc"),
                };
                prop_assert!(cursor.offset() <= cursor.len());
            }
        }

        #[test]
        fn int_round_trip(value in any::<i32>()) {
            let mut cursor = BinaryCursor::new();
            cursor.write_int(IntKind::I32, i64::from(value)).unwrap();
            cursor.seek(0, SeekOrigin::Start).unwrap();
            prop_assert_eq!(cursor.read_int(IntKind::I32).unwrap(), i64::from(value));
        }
    }
}
