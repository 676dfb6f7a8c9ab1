//! Little-endian, length-prefixed binary codec for the virtual-file protocol.
//!
//! [`ByteEncoder`] is an append-only buffer whose allocated capacity grows in
//! fixed 1 KiB steps and is tracked separately from the logical length.
//! [`ByteDecoder`] walks a borrowed slice with a cursor and fails with
//! [`DecodeError::TruncatedBuffer`] instead of reading past the end.

use thiserror::Error;

/// Rounding unit for encoder capacity growth.
pub const GROWTH_UNIT: usize = 1024;

/// Errors produced while encoding a length-prefixed field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// The field is longer than a `u32` length prefix can describe.
    #[error("field of {0} bytes exceeds the u32 length prefix")]
    FieldTooLong(usize),
}

/// Errors produced while decoding a buffer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// A read asked for more bytes than remain in the buffer.
    #[error("truncated buffer: needed {needed} bytes at offset {offset}, {remaining} remaining")]
    TruncatedBuffer {
        /// Cursor position where the read started.
        offset: usize,
        /// Bytes the read required.
        needed: usize,
        /// Bytes left after `offset`.
        remaining: usize,
    },

    /// A bool field held something other than 0 or 1.
    #[error("invalid bool byte 0x{0:02x}")]
    InvalidBool(u8),

    /// A string field was not valid UTF-8.
    #[error("string field is not valid UTF-8")]
    InvalidUtf8,

    /// A subject alternative name carried an unknown type tag.
    #[error("unknown subject alternative name type {0}")]
    UnknownSanType(u32),

    /// A validity timestamp was not 14 ASCII digits.
    #[error("invalid validity timestamp '{0}'")]
    InvalidValidity(String),
}

/// Append-only growable byte buffer with typed little-endian writers.
#[derive(Debug, Clone, Default)]
pub struct ByteEncoder {
    /// Allocated storage; its length is the capacity.
    data: Vec<u8>,
    /// Logical length: bytes actually written.
    len: usize,
}

impl ByteEncoder {
    /// Create an empty encoder with zero capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bytes written so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether nothing has been written yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bytes currently allocated. Always a multiple of [`GROWTH_UNIT`] and
    /// never smaller than [`len`](Self::len).
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Written bytes, without the unused tail of the allocation.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.data[..self.len]
    }

    /// Consume the encoder and return exactly the written bytes.
    #[must_use]
    pub fn finish(mut self) -> Vec<u8> {
        self.data.truncate(self.len);
        self.data
    }

    pub fn write_bool(&mut self, value: bool) {
        self.append(&[u8::from(value)]);
    }

    pub fn write_i32(&mut self, value: i32) {
        self.append(&value.to_le_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.append(&value.to_le_bytes());
    }

    /// Write a UTF-8 string as a `u32` byte length followed by the bytes.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError::FieldTooLong`] if the string exceeds `u32::MAX` bytes.
    pub fn write_string(&mut self, value: &str) -> Result<(), EncodeError> {
        self.write_bytes(value.as_bytes())
    }

    /// Write a byte array as a `u32` length followed by the bytes.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError::FieldTooLong`] if the slice exceeds `u32::MAX` bytes.
    pub fn write_bytes(&mut self, value: &[u8]) -> Result<(), EncodeError> {
        let len = u32::try_from(value.len()).map_err(|_| EncodeError::FieldTooLong(value.len()))?;
        self.write_u32(len);
        self.append(value);
        Ok(())
    }

    fn append(&mut self, bytes: &[u8]) {
        let end = self.len + bytes.len();
        if end > self.data.len() {
            self.grow(end - self.data.len());
        }
        self.data[self.len..end].copy_from_slice(bytes);
        self.len = end;
    }

    fn grow(&mut self, deficit: usize) {
        let add = deficit.div_ceil(GROWTH_UNIT) * GROWTH_UNIT;
        self.data.resize(self.data.len() + add, 0);
    }
}

/// Sequential reader over a borrowed byte buffer.
#[derive(Debug, Clone)]
pub struct ByteDecoder<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> ByteDecoder<'a> {
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    /// Current cursor position.
    #[must_use]
    pub fn position(&self) -> usize {
        self.offset
    }

    /// Bytes not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    /// Read a single 0/1 byte.
    ///
    /// # Errors
    ///
    /// Fails on truncation or on any byte other than 0 and 1.
    pub fn read_bool(&mut self) -> Result<bool, DecodeError> {
        match self.take(1)?[0] {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(DecodeError::InvalidBool(other)),
        }
    }

    /// # Errors
    ///
    /// Fails with [`DecodeError::TruncatedBuffer`] if fewer than 4 bytes remain.
    pub fn read_u32(&mut self) -> Result<u32, DecodeError> {
        Ok(u32::from_le_bytes(self.take_array()?))
    }

    /// # Errors
    ///
    /// Fails with [`DecodeError::TruncatedBuffer`] if fewer than 4 bytes remain.
    pub fn read_i32(&mut self) -> Result<i32, DecodeError> {
        Ok(i32::from_le_bytes(self.take_array()?))
    }

    /// Read a length-prefixed UTF-8 string.
    ///
    /// # Errors
    ///
    /// Fails on truncation or invalid UTF-8.
    pub fn read_string(&mut self) -> Result<String, DecodeError> {
        let bytes = self.read_bytes()?;
        String::from_utf8(bytes).map_err(|_| DecodeError::InvalidUtf8)
    }

    /// Read a length-prefixed byte array.
    ///
    /// # Errors
    ///
    /// Fails with [`DecodeError::TruncatedBuffer`] if the prefix or payload is cut short.
    pub fn read_bytes(&mut self) -> Result<Vec<u8>, DecodeError> {
        let len = self.read_u32()? as usize;
        Ok(self.take(len)?.to_vec())
    }

    fn take(&mut self, needed: usize) -> Result<&'a [u8], DecodeError> {
        let remaining = self.remaining();
        if needed > remaining {
            return Err(DecodeError::TruncatedBuffer {
                offset: self.offset,
                needed,
                remaining,
            });
        }
        let start = self.offset;
        self.offset += needed;
        Ok(&self.data[start..self.offset])
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn primitives_are_little_endian() {
        let mut enc = ByteEncoder::new();
        enc.write_bool(true);
        enc.write_u32(0x0403_0201);
        enc.write_i32(-2);
        assert_eq!(
            enc.finish(),
            vec![0x01, 0x01, 0x02, 0x03, 0x04, 0xfe, 0xff, 0xff, 0xff]
        );
    }

    #[test]
    fn string_is_length_prefixed_without_terminator() {
        let mut enc = ByteEncoder::new();
        enc.write_string("hé").unwrap();
        assert_eq!(enc.finish(), vec![3, 0, 0, 0, b'h', 0xc3, 0xa9]);
    }

    #[test]
    fn empty_encoder_has_no_capacity() {
        let enc = ByteEncoder::new();
        assert_eq!(enc.capacity(), 0);
        assert!(enc.is_empty());
        assert!(enc.finish().is_empty());
    }

    #[test]
    fn capacity_rounds_deficit_up_to_growth_unit() {
        let mut enc = ByteEncoder::new();
        enc.write_bool(false);
        assert_eq!(enc.capacity(), 1024);

        enc.write_bytes(&[7u8; 1500]).unwrap();
        // 1 + 4 + 1500 = 1505 written, deficit 481 over 1024 -> one more unit
        assert_eq!(enc.len(), 1505);
        assert_eq!(enc.capacity(), 2048);

        enc.write_bytes(&vec![1u8; 5000]).unwrap();
        // 6509 written, deficit 4461 -> five units
        assert_eq!(enc.len(), 6509);
        assert_eq!(enc.capacity(), 2048 + 5 * 1024);
    }

    #[test]
    fn exact_fit_does_not_grow() {
        let mut enc = ByteEncoder::new();
        enc.write_bytes(&[0u8; 1020]).unwrap();
        assert_eq!(enc.len(), 1024);
        assert_eq!(enc.capacity(), 1024);
    }

    #[test]
    fn read_past_end_is_truncated_buffer() {
        let mut dec = ByteDecoder::new(&[1, 0]);
        let err = dec.read_u32().unwrap_err();
        assert_eq!(
            err,
            DecodeError::TruncatedBuffer {
                offset: 0,
                needed: 4,
                remaining: 2
            }
        );
    }

    #[test]
    fn truncated_string_payload_is_detected() {
        let mut dec = ByteDecoder::new(&[10, 0, 0, 0, b'a', b'b']);
        assert!(matches!(
            dec.read_string(),
            Err(DecodeError::TruncatedBuffer { needed: 10, .. })
        ));
    }

    #[test]
    fn bool_rejects_values_above_one() {
        let mut dec = ByteDecoder::new(&[2]);
        assert_eq!(dec.read_bool(), Err(DecodeError::InvalidBool(2)));
    }

    #[test]
    fn invalid_utf8_is_reported() {
        let mut dec = ByteDecoder::new(&[2, 0, 0, 0, 0xff, 0xfe]);
        assert_eq!(dec.read_string(), Err(DecodeError::InvalidUtf8));
    }

    #[test]
    fn cursor_advances_by_consumed_bytes() {
        let mut enc = ByteEncoder::new();
        enc.write_string("abc").unwrap();
        enc.write_bool(true);
        let bytes = enc.finish();

        let mut dec = ByteDecoder::new(&bytes);
        dec.read_string().unwrap();
        assert_eq!(dec.position(), 7);
        assert!(dec.read_bool().unwrap());
        assert_eq!(dec.remaining(), 0);
    }

    #[derive(Debug, Clone)]
    enum Field {
        Bool(bool),
        U32(u32),
        I32(i32),
        Str(String),
        Bytes(Vec<u8>),
    }

    fn field() -> impl Strategy<Value = Field> {
        prop_oneof![
            any::<bool>().prop_map(Field::Bool),
            any::<u32>().prop_map(Field::U32),
            any::<i32>().prop_map(Field::I32),
            any::<String>().prop_map(Field::Str),
            proptest::collection::vec(any::<u8>(), 0..2048).prop_map(Field::Bytes),
        ]
    }

    fn encoded_len(field: &Field) -> usize {
        match field {
            Field::Bool(_) => 1,
            Field::U32(_) | Field::I32(_) => 4,
            Field::Str(s) => 4 + s.len(),
            Field::Bytes(b) => 4 + b.len(),
        }
    }

    proptest! {
        #[test]
        fn fields_read_back_in_order(fields in proptest::collection::vec(field(), 0..40)) {
            let mut enc = ByteEncoder::new();
            for f in &fields {
                match f {
                    Field::Bool(v) => enc.write_bool(*v),
                    Field::U32(v) => enc.write_u32(*v),
                    Field::I32(v) => enc.write_i32(*v),
                    Field::Str(v) => enc.write_string(v).unwrap(),
                    Field::Bytes(v) => enc.write_bytes(v).unwrap(),
                }
            }
            let bytes = enc.finish();

            let mut dec = ByteDecoder::new(&bytes);
            for f in &fields {
                match f {
                    Field::Bool(v) => prop_assert_eq!(dec.read_bool().unwrap(), *v),
                    Field::U32(v) => prop_assert_eq!(dec.read_u32().unwrap(), *v),
                    Field::I32(v) => prop_assert_eq!(dec.read_i32().unwrap(), *v),
                    Field::Str(v) => prop_assert_eq!(&dec.read_string().unwrap(), v),
                    Field::Bytes(v) => prop_assert_eq!(&dec.read_bytes().unwrap(), v),
                }
            }
            prop_assert_eq!(dec.remaining(), 0);
        }

        #[test]
        fn growth_preserves_earlier_bytes(fields in proptest::collection::vec(field(), 1..40)) {
            let mut enc = ByteEncoder::new();
            let mut snapshots: Vec<Vec<u8>> = Vec::new();
            let mut expected_len = 0usize;

            for f in &fields {
                match f {
                    Field::Bool(v) => enc.write_bool(*v),
                    Field::U32(v) => enc.write_u32(*v),
                    Field::I32(v) => enc.write_i32(*v),
                    Field::Str(v) => enc.write_string(v).unwrap(),
                    Field::Bytes(v) => enc.write_bytes(v).unwrap(),
                }
                expected_len += encoded_len(f);
                prop_assert_eq!(enc.len(), expected_len);
                prop_assert!(enc.capacity() >= enc.len());
                prop_assert_eq!(enc.capacity() % GROWTH_UNIT, 0);
                prop_assert!(enc.capacity() - enc.len() < GROWTH_UNIT.max(encoded_len(f)) + GROWTH_UNIT);
                snapshots.push(enc.as_slice().to_vec());
            }

            let out = enc.finish();
            prop_assert_eq!(out.len(), expected_len);
            for snap in &snapshots {
                prop_assert_eq!(&out[..snap.len()], snap.as_slice());
            }
        }
    }
}
