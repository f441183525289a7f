//! The fixed-size co-occurrence record.

use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};

/// Width of one encoded record in bytes.
pub const RECORD_SIZE: usize = 16;

/// A single co-occurrence entry: two word indices and a weight.
///
/// The shuffle engine never looks inside a record; it only copies and
/// relocates it. The fields are public so producers and tests can build
/// records directly.
///
/// # Encoding
///
/// ```text
/// offset  0..4   word1  i32 little-endian
/// offset  4..8   word2  i32 little-endian
/// offset  8..16  value  f64 little-endian
/// ```
///
/// There is no padding, header, or length prefix.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Record {
    /// Index of the first word.
    pub word1: i32,
    /// Index of the second word.
    pub word2: i32,
    /// Co-occurrence weight.
    pub value: f64,
}

impl Record {
    /// Creates a new record.
    #[must_use]
    pub const fn new(word1: i32, word2: i32, value: f64) -> Self {
        Self {
            word1,
            word2,
            value,
        }
    }

    /// Encodes the record into its on-disk representation.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; RECORD_SIZE] {
        let mut buf = [0u8; RECORD_SIZE];
        LittleEndian::write_i32(&mut buf[0..4], self.word1);
        LittleEndian::write_i32(&mut buf[4..8], self.word2);
        LittleEndian::write_f64(&mut buf[8..16], self.value);
        buf
    }

    /// Decodes a record from its on-disk representation.
    #[must_use]
    pub fn from_bytes(buf: &[u8; RECORD_SIZE]) -> Self {
        Self {
            word1: LittleEndian::read_i32(&buf[0..4]),
            word2: LittleEndian::read_i32(&buf[4..8]),
            value: LittleEndian::read_f64(&buf[8..16]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_is_little_endian() {
        let record = Record::new(1, -1, 1.0);
        let bytes = record.to_bytes();

        assert_eq!(&bytes[0..4], &[1, 0, 0, 0]);
        assert_eq!(&bytes[4..8], &[0xff, 0xff, 0xff, 0xff]);
        assert_eq!(&bytes[8..16], &1.0f64.to_le_bytes());
    }

    #[test]
    fn test_nan_payload_survives() {
        // Records are opaque: a NaN weight must come back bit-for-bit.
        let value = f64::from_bits(0x7ff8_0000_dead_beef);
        let record = Record::new(7, 9, value);

        let decoded = Record::from_bytes(&record.to_bytes());
        assert_eq!(decoded.value.to_bits(), value.to_bits());
        assert_eq!(decoded.to_bytes(), record.to_bytes());
    }
}
