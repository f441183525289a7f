//! Order-independent fingerprints of record files.
//!
//! A shuffle must not lose, duplicate, or alter records. [`FileDigest`]
//! condenses a record file into a count plus two commutative hash
//! accumulators, so an input and its shuffled output compare equal without
//! sorting either file. Equal digests mean equal multisets with high
//! probability; unequal digests always mean the multisets differ.

use std::collections::hash_map::DefaultHasher;
use std::fs::File;
use std::hash::Hasher;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::Serialize;
use spillshuf_common::types::Record;
use spillshuf_common::utils::error::{Error, Result};

use super::io::RecordReader;

/// Multiset fingerprint of a record stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct FileDigest {
    /// Number of complete records.
    pub records: u64,
    /// Bytes of a trailing partial record, if any.
    pub trailing_bytes: usize,
    /// Wrapping sum of per-record hashes.
    pub sum: u64,
    /// XOR of per-record hashes.
    pub xor: u64,
}

impl FileDigest {
    /// Computes the digest of a record file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InputOpen`] if the file cannot be opened, or
    /// [`Error::Io`] if reading it fails.
    pub fn of_path(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|source| Error::InputOpen {
            path: path.to_path_buf(),
            source,
        })?;
        Self::of_reader(BufReader::new(file))
            .map_err(|e| Error::io(format!("reading {}", path.display()), e))
    }

    /// Computes the digest of a record stream.
    pub fn of_reader<R: Read>(reader: R) -> std::io::Result<Self> {
        let mut reader = RecordReader::new(reader);
        let mut digest = Self::default();
        while let Some(record) = reader.read_record()? {
            digest.add(&record);
        }
        digest.trailing_bytes = reader.trailing_bytes();
        Ok(digest)
    }

    /// Folds one record into the digest.
    pub fn add(&mut self, record: &Record) {
        let mut hasher = DefaultHasher::new();
        hasher.write(&record.to_bytes());
        let hash = hasher.finish();

        self.records += 1;
        self.sum = self.sum.wrapping_add(hash);
        self.xor ^= hash;
    }

    /// Returns whether both streams hold the same multiset of records.
    #[must_use]
    pub fn same_records(&self, other: &Self) -> bool {
        self.records == other.records && self.sum == other.sum && self.xor == other.xor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digest_of(records: &[Record]) -> FileDigest {
        let mut digest = FileDigest::default();
        for record in records {
            digest.add(record);
        }
        digest
    }

    #[test]
    fn test_order_independent() {
        let a = Record::new(1, 2, 0.5);
        let b = Record::new(3, 4, 1.5);
        let c = Record::new(5, 6, 2.5);

        assert!(digest_of(&[a, b, c]).same_records(&digest_of(&[c, a, b])));
    }

    #[test]
    fn test_detects_duplicates_and_losses() {
        let a = Record::new(1, 2, 0.5);
        let b = Record::new(3, 4, 1.5);

        // Duplicating `a` in place of `b` keeps the count but not the hashes
        assert!(!digest_of(&[a, b]).same_records(&digest_of(&[a, a])));
        assert!(!digest_of(&[a, b]).same_records(&digest_of(&[a])));
    }

    #[test]
    fn test_of_reader_counts_trailing_bytes() {
        let mut bytes = Record::new(1, 1, 1.0).to_bytes().to_vec();
        bytes.push(0);

        let digest = FileDigest::of_reader(bytes.as_slice()).unwrap();
        assert_eq!(digest.records, 1);
        assert_eq!(digest.trailing_bytes, 1);
    }
}
