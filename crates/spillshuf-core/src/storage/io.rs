//! Record streams.
//!
//! Files hold raw [`Record`]s back to back with no framing, so a stream ends
//! wherever the bytes end. A stream whose length is not a multiple of
//! [`RECORD_SIZE`] ends in a partial record; the reader stops there and
//! reports how many bytes it left behind.

use std::io::{self, Read, Write};

use spillshuf_common::types::{RECORD_SIZE, Record};

/// Reads records sequentially from a byte stream.
pub struct RecordReader<R> {
    inner: R,
    records_read: u64,
    trailing_bytes: usize,
    exhausted: bool,
}

impl<R: Read> RecordReader<R> {
    /// Wraps a byte stream. Callers should pass a buffered reader.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            records_read: 0,
            trailing_bytes: 0,
            exhausted: false,
        }
    }

    /// Reads the next record, or `None` at end of stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying read fails.
    pub fn read_record(&mut self) -> io::Result<Option<Record>> {
        if self.exhausted {
            return Ok(None);
        }

        let mut buf = [0u8; RECORD_SIZE];
        let mut filled = 0;
        while filled < RECORD_SIZE {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }

        if filled < RECORD_SIZE {
            self.exhausted = true;
            self.trailing_bytes = filled;
            return Ok(None);
        }

        self.records_read += 1;
        Ok(Some(Record::from_bytes(&buf)))
    }

    /// Appends up to `max` records to `out`, returning how many were read.
    ///
    /// Fewer than `max` records means the stream is exhausted.
    pub fn read_batch(&mut self, out: &mut Vec<Record>, max: usize) -> io::Result<usize> {
        let mut count = 0;
        while count < max {
            match self.read_record()? {
                Some(record) => {
                    out.push(record);
                    count += 1;
                }
                None => break,
            }
        }
        Ok(count)
    }

    /// Returns whether end of stream has been reached.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Returns the number of complete records read so far.
    #[must_use]
    pub fn records_read(&self) -> u64 {
        self.records_read
    }

    /// Returns the size of the partial record found at end of stream.
    #[must_use]
    pub fn trailing_bytes(&self) -> usize {
        self.trailing_bytes
    }
}

/// Writes records sequentially to a byte stream.
pub struct RecordWriter<W: Write> {
    inner: W,
    records_written: u64,
}

impl<W: Write> RecordWriter<W> {
    /// Wraps a byte stream. Callers should pass a buffered writer.
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            records_written: 0,
        }
    }

    /// Appends a batch of records.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying write fails.
    pub fn write_batch(&mut self, records: &[Record]) -> io::Result<()> {
        for record in records {
            self.inner.write_all(&record.to_bytes())?;
        }
        self.records_written += records.len() as u64;
        Ok(())
    }

    /// Flushes buffered records to the underlying stream.
    pub fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }

    /// Returns the number of records written so far.
    #[must_use]
    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    /// Flushes and returns the underlying stream.
    pub fn finish(mut self) -> io::Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}
