use std::fs::{File, OpenOptions};
use std::io::{prelude::*, BufReader, SeekFrom};
use std::path::Path;

use crate::{compression::Compression, record::ByteRange};

/// Reads ranges of the payload region, relative to the payload base offset.
#[derive(Debug)]
pub struct PayloadReader<R> {
    inner: R,
    base: u64,
    compression: Compression,
}

impl PayloadReader<BufReader<File>> {
    pub fn open<P: AsRef<Path>>(
        path: P,
        base: u64,
        compression: Compression,
    ) -> std::io::Result<Self> {
        let file = OpenOptions::new().read(true).open(path.as_ref())?;
        Ok(PayloadReader::new(BufReader::new(file), base, compression))
    }
}

impl<R: Read + Seek> PayloadReader<R> {
    pub fn new(inner: R, base: u64, compression: Compression) -> Self {
        PayloadReader {
            inner,
            base,
            compression,
        }
    }

    #[inline(always)]
    pub fn base(&self) -> u64 {
        self.base
    }

    /// Reads the exact bytes of `range`. Returns `None` when fewer bytes
    /// than requested are available, including empty ranges.
    pub fn read_raw(&mut self, range: ByteRange) -> std::io::Result<Option<Vec<u8>>> {
        let start = self.base.checked_add(range.offset).ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "range starts past the addressable end of the file",
            )
        })?;

        self.inner.seek(SeekFrom::Start(start))?;

        let mut buf = Vec::new();
        let read = (&mut self.inner).take(range.length).read_to_end(&mut buf)? as u64;

        if read == 0 || read < range.length {
            tracing::debug!(start, expected = range.length, read, "short payload read");
            return Ok(None);
        }

        Ok(Some(buf))
    }

    /// Reads `range` and undoes the binary's compression. Ranges that fail
    /// to decompress are returned as stored.
    pub fn read(&mut self, range: ByteRange) -> std::io::Result<Option<Vec<u8>>> {
        let raw = match self.read_raw(range)? {
            Some(raw) => raw,
            None => return Ok(None),
        };

        if !self.compression.is_enabled() {
            return Ok(Some(raw));
        }

        match self.compression.decompress(&raw) {
            Ok(data) => Ok(Some(data)),
            Err(e) => {
                tracing::debug!(
                    error = %e,
                    compression = %self.compression,
                    offset = range.offset,
                    "decompression failed, using stored bytes"
                );
                Ok(Some(raw))
            }
        }
    }
}
