use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use byteorder::{ByteOrder, LittleEndian};
use tracing::trace;

use crate::error::{FveError, Result};

/// Чтение точного числа байт по смещениям от начала раздела BitLocker
/// внутри образа диска
pub struct BoundedReader<R> {
    reader: R,
    base: u64,
    len: u64,
}

impl BoundedReader<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>, base: u64) -> Result<Self> {
        let file = File::open(path)?;
        Self::new(BufReader::new(file), base)
    }
}

impl<R: Read + Seek> BoundedReader<R> {
    pub fn new(mut reader: R, base: u64) -> Result<Self> {
        let len = reader.seek(SeekFrom::End(0))?;
        Ok(Self { reader, base, len })
    }

    pub fn base(&self) -> u64 {
        self.base
    }

    /// Ровно `n` байт по `offset` (от начала раздела). Короткий буфер
    /// не возвращается никогда: вместо него `Truncated`.
    pub fn read_exact_at(&mut self, offset: u64, n: usize) -> Result<Vec<u8>> {
        let absolute = self.base.checked_add(offset).ok_or(FveError::Truncated {
            offset,
            needed: n,
            available: 0,
        })?;
        let available = self.len.saturating_sub(absolute);
        if available < n as u64 {
            return Err(FveError::Truncated { offset: absolute, needed: n, available });
        }

        trace!(offset = absolute, len = n, "read");
        let mut buf = vec![0u8; n];
        self.reader.seek(SeekFrom::Start(absolute))?;
        self.reader.read_exact(&mut buf).map_err(|e| match e.kind() {
            std::io::ErrorKind::UnexpectedEof => FveError::Truncated { offset: absolute, needed: n, available },
            _ => FveError::Io(e),
        })?;
        Ok(buf)
    }

    pub fn read_u64_at(&mut self, offset: u64) -> Result<u64> {
        let bytes = self.read_exact_at(offset, 8)?;
        Ok(LittleEndian::read_u64(&bytes))
    }
}
