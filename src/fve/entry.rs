use std::fmt;

use byteorder::{ByteOrder, LittleEndian};
use tracing::debug;

/// size(2) + entry type(2) + value type(2) + version(2)
pub const ENTRY_HEADER_SIZE: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryType {
    None,
    Vmk,
    Fvek,
    Validation,
    StartupKey,
    Description,
    FvekBackup,
    VolumeHeaderBlock,
    Unknown(u16),
}

impl From<u16> for EntryType {
    fn from(code: u16) -> Self {
        match code {
            0x0000 => EntryType::None,
            0x0002 => EntryType::Vmk,
            0x0003 => EntryType::Fvek,
            0x0004 => EntryType::Validation,
            0x0006 => EntryType::StartupKey,
            0x0007 => EntryType::Description,
            0x000b => EntryType::FvekBackup,
            0x000f => EntryType::VolumeHeaderBlock,
            other => EntryType::Unknown(other),
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryType::None => write!(f, "None"),
            EntryType::Vmk => write!(f, "VMK"),
            EntryType::Fvek => write!(f, "FVEK"),
            EntryType::Validation => write!(f, "Validation"),
            EntryType::StartupKey => write!(f, "Startup key"),
            EntryType::Description => write!(f, "Computer description"),
            EntryType::FvekBackup => write!(f, "FVEK backup"),
            EntryType::VolumeHeaderBlock => write!(f, "Volume header block"),
            EntryType::Unknown(code) => write!(f, "Unknown({:#x})", code),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Erased,
    Key,
    Utf16String,
    StretchKey,
    UseKey,
    AesCcmKey,
    TpmKey,
    Validation,
    Vmk,
    ExternalKey,
    Update,
    Error,
    OffsetAndSize,
    Unknown(u16),
}

impl From<u16> for ValueType {
    fn from(code: u16) -> Self {
        match code {
            0x0000 => ValueType::Erased,
            0x0001 => ValueType::Key,
            0x0002 => ValueType::Utf16String,
            0x0003 => ValueType::StretchKey,
            0x0004 => ValueType::UseKey,
            0x0005 => ValueType::AesCcmKey,
            0x0006 => ValueType::TpmKey,
            0x0007 => ValueType::Validation,
            0x0008 => ValueType::Vmk,
            0x0009 => ValueType::ExternalKey,
            0x000a => ValueType::Update,
            0x000b => ValueType::Error,
            0x000f => ValueType::OffsetAndSize,
            other => ValueType::Unknown(other),
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Erased => write!(f, "Erased"),
            ValueType::Key => write!(f, "Key"),
            ValueType::Utf16String => write!(f, "UTF-16 string"),
            ValueType::StretchKey => write!(f, "Stretch key"),
            ValueType::UseKey => write!(f, "Use key"),
            ValueType::AesCcmKey => write!(f, "AES-CCM encrypted key"),
            ValueType::TpmKey => write!(f, "TPM encoded key"),
            ValueType::Validation => write!(f, "Validation"),
            ValueType::Vmk => write!(f, "VMK"),
            ValueType::ExternalKey => write!(f, "External key"),
            ValueType::Update => write!(f, "Update"),
            ValueType::Error => write!(f, "Error"),
            ValueType::OffsetAndSize => write!(f, "Offset and size"),
            ValueType::Unknown(code) => write!(f, "Unknown({:#x})", code),
        }
    }
}

/// Одна TLV-запись потока метаданных FVE. Payload заимствуется из блока.
#[derive(Debug, Clone, Copy)]
pub struct FveMetadataEntry<'a> {
    pub entry_size: u16,
    pub entry_type: EntryType,
    pub value_type: ValueType,
    pub version: u16,
    pub payload: &'a [u8],
}

impl<'a> FveMetadataEntry<'a> {
    /// Разбирает запись по `pos` и возвращает её вместе со смещением следующей.
    /// `None` означает конец потока: не влезает заголовок, размер меньше 8
    /// или payload выходит за `data`.
    pub fn parse_at(data: &'a [u8], pos: usize) -> Option<(Self, usize)> {
        let header = data.get(pos..pos.checked_add(ENTRY_HEADER_SIZE)?)?;
        let entry_size = LittleEndian::read_u16(&header[0..2]);
        if (entry_size as usize) < ENTRY_HEADER_SIZE {
            return None;
        }

        let end = pos + entry_size as usize;
        let payload = data.get(pos + ENTRY_HEADER_SIZE..end)?;

        let entry = Self {
            entry_size,
            entry_type: EntryType::from(LittleEndian::read_u16(&header[2..4])),
            value_type: ValueType::from(LittleEndian::read_u16(&header[4..6])),
            version: LittleEndian::read_u16(&header[6..8]),
            payload,
        };
        Some((entry, end))
    }
}

/// Идёт по непрерывному потоку записей, пока `pos < limit`.
/// После первой битой записи останавливается насовсем.
pub struct EntryWalker<'a> {
    data: &'a [u8],
    pos: usize,
    limit: usize,
}

impl<'a> EntryWalker<'a> {
    pub fn new(data: &'a [u8], start: usize) -> Self {
        Self::with_limit(data, start, data.len())
    }

    pub fn with_limit(data: &'a [u8], start: usize, limit: usize) -> Self {
        Self { data, pos: start, limit: limit.min(data.len()) }
    }
}

impl<'a> Iterator for EntryWalker<'a> {
    type Item = FveMetadataEntry<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.limit {
            return None;
        }
        match FveMetadataEntry::parse_at(self.data, self.pos) {
            Some((entry, next)) => {
                self.pos = next;
                Some(entry)
            }
            None => {
                debug!(offset = self.pos, "end of entry stream");
                self.pos = self.limit;
                None
            }
        }
    }
}
