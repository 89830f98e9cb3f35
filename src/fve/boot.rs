use std::fmt;
use std::io::{Read, Seek};

use byteorder::{ByteOrder, LittleEndian};
use uuid::Uuid;

use super::reader::BoundedReader;
use super::utils::{format_guid, guid_from_le_bytes};
use crate::error::{FveError, Result};

pub const BITLOCKER_SIGNATURE: &[u8; 8] = b"-FVE-FS-";
pub const BITLOCKER_TO_GO_SIGNATURE: &[u8; 8] = b"MSWIN4.1";

pub const BITLOCKER_GUID: Uuid = Uuid::from_u128(0x4967d63b_2e29_4ad8_8399_f6a339e3d001);
pub const USED_DISK_SPACE_ONLY_GUID: Uuid = Uuid::from_u128(0x92a84d3b_dd80_4d0e_9e4e_b1e3284eaed8);

/// Вариант загрузочного сектора, различается по OEM-сигнатуре
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeLayout {
    Standard,
    ToGo,
}

impl VolumeLayout {
    pub fn from_signature(signature: &[u8]) -> Option<Self> {
        if signature == BITLOCKER_SIGNATURE {
            Some(VolumeLayout::Standard)
        } else if signature == BITLOCKER_TO_GO_SIGNATURE {
            Some(VolumeLayout::ToGo)
        } else {
            None
        }
    }

    /// Смещение GUID тома. Сразу за ним три смещения метаданных.
    pub fn guid_offset(self) -> u64 {
        match self {
            VolumeLayout::Standard => 0xa0,
            VolumeLayout::ToGo => 0x1a8,
        }
    }

    pub fn signature(self) -> &'static str {
        match self {
            VolumeLayout::Standard => "-FVE-FS-",
            VolumeLayout::ToGo => "MSWIN4.1",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeKind {
    BitLocker,
    BitLockerToGo,
    UsedDiskSpaceOnly,
}

impl VolumeKind {
    pub fn identify(guid: &Uuid, layout: VolumeLayout) -> Option<Self> {
        if *guid == BITLOCKER_GUID {
            match layout {
                VolumeLayout::Standard => Some(VolumeKind::BitLocker),
                VolumeLayout::ToGo => Some(VolumeKind::BitLockerToGo),
            }
        } else if *guid == USED_DISK_SPACE_ONLY_GUID {
            Some(VolumeKind::UsedDiskSpaceOnly)
        } else {
            None
        }
    }
}

impl fmt::Display for VolumeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VolumeKind::BitLocker => write!(f, "BitLocker"),
            VolumeKind::BitLockerToGo => write!(f, "BitLocker To Go"),
            VolumeKind::UsedDiskSpaceOnly => write!(f, "BitLocker Used Disk Space Only"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BitLockerBootSector {
    pub layout: VolumeLayout,
    pub sector_size: u16,
    pub volume_guid: Uuid,
    pub kind: VolumeKind,
    /// Смещения трёх копий метаданных FVE относительно начала раздела
    pub metadata_offsets: [u64; 3],
}

// Загрузочный сектор читается по шагам: вызывающий код печатает каждое поле
// сразу после декодирования, ещё до того как следующий шаг может упасть.
impl BitLockerBootSector {
    /// jmp(3) + OEM-сигнатура(8) + размер сектора(2). Чужая сигнатура
    /// отбрасывается до чтения любых других полей.
    pub fn read_signature<R: Read + Seek>(reader: &mut BoundedReader<R>) -> Result<(VolumeLayout, u16)> {
        let head = reader.read_exact_at(0, 13)?;
        let layout = VolumeLayout::from_signature(&head[3..11]).ok_or_else(|| FveError::NotBitLocker {
            signature: String::from_utf8_lossy(&head[3..11]).into_owned(),
        })?;
        Ok((layout, LittleEndian::read_u16(&head[11..13])))
    }

    pub fn read_volume_guid<R: Read + Seek>(reader: &mut BoundedReader<R>, layout: VolumeLayout) -> Result<Uuid> {
        let guid_bytes = reader.read_exact_at(layout.guid_offset(), 16)?;
        guid_from_le_bytes(&guid_bytes).ok_or_else(|| FveError::InvalidGuid(hex::encode(&guid_bytes)))
    }

    pub fn identify(guid: &Uuid, layout: VolumeLayout) -> Result<VolumeKind> {
        VolumeKind::identify(guid, layout).ok_or_else(|| FveError::UnrecognizedVolume(format_guid(guid)))
    }

    // Три u64 подряд сразу за GUID
    pub fn read_metadata_offsets<R: Read + Seek>(
        reader: &mut BoundedReader<R>,
        layout: VolumeLayout,
    ) -> Result<[u64; 3]> {
        let first = layout.guid_offset() + 16;
        Ok([
            reader.read_u64_at(first)?,
            reader.read_u64_at(first + 8)?,
            reader.read_u64_at(first + 16)?,
        ])
    }
}
