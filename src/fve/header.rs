use std::fmt;

use byteorder::{ByteOrder, LittleEndian};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::boot::BITLOCKER_SIGNATURE;
use super::utils::{filetime_to_datetime, guid_from_le_bytes};

pub const FVE_BLOCK_SIZE: usize = 2048;
pub const METADATA_HEADER_OFFSET: usize = 64;
pub const METADATA_HEADER_SIZE: usize = 48;
pub const FIRST_ENTRY_OFFSET: usize = METADATA_HEADER_OFFSET + METADATA_HEADER_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncryptionMethod {
    None,
    Aes128CbcDiffuser,
    Aes256CbcDiffuser,
    Aes128Cbc,
    Aes256Cbc,
    Aes128Xts,
    Aes256Xts,
    Unknown(u32),
}

impl From<u32> for EncryptionMethod {
    fn from(code: u32) -> Self {
        match code {
            0x0000 => EncryptionMethod::None,
            0x8000 => EncryptionMethod::Aes128CbcDiffuser,
            0x8001 => EncryptionMethod::Aes256CbcDiffuser,
            0x8002 => EncryptionMethod::Aes128Cbc,
            0x8003 => EncryptionMethod::Aes256Cbc,
            0x8004 => EncryptionMethod::Aes128Xts,
            0x8005 => EncryptionMethod::Aes256Xts,
            other => EncryptionMethod::Unknown(other),
        }
    }
}

impl fmt::Display for EncryptionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncryptionMethod::None => write!(f, "None"),
            EncryptionMethod::Aes128CbcDiffuser => write!(f, "AES-CBC 128-bit with Elephant diffuser"),
            EncryptionMethod::Aes256CbcDiffuser => write!(f, "AES-CBC 256-bit with Elephant diffuser"),
            EncryptionMethod::Aes128Cbc => write!(f, "AES-CBC 128-bit"),
            EncryptionMethod::Aes256Cbc => write!(f, "AES-CBC 256-bit"),
            EncryptionMethod::Aes128Xts => write!(f, "AES-XTS 128-bit"),
            EncryptionMethod::Aes256Xts => write!(f, "AES-XTS 256-bit"),
            EncryptionMethod::Unknown(code) => write!(f, "Unknown({:#x})", code),
        }
    }
}

/// Первые 64 байта блока метаданных FVE
#[derive(Debug, Clone)]
pub struct FveBlockHeader {
    pub signature: [u8; 8],
    pub version: u16,
    pub encrypted_volume_size: u64,
    pub metadata_offsets: [u64; 3],
    pub volume_header_offset: u64,
}

impl FveBlockHeader {
    pub fn parse(block: &[u8]) -> Option<Self> {
        if block.len() < METADATA_HEADER_OFFSET {
            return None;
        }
        let mut signature = [0u8; 8];
        signature.copy_from_slice(&block[0..8]);

        Some(Self {
            signature,
            // 8..10 размер блока, нас не интересует
            version: LittleEndian::read_u16(&block[10..12]),
            encrypted_volume_size: LittleEndian::read_u64(&block[16..24]),
            metadata_offsets: [
                LittleEndian::read_u64(&block[32..40]),
                LittleEndian::read_u64(&block[40..48]),
                LittleEndian::read_u64(&block[48..56]),
            ],
            volume_header_offset: LittleEndian::read_u64(&block[56..64]),
        })
    }

    pub fn has_valid_signature(&self) -> bool {
        &self.signature == BITLOCKER_SIGNATURE
    }
}

/// Заголовок метаданных: 48 байт со смещения 64 в блоке
#[derive(Debug, Clone)]
pub struct FveMetadataHeader {
    pub metadata_size: u32,
    pub version: u32,
    pub header_size: u32,
    pub volume_guid: Uuid,
    pub nonce_counter: u32,
    pub encryption_method: EncryptionMethod,
    pub creation_time: DateTime<Utc>,
}

impl FveMetadataHeader {
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < METADATA_HEADER_SIZE {
            return None;
        }
        Some(Self {
            metadata_size: LittleEndian::read_u32(&data[0..4]),
            version: LittleEndian::read_u32(&data[4..8]),
            header_size: LittleEndian::read_u32(&data[8..12]),
            // 12..16 копия размера
            volume_guid: guid_from_le_bytes(&data[16..32])?,
            nonce_counter: LittleEndian::read_u32(&data[32..36]),
            encryption_method: EncryptionMethod::from(LittleEndian::read_u32(&data[36..40])),
            creation_time: filetime_to_datetime(LittleEndian::read_u64(&data[40..48])),
        })
    }
}
