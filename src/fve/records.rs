use std::fmt;

use byteorder::{ByteOrder, LittleEndian};
use chrono::{DateTime, Utc};
use encoding_rs::UTF_16LE;
use uuid::Uuid;

use super::entry::{EntryWalker, FveMetadataEntry, ValueType};
use super::utils::{filetime_to_datetime, guid_from_le_bytes};
use crate::hash::{PASSWORD_HASH_VERSIONS, RECOVERY_HASH_VERSIONS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtectionType {
    ClearKey,
    Tpm,
    StartupKey,
    TpmAndPin,
    RecoveryPassword,
    Password,
    Unknown(u16),
}

impl From<u16> for ProtectionType {
    fn from(code: u16) -> Self {
        match code {
            0x0000 => ProtectionType::ClearKey,
            0x0100 => ProtectionType::Tpm,
            0x0200 => ProtectionType::StartupKey,
            0x0500 => ProtectionType::TpmAndPin,
            0x0800 => ProtectionType::RecoveryPassword,
            0x2000 => ProtectionType::Password,
            other => ProtectionType::Unknown(other),
        }
    }
}

impl ProtectionType {
    pub fn code(self) -> u16 {
        match self {
            ProtectionType::ClearKey => 0x0000,
            ProtectionType::Tpm => 0x0100,
            ProtectionType::StartupKey => 0x0200,
            ProtectionType::TpmAndPin => 0x0500,
            ProtectionType::RecoveryPassword => 0x0800,
            ProtectionType::Password => 0x2000,
            ProtectionType::Unknown(code) => code,
        }
    }

    /// Ревизии формата хэша для этой защиты. `None`, если хэш не построить.
    pub fn hash_versions(self) -> Option<[u8; 2]> {
        match self {
            ProtectionType::Password => Some(PASSWORD_HASH_VERSIONS),
            ProtectionType::RecoveryPassword => Some(RECOVERY_HASH_VERSIONS),
            _ => None,
        }
    }

    pub fn is_hash_eligible(self) -> bool {
        self.hash_versions().is_some()
    }
}

impl fmt::Display for ProtectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtectionType::ClearKey => write!(f, "VMK protected with clear key"),
            ProtectionType::Tpm => write!(f, "VMK protected with TPM"),
            ProtectionType::StartupKey => write!(f, "VMK protected with startup key"),
            ProtectionType::TpmAndPin => write!(f, "VMK protected with TPM and PIN"),
            ProtectionType::RecoveryPassword => write!(f, "VMK protected with recovery password"),
            ProtectionType::Password => write!(f, "VMK protected with password"),
            ProtectionType::Unknown(code) => write!(f, "Unknown protection type {:#x}", code),
        }
    }
}

/// Ключ под AES-CCM: nonce(12) + MAC(16) + шифртекст
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AesCcmKeyRecord {
    pub nonce: [u8; 12],
    pub mac: [u8; 16],
    pub ciphertext: Vec<u8>,
}

impl AesCcmKeyRecord {
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < 28 {
            return None;
        }
        let mut nonce = [0u8; 12];
        nonce.copy_from_slice(&data[0..12]);
        let mut mac = [0u8; 16];
        mac.copy_from_slice(&data[12..28]);

        Some(Self { nonce, mac, ciphertext: data[28..].to_vec() })
    }

    pub fn mac_and_ciphertext(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.mac.len() + self.ciphertext.len());
        out.extend_from_slice(&self.mac);
        out.extend_from_slice(&self.ciphertext);
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StretchKeyRecord {
    pub encryption_method: u32,
    pub salt: [u8; 16],
    /// Вложенная AES-CCM запись сразу за солью, если есть
    pub key: Option<AesCcmKeyRecord>,
}

impl StretchKeyRecord {
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < 20 {
            return None;
        }
        let encryption_method = LittleEndian::read_u32(&data[0..4]);
        let mut salt = [0u8; 16];
        salt.copy_from_slice(&data[4..20]);

        let key = FveMetadataEntry::parse_at(&data[20..], 0)
            .filter(|(nested, _)| nested.value_type == ValueType::AesCcmKey)
            .and_then(|(nested, _)| AesCcmKeyRecord::parse(nested.payload));

        Some(Self { encryption_method, salt, key })
    }
}

/// Payload VMK: GUID(16), FILETIME изменения(8), 2 байта неизвестно,
/// тип защиты(2) по смещению 26, вложенные записи со смещения 28
#[derive(Debug, Clone)]
pub struct VmkRecord<'a> {
    pub guid: Uuid,
    pub modified: DateTime<Utc>,
    pub protection_type: ProtectionType,
    pub properties: &'a [u8],
}

impl<'a> VmkRecord<'a> {
    pub fn parse(data: &'a [u8]) -> Option<Self> {
        if data.len() < 28 {
            return None;
        }
        Some(Self {
            guid: guid_from_le_bytes(&data[0..16])?,
            modified: filetime_to_datetime(LittleEndian::read_u64(&data[16..24])),
            protection_type: ProtectionType::from(LittleEndian::read_u16(&data[26..28])),
            properties: &data[28..],
        })
    }

    pub fn properties(&self) -> EntryWalker<'a> {
        EntryWalker::new(self.properties, 0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeHeaderBlock {
    pub offset: u64,
    pub size: u64,
}

impl VolumeHeaderBlock {
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < 16 {
            return None;
        }
        Some(Self {
            offset: LittleEndian::read_u64(&data[0..8]),
            size: LittleEndian::read_u64(&data[8..16]),
        })
    }
}

/// Текст описания в UTF-16LE без завершающих NUL. Снимается только
/// настоящий BOM `FF FE`, байты `EF BB BF` остаются символами UTF-16.
pub fn decode_description(data: &[u8]) -> String {
    let (text, _) = UTF_16LE.decode_with_bom_removal(data);
    text.trim_end_matches('\0').to_string()
}
