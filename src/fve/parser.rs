use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use super::entry::{EntryWalker, ValueType};
use super::header::{FveBlockHeader, FveMetadataHeader, FIRST_ENTRY_OFFSET, METADATA_HEADER_OFFSET};
use super::records::{
    decode_description, AesCcmKeyRecord, ProtectionType, StretchKeyRecord, VmkRecord, VolumeHeaderBlock,
};
use crate::error::{FveError, Result};
use crate::hash::HashDescriptor;

/// Краткая сводка по одному VMK для отчёта
#[derive(Debug, Clone)]
pub struct VmkSummary {
    pub guid: Uuid,
    pub modified: DateTime<Utc>,
    pub protection_type: ProtectionType,
    pub description: Option<String>,
    pub hashes: usize,
}

#[derive(Debug, Clone)]
pub struct MetadataWalk {
    pub block_header: FveBlockHeader,
    pub metadata_header: FveMetadataHeader,
    pub descriptions: Vec<String>,
    pub volume_header_block: Option<VolumeHeaderBlock>,
    pub protectors: Vec<VmkSummary>,
    /// Дескрипторы в порядке обнаружения
    pub hashes: Vec<HashDescriptor>,
}

/// Обходит поток записей блока метаданных. Записи читаются, пока курсор
/// (смещение от начала блока) меньше заявленного размера метаданных.
/// Размер дополнительно ограничен длиной блока.
pub fn walk_metadata_block(block: &[u8]) -> Result<MetadataWalk> {
    let truncated = || FveError::Truncated {
        offset: 0,
        needed: FIRST_ENTRY_OFFSET,
        available: block.len() as u64,
    };
    let block_header = FveBlockHeader::parse(block).ok_or_else(truncated)?;
    if !block_header.has_valid_signature() {
        warn!(
            signature = %String::from_utf8_lossy(&block_header.signature),
            "unexpected FVE metadata block signature"
        );
    }
    let metadata_header = block
        .get(METADATA_HEADER_OFFSET..FIRST_ENTRY_OFFSET)
        .and_then(FveMetadataHeader::parse)
        .ok_or_else(truncated)?;

    let mut walk = MetadataWalk {
        block_header,
        descriptions: Vec::new(),
        volume_header_block: None,
        protectors: Vec::new(),
        hashes: Vec::new(),
        metadata_header,
    };

    let limit = walk.metadata_header.metadata_size as usize;
    for entry in EntryWalker::with_limit(block, FIRST_ENTRY_OFFSET, limit) {
        debug!(
            size = entry.entry_size,
            entry_type = %entry.entry_type,
            value_type = %entry.value_type,
            version = entry.version,
            "metadata entry"
        );
        match entry.value_type {
            ValueType::Utf16String => walk.descriptions.push(decode_description(entry.payload)),
            ValueType::AesCcmKey => {
                // FVEK и т.п. зашифрованы VMK, а не паролем: для хэша бесполезны
                if let Some(key) = AesCcmKeyRecord::parse(entry.payload) {
                    debug!(nonce = %hex::encode(key.nonce), len = key.ciphertext.len(), "top-level AES-CCM key");
                }
            }
            ValueType::Vmk => match VmkRecord::parse(entry.payload) {
                Some(vmk) => walk_vmk(&vmk, &mut walk),
                None => warn!(size = entry.entry_size, "VMK entry too short, skipped"),
            },
            ValueType::OffsetAndSize => walk.volume_header_block = VolumeHeaderBlock::parse(entry.payload),
            _ => {}
        }
    }

    Ok(walk)
}

fn walk_vmk(vmk: &VmkRecord<'_>, walk: &mut MetadataWalk) {
    debug!(guid = %vmk.guid, protection = %vmk.protection_type, "VMK");
    let mut summary = VmkSummary {
        guid: vmk.guid,
        modified: vmk.modified,
        protection_type: vmk.protection_type,
        description: None,
        hashes: 0,
    };

    if vmk.protection_type.is_hash_eligible() {
        // Stretch key всегда идёт перед AES-CCM ключом, которому даёт соль.
        // Если stretch key несколько, берём последнюю соль.
        let mut salt: Option<[u8; 16]> = None;

        for entry in vmk.properties() {
            match entry.value_type {
                ValueType::StretchKey => match StretchKeyRecord::parse(entry.payload) {
                    Some(stretch) => {
                        debug!(
                            method = %format!("{:#x}", stretch.encryption_method),
                            salt = %hex::encode(stretch.salt),
                            nested_key = stretch.key.is_some(),
                            "stretch key"
                        );
                        salt = Some(stretch.salt);
                    }
                    None => warn!(guid = %vmk.guid, "stretch key entry too short"),
                },
                ValueType::AesCcmKey => match (AesCcmKeyRecord::parse(entry.payload), salt) {
                    (Some(key), Some(salt)) => {
                        let found = HashDescriptor::generate(vmk.guid, &salt, &key, vmk.protection_type);
                        summary.hashes += found.len();
                        walk.hashes.extend(found);
                    }
                    (Some(_), None) => warn!(guid = %vmk.guid, "AES-CCM key without a preceding stretch key, skipped"),
                    (None, _) => warn!(guid = %vmk.guid, "AES-CCM entry too short"),
                },
                ValueType::Utf16String => summary.description = Some(decode_description(entry.payload)),
                _ => {}
            }
        }
    }

    walk.protectors.push(summary);
}
