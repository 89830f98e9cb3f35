use serde::Serialize;

use crate::fve::utils::format_guid;
use crate::hash::HashDescriptor;

/// Одна строка отчёта JSONL
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct HashRecord {
    pub version: u8,
    pub protection: String,
    pub protection_code: u16,
    pub vmk_guid: String,
    pub salt: String,
    pub iterations: u32,
    pub nonce: String,
    pub mac_ciphertext: String,
    pub hash: String,
    pub source_image: String,
    pub partition_offset: u64,
}

impl HashRecord {
    pub fn new(descriptor: &HashDescriptor, source_image: &str, partition_offset: u64) -> Self {
        Self {
            version: descriptor.version,
            protection: descriptor.protection_type.to_string(),
            protection_code: descriptor.protection_type.code(),
            vmk_guid: format_guid(&descriptor.vmk_guid),
            salt: hex::encode(&descriptor.salt),
            iterations: descriptor.iteration_count,
            nonce: hex::encode(&descriptor.nonce),
            mac_ciphertext: hex::encode(&descriptor.mac_ciphertext),
            hash: descriptor.to_string(),
            source_image: source_image.to_string(),
            partition_offset,
        }
    }
}
