//! `$bitlocker$` hash descriptors consumed by password crackers.

use std::fmt;

use uuid::Uuid;

use crate::fve::records::{AesCcmKeyRecord, ProtectionType};

/// Число итераций растяжения ключа в BitLocker. На диске не хранится.
/// 0x100000 = 1048576
pub const ITERATION_COUNT: u32 = 0x100000;
pub const PASSWORD_HASH_VERSIONS: [u8; 2] = [0, 1];
pub const RECOVERY_HASH_VERSIONS: [u8; 2] = [2, 3];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashDescriptor {
    pub version: u8,
    pub salt: Vec<u8>,
    pub iteration_count: u32,
    pub nonce: Vec<u8>,
    pub mac_ciphertext: Vec<u8>,
    pub protection_type: ProtectionType,
    pub vmk_guid: Uuid,
}

impl HashDescriptor {
    /// По одному дескриптору на каждую ревизию формата для `protection_type`.
    /// Для TPM и прочих защит без пароля вектор пуст.
    pub fn generate(
        vmk_guid: Uuid,
        salt: &[u8],
        key: &AesCcmKeyRecord,
        protection_type: ProtectionType,
    ) -> Vec<HashDescriptor> {
        let versions = match protection_type.hash_versions() {
            Some(v) => v,
            None => return Vec::new(),
        };
        let mac_ciphertext = key.mac_and_ciphertext();

        versions
            .iter()
            .map(|&version| HashDescriptor {
                version,
                salt: salt.to_vec(),
                iteration_count: ITERATION_COUNT,
                nonce: key.nonce.to_vec(),
                mac_ciphertext: mac_ciphertext.clone(),
                protection_type,
                vmk_guid,
            })
            .collect()
    }
}

impl fmt::Display for HashDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "$bitlocker${}${}${}${}${}${}${}${}",
            self.version,
            self.salt.len(),
            hex::encode(&self.salt),
            self.iteration_count,
            self.nonce.len(),
            hex::encode(&self.nonce),
            self.mac_ciphertext.len(),
            hex::encode(&self.mac_ciphertext),
        )
    }
}
