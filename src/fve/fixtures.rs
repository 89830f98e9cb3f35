//! Builders for synthetic FVE structures used by the unit tests.

use uuid::Uuid;

use super::boot::BITLOCKER_GUID;

pub const SALT: [u8; 16] = [0u8; 16];
pub const NONCE: [u8; 12] = [0x11; 12];
pub const MAC: [u8; 16] = [0x22; 16];
pub const CIPHERTEXT: [u8; 4] = [0x33; 4];

pub const VMK_GUID: Uuid = Uuid::from_u128(0x0badc0de_1234_5678_9abc_def012345678);

pub fn entry(entry_type: u16, value_type: u16, payload: &[u8]) -> Vec<u8> {
    let size = (8 + payload.len()) as u16;
    let mut out = Vec::with_capacity(size as usize);
    out.extend_from_slice(&size.to_le_bytes());
    out.extend_from_slice(&entry_type.to_le_bytes());
    out.extend_from_slice(&value_type.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(payload);
    out
}

pub fn aes_ccm_entry(nonce: &[u8; 12], mac: &[u8; 16], ciphertext: &[u8]) -> Vec<u8> {
    let mut payload = nonce.to_vec();
    payload.extend_from_slice(mac);
    payload.extend_from_slice(ciphertext);
    entry(0x0000, 0x0005, &payload)
}

pub fn stretch_key_entry(salt: &[u8; 16], nested: &[u8]) -> Vec<u8> {
    let mut payload = 0x1000u32.to_le_bytes().to_vec();
    payload.extend_from_slice(salt);
    payload.extend_from_slice(nested);
    entry(0x0000, 0x0003, &payload)
}

pub fn description_entry(entry_type: u16, text: &str) -> Vec<u8> {
    let mut payload: Vec<u8> = text.encode_utf16().flat_map(|u| u.to_le_bytes()).collect();
    payload.extend_from_slice(&[0, 0]);
    entry(entry_type, 0x0002, &payload)
}

pub fn vmk_entry(guid: Uuid, protection_type: u16, properties: &[u8]) -> Vec<u8> {
    let mut payload = guid.to_bytes_le().to_vec();
    payload.extend_from_slice(&132_539_328_000_000_000u64.to_le_bytes());
    payload.extend_from_slice(&[0u8; 2]);
    payload.extend_from_slice(&protection_type.to_le_bytes());
    payload.extend_from_slice(properties);
    entry(0x0002, 0x0008, &payload)
}

/// VMK с защитой `protection_type`: stretch key (нулевая соль) и
/// зашифрованный ключ из констант выше
pub fn password_vmk(protection_type: u16) -> Vec<u8> {
    let mut properties = stretch_key_entry(&SALT, &aes_ccm_entry(&[0x44; 12], &[0x55; 16], &[0x66; 32]));
    properties.extend(aes_ccm_entry(&NONCE, &MAC, &CIPHERTEXT));
    vmk_entry(VMK_GUID, protection_type, &properties)
}

pub fn volume_header_block_entry(offset: u64, size: u64) -> Vec<u8> {
    let mut payload = offset.to_le_bytes().to_vec();
    payload.extend_from_slice(&size.to_le_bytes());
    entry(0x000f, 0x000f, &payload)
}

/// Блок метаданных 2048 байт: заголовок блока, заголовок метаданных, `entries`
pub fn metadata_block(entries: &[u8]) -> Vec<u8> {
    let mut block = vec![0u8; 2048];
    block[0..8].copy_from_slice(b"-FVE-FS-");
    block[8..10].copy_from_slice(&0x0240u16.to_le_bytes());
    block[10..12].copy_from_slice(&2u16.to_le_bytes());
    block[16..24].copy_from_slice(&0x0400_0000u64.to_le_bytes());
    block[32..40].copy_from_slice(&0x1000u64.to_le_bytes());
    block[40..48].copy_from_slice(&0x1800u64.to_le_bytes());
    block[48..56].copy_from_slice(&0x2000u64.to_le_bytes());
    block[56..64].copy_from_slice(&0x2800u64.to_le_bytes());

    let metadata_size = (112 + entries.len()) as u32;
    block[64..68].copy_from_slice(&metadata_size.to_le_bytes());
    block[68..72].copy_from_slice(&1u32.to_le_bytes());
    block[72..76].copy_from_slice(&48u32.to_le_bytes());
    block[76..80].copy_from_slice(&metadata_size.to_le_bytes());
    block[80..96].copy_from_slice(&VMK_GUID.to_bytes_le());
    block[96..100].copy_from_slice(&10u32.to_le_bytes());
    block[100..104].copy_from_slice(&0x8004u32.to_le_bytes());
    block[104..112].copy_from_slice(&132_539_328_000_000_000u64.to_le_bytes());

    block[112..112 + entries.len()].copy_from_slice(entries);
    block
}

/// Образ раздела: стандартный загрузочный сектор и три одинаковые копии
/// `block` по смещениям 0x1000, 0x1800 и 0x2000
pub fn partition_image(block: &[u8]) -> Vec<u8> {
    let mut image = vec![0u8; 0x2800];
    image[0..3].copy_from_slice(&[0xeb, 0x58, 0x90]);
    image[3..11].copy_from_slice(b"-FVE-FS-");
    image[11..13].copy_from_slice(&512u16.to_le_bytes());
    image[0xa0..0xb0].copy_from_slice(&BITLOCKER_GUID.to_bytes_le());
    for (i, offset) in [0x1000usize, 0x1800, 0x2000].iter().enumerate() {
        let field = 0xb0 + i * 8;
        image[field..field + 8].copy_from_slice(&(*offset as u64).to_le_bytes());
        image[*offset..*offset + block.len()].copy_from_slice(block);
    }
    image
}
