use byteorder::{ByteOrder, LittleEndian};
use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

use crate::error::{FveError, Result};

/// Windows FILETIME (интервалы по 100 нс с 1601-01-01) в DateTime<Utc>.
/// Значения до Unix epoch прижимаются к epoch.
pub fn filetime_to_datetime(filetime: u64) -> DateTime<Utc> {
    let unix_time_100ns = filetime.saturating_sub(116_444_736_000_000_000);
    let seconds = (unix_time_100ns / 10_000_000) as i64;
    let nanoseconds = ((unix_time_100ns % 10_000_000) * 100) as u32;

    Utc.timestamp_opt(seconds, nanoseconds)
        .single()
        .unwrap_or_default()
}

/// Беззнаковое little-endian число из 1..8 байт. Лишние байты игнорируются.
pub fn read_uint_le(bytes: &[u8]) -> u64 {
    let nbytes = bytes.len().min(8);
    if nbytes == 0 {
        return 0;
    }
    LittleEndian::read_uint(bytes, nbytes)
}

/// GUID в дисковом порядке: первые три поля little-endian, остальные как есть
pub fn guid_from_le_bytes(bytes: &[u8]) -> Option<Uuid> {
    Uuid::from_slice_le(bytes).ok()
}

pub fn format_guid(guid: &Uuid) -> String {
    guid.hyphenated().to_string().to_uppercase()
}

/// hex сырых байт GUID с диска -> каноническая строка GUID в верхнем регистре
pub fn hex_to_guid(hex_str: &str) -> Result<String> {
    let bytes = hex::decode(hex_str).map_err(|e| FveError::InvalidGuid(format!("{}: {}", hex_str, e)))?;
    let guid = guid_from_le_bytes(&bytes)
        .ok_or_else(|| FveError::InvalidGuid(format!("{}: expected 16 bytes, got {}", hex_str, bytes.len())))?;
    Ok(format_guid(&guid))
}

pub fn guid_to_hex(guid: &str) -> Result<String> {
    let parsed = Uuid::parse_str(guid).map_err(|e| FveError::InvalidGuid(format!("{}: {}", guid, e)))?;
    Ok(hex::encode(parsed.to_bytes_le()))
}
