//! Ошибки разбора метаданных FVE

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FveError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Read out of bounds at offset {offset:#x}: needed {needed} bytes, only {available} available")]
    Truncated { offset: u64, needed: usize, available: u64 },

    #[error("Not a BitLocker partition (signature {signature:?}). Try specifying the partition offset with -o")]
    NotBitLocker { signature: String },

    #[error("Volume GUID not recognised: {0}")]
    UnrecognizedVolume(String),

    #[error("Invalid GUID: {0}")]
    InvalidGuid(String),
}

pub type Result<T> = std::result::Result<T, FveError>;
