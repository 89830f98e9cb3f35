//! fve_hash_forge - извлечение хэшей BitLocker из сырых образов томов
//!
//! Читает метаданные FVE тома BitLocker, обходит защиты ключа (VMK) и
//! превращает каждый VMK под паролем или паролем восстановления в строки
//! `$bitlocker$` для офлайн-подбора. Ничего не расшифровывается.
//!
//! # Пример
//!
//! ```no_run
//! use fve_hash_forge::commands::extract::extract;
//! use fve_hash_forge::fve::reader::BoundedReader;
//!
//! fn main() -> fve_hash_forge::Result<()> {
//!     // Раздел BitLocker с сектора 2048
//!     let mut reader = BoundedReader::open("disk.dd", 0x100000)?;
//!     let extraction = extract(&mut reader, false, &mut std::io::sink())?;
//!
//!     for hash in &extraction.walk.hashes {
//!         println!("{}", hash);
//!     }
//!     Ok(())
//! }
//! ```

pub mod commands;
pub mod error;
pub mod fve;
pub mod hash;
pub mod models;
pub mod output;

pub use error::{FveError, Result};
pub use hash::HashDescriptor;
