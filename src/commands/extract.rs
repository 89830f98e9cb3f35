use std::io::{self, Read, Seek, Write};
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::Result;
use crate::fve::boot::BitLockerBootSector;
use crate::fve::header::FVE_BLOCK_SIZE;
use crate::fve::parser::{walk_metadata_block, MetadataWalk};
use crate::fve::reader::BoundedReader;
use crate::fve::utils::format_guid;
use crate::hash::HashDescriptor;
use crate::models::HashRecord;
use crate::output::JsonlWriter;

#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    pub offset: u64,
    pub out_json: Option<PathBuf>,
    pub all_copies: bool,
}

#[derive(Debug)]
pub struct Extraction {
    pub boot: BitLockerBootSector,
    pub walk: MetadataWalk,
    /// Заполняется только при сверке резервных копий
    pub copies_agree: Option<bool>,
}

/// Опознаёт том и разбирает первую копию метаданных. Две другие копии
/// читаются только при `all_copies`.
///
/// Строки `[+]` о загрузочном секторе пишутся в `out` по мере чтения полей,
/// поэтому при фатальной ошибке (чужой GUID, обрезанный образ) всё, что
/// успели опознать, уже выведено.
pub fn extract<R: Read + Seek, W: Write>(
    reader: &mut BoundedReader<R>,
    all_copies: bool,
    out: &mut W,
) -> Result<Extraction> {
    let (layout, sector_size) = BitLockerBootSector::read_signature(reader)?;
    writeln!(out, "[+] BitLocker signature found: {} (sector size {})", layout.signature(), sector_size)?;

    let volume_guid = BitLockerBootSector::read_volume_guid(reader, layout)?;
    let kind = match BitLockerBootSector::identify(&volume_guid, layout) {
        Ok(kind) => kind,
        Err(e) => {
            writeln!(out, "[!] Volume GUID not recognised: {}", format_guid(&volume_guid))?;
            return Err(e);
        }
    };
    writeln!(out, "[+] Identified volume GUID: {} = {}", format_guid(&volume_guid), kind)?;

    let metadata_offsets = BitLockerBootSector::read_metadata_offsets(reader, layout)?;
    let base = reader.base();
    let shown: Vec<String> = metadata_offsets.iter().map(|o| format!("{:#x}", o.saturating_add(base))).collect();
    writeln!(out, "[+] FVE metadata info found at offsets [{}]", shown.join(", "))?;

    let boot = BitLockerBootSector { layout, sector_size, volume_guid, kind, metadata_offsets };

    let block = reader.read_exact_at(boot.metadata_offsets[0], FVE_BLOCK_SIZE)?;
    let walk = walk_metadata_block(&block)?;

    let copies_agree = if all_copies {
        Some(cross_validate(reader, &boot, &walk))
    } else {
        None
    };

    Ok(Extraction { boot, walk, copies_agree })
}

fn cross_validate<R: Read + Seek>(
    reader: &mut BoundedReader<R>,
    boot: &BitLockerBootSector,
    first: &MetadataWalk,
) -> bool {
    let mut agree = true;
    for (index, &offset) in boot.metadata_offsets.iter().enumerate().skip(1) {
        let copy = index + 1;
        let other = match reader
            .read_exact_at(offset, FVE_BLOCK_SIZE)
            .and_then(|block| walk_metadata_block(&block))
        {
            Ok(walk) => walk,
            Err(e) => {
                warn!(copy, offset = %format!("{:#x}", offset), error = %e, "metadata copy unreadable");
                agree = false;
                continue;
            }
        };

        if other.hashes == first.hashes {
            info!(copy, hashes = other.hashes.len(), "metadata copy matches the first copy");
        } else {
            warn!(
                copy,
                first = first.hashes.len(),
                this = other.hashes.len(),
                "metadata copy yields different hashes than the first copy"
            );
            agree = false;
        }
    }
    agree
}

// Всё, что известно только после разбора блока
fn print_report<W: Write>(extraction: &Extraction, out: &mut W) -> io::Result<()> {
    let walk = &extraction.walk;

    let header = &walk.metadata_header;
    writeln!(
        out,
        "[*] Metadata block version {}, metadata size {}, encrypted volume size {}",
        walk.block_header.version, header.metadata_size, walk.block_header.encrypted_volume_size
    )?;
    writeln!(
        out,
        "[*] Volume GUID: {}, encryption method: {}, created {}",
        format_guid(&header.volume_guid),
        header.encryption_method,
        header.creation_time.to_rfc3339()
    )?;
    for description in &walk.descriptions {
        writeln!(out, "[*] Info: {}", description)?;
    }
    if let Some(vhb) = &walk.volume_header_block {
        writeln!(out, "[*] Volume header block: offset {:#x}, size {}", vhb.offset, vhb.size)?;
    }

    for vmk in &walk.protectors {
        writeln!(
            out,
            "[+] VMK {}: {:#x} = {} (modified {})",
            format_guid(&vmk.guid),
            vmk.protection_type.code(),
            vmk.protection_type,
            vmk.modified.to_rfc3339()
        )?;
        if let Some(description) = &vmk.description {
            writeln!(out, "    Description: {}", description)?;
        }
        if vmk.hashes > 0 {
            writeln!(out, "    Found {} hash(es)", vmk.hashes)?;
        }
    }

    match extraction.copies_agree {
        Some(true) => writeln!(out, "[+] All three metadata copies agree")?,
        Some(false) => writeln!(out, "[!] Metadata copies disagree, only the first copy is reported")?,
        None => {}
    }
    Ok(())
}

fn write_jsonl(path: &Path, hashes: &[HashDescriptor], image: &Path, offset: u64) -> Result<usize> {
    let mut writer = JsonlWriter::create(path)?;
    let source = image.to_string_lossy();
    for descriptor in hashes {
        writer.write(&HashRecord::new(descriptor, &source, offset))?;
    }
    let written = writer.written();
    writer.finish()?;
    Ok(written)
}

pub fn run(image: &Path, options: &ExtractOptions) -> Result<Vec<HashDescriptor>> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    run_to(image, options, &mut out)
}

/// То же, что `run`, но отчёт пишется в произвольный поток.
pub fn run_to<W: Write>(image: &Path, options: &ExtractOptions, out: &mut W) -> Result<Vec<HashDescriptor>> {
    writeln!(out, "[*] Opening {} (partition offset {:#x})", image.display(), options.offset)?;

    let mut reader = BoundedReader::open(image, options.offset)?;
    let extraction = extract(&mut reader, options.all_copies, out)?;
    print_report(&extraction, out)?;

    let hashes = extraction.walk.hashes;
    if let Some(path) = &options.out_json {
        let written = write_jsonl(path, &hashes, image, options.offset)?;
        writeln!(out, "[*] Wrote {} record(s) to {}", written, path.display())?;
    }

    if hashes.is_empty() {
        writeln!(out, "\nNo hashes associated with the user password or recovery password found.")?;
    } else {
        writeln!(out, "\nThe following hashes were found:")?;
        for descriptor in &hashes {
            writeln!(out, "{}", descriptor)?;
        }
    }
    out.flush()?;

    Ok(hashes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FveError;
    use crate::fve::fixtures::{metadata_block, partition_image, password_vmk};
    use serde_json::Value;
    use std::io::{Cursor, Write};
    use tempfile::NamedTempFile;

    fn image_file(bytes: &[u8]) -> NamedTempFile {
        let mut tmpfile = NamedTempFile::new().unwrap();
        tmpfile.write_all(bytes).unwrap();
        tmpfile.flush().unwrap();
        tmpfile
    }

    #[test]
    fn test_extract_at_partition_offset() {
        let mut image = vec![0u8; 0x10_0000];
        image.extend(partition_image(&metadata_block(&password_vmk(0x2000))));
        let mut reader = BoundedReader::new(Cursor::new(image), 0x10_0000).unwrap();

        let extraction = extract(&mut reader, false, &mut io::sink()).unwrap();
        assert_eq!(extraction.walk.hashes.len(), 2);
        assert!(extraction.copies_agree.is_none());
    }

    #[test]
    fn test_run_writes_jsonl_and_is_repeatable() {
        let tmpfile = image_file(&partition_image(&metadata_block(&password_vmk(0x0800))));
        let json_out = NamedTempFile::new().unwrap();
        let options = ExtractOptions {
            offset: 0,
            out_json: Some(json_out.path().to_path_buf()),
            all_copies: false,
        };

        let first = run(tmpfile.path(), &options).unwrap();
        let second = run(tmpfile.path(), &options).unwrap();
        let first_lines: Vec<String> = first.iter().map(|h| h.to_string()).collect();
        let second_lines: Vec<String> = second.iter().map(|h| h.to_string()).collect();
        assert_eq!(first_lines, second_lines);
        assert_eq!(first_lines.len(), 2);

        let report = std::fs::read_to_string(json_out.path()).unwrap();
        let records: Vec<Value> = report.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["Version"], 2);
        assert_eq!(records[1]["Version"], 3);
        assert_eq!(records[0]["Hash"], first_lines[0].as_str());
        assert_eq!(records[0]["Iterations"], 1048576);
    }

    #[test]
    fn test_tpm_only_volume_is_not_an_error() {
        let tmpfile = image_file(&partition_image(&metadata_block(&password_vmk(0x0100))));
        let hashes = run(tmpfile.path(), &ExtractOptions::default()).unwrap();
        assert!(hashes.is_empty());
    }

    #[test]
    fn test_not_bitlocker_image() {
        let mut bytes = vec![0u8; 4096];
        bytes[3..11].copy_from_slice(b"NTFS    ");
        let tmpfile = image_file(&bytes);
        assert!(matches!(
            run(tmpfile.path(), &ExtractOptions::default()),
            Err(FveError::NotBitLocker { .. })
        ));
    }

    #[test]
    fn test_metadata_block_past_end_is_truncated() {
        let mut image = partition_image(&metadata_block(&password_vmk(0x2000)));
        image.truncate(0x1400);
        let mut reader = BoundedReader::new(Cursor::new(image), 0).unwrap();
        assert!(matches!(extract(&mut reader, false, &mut io::sink()), Err(FveError::Truncated { .. })));
    }

    #[test]
    fn test_boot_lines_precede_unrecognized_volume_error() {
        let mut bytes = partition_image(&metadata_block(&password_vmk(0x2000)));
        bytes[0xa0..0xb0].copy_from_slice(&[0x5a; 16]);
        let tmpfile = image_file(&bytes);

        let mut report = Vec::new();
        let result = run_to(tmpfile.path(), &ExtractOptions::default(), &mut report);
        assert!(matches!(result, Err(FveError::UnrecognizedVolume(_))));

        let report = String::from_utf8(report).unwrap();
        assert!(report.contains("[+] BitLocker signature found: -FVE-FS- (sector size 512)"));
        assert!(report.contains("[!] Volume GUID not recognised: 5A5A5A5A-5A5A-5A5A-5A5A-5A5A5A5A5A5A"));
        assert!(!report.contains("FVE metadata info found"));
    }

    #[test]
    fn test_boot_lines_precede_truncated_metadata_error() {
        let mut bytes = partition_image(&metadata_block(&password_vmk(0x2000)));
        bytes.truncate(0x1400);
        let tmpfile = image_file(&bytes);

        let mut report = Vec::new();
        let result = run_to(tmpfile.path(), &ExtractOptions::default(), &mut report);
        assert!(matches!(result, Err(FveError::Truncated { .. })));

        let report = String::from_utf8(report).unwrap();
        let lines: Vec<&str> = report.lines().collect();
        assert!(lines[1].starts_with("[+] BitLocker signature found"));
        assert_eq!(lines[2], "[+] Identified volume GUID: 4967D63B-2E29-4AD8-8399-F6A339E3D001 = BitLocker");
        assert_eq!(lines[3], "[+] FVE metadata info found at offsets [0x1000, 0x1800, 0x2000]");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn test_report_ends_with_hash_lines() {
        let tmpfile = image_file(&partition_image(&metadata_block(&password_vmk(0x2000))));
        let mut report = Vec::new();
        let hashes = run_to(tmpfile.path(), &ExtractOptions::default(), &mut report).unwrap();

        let report = String::from_utf8(report).unwrap();
        let tail: Vec<&str> = report.lines().rev().take(3).collect();
        assert_eq!(tail[2], "The following hashes were found:");
        assert_eq!(tail[1], hashes[0].to_string());
        assert_eq!(tail[0], hashes[1].to_string());
    }

    #[test]
    fn test_all_copies_agree() {
        let image = partition_image(&metadata_block(&password_vmk(0x2000)));
        let mut reader = BoundedReader::new(Cursor::new(image), 0).unwrap();
        let extraction = extract(&mut reader, true, &mut io::sink()).unwrap();
        assert_eq!(extraction.copies_agree, Some(true));
        assert_eq!(extraction.walk.hashes.len(), 2);
    }

    #[test]
    fn test_all_copies_disagree_keeps_first_copy_output() {
        let mut image = partition_image(&metadata_block(&password_vmk(0x2000)));
        let tpm_block = metadata_block(&password_vmk(0x0100));
        image[0x2000..0x2800].copy_from_slice(&tpm_block);
        let mut reader = BoundedReader::new(Cursor::new(image), 0).unwrap();

        let extraction = extract(&mut reader, true, &mut io::sink()).unwrap();
        assert_eq!(extraction.copies_agree, Some(false));
        assert_eq!(extraction.walk.hashes.len(), 2);
    }
}
