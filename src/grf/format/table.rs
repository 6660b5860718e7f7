//! Central-directory parsing.
//!
//! The directory is a single deflate stream at `file_table_offset`
//! (version 0x300 prefixes it with 4 extra bytes) holding one record per
//! entry: a NUL-terminated filename followed by a fixed trailer of sizes,
//! a type byte, and the stored payload offset (32-bit in 0x200, split
//! 64-bit in 0x300).

use byteorder::{ByteOrder, LittleEndian};
use log::{debug, trace};

use crate::grf::codec::compression;
use crate::grf::format::header::{Header, HEADER_SIZE};
use crate::grf::source::GrfSource;
use crate::grf::types::error::{GrfError, Result};
use crate::grf::types::models::{FileEntry, GrfOptions, GrfVersion, ENTRY_IS_FILE};

/// The inflated directory with per-record filtering already applied.
#[derive(Debug, Default)]
pub struct DirectoryTable {
    /// Retained file entries, in directory order. Names are still raw
    /// bytes; decoding happens after the filename encoding is chosen.
    pub entries: Vec<FileEntry>,
    /// Entries dropped for exceeding the uncompressed-size ceiling.
    pub skipped_oversized: u64,
    /// Directory sentinels dropped for having the file bit clear.
    pub skipped_directories: u64,
}

/// Reads, inflates and walks the central directory.
pub fn parse(source: &GrfSource, header: &Header, options: &GrfOptions) -> Result<DirectoryTable> {
    let mut offset = header.file_table_offset;
    if header.version == GrfVersion::V300 {
        offset += 4;
    }

    let mut sizes = [0u8; 8];
    source.read_exact_at(offset, &mut sizes)?;
    let compressed_size = LittleEndian::read_u32(&sizes[..4]);
    let real_size = LittleEndian::read_u32(&sizes[4..]);

    let mut compressed = vec![0u8; compressed_size as usize];
    source.read_exact_at(offset + 8, &mut compressed)?;

    let buffer = compression::inflate_exact(&compressed, u64::from(real_size)).map_err(|reason| {
        GrfError::CorruptTable {
            context: format!("file table: {reason}"),
        }
    })?;

    walk_records(&buffer, header, options)
}

fn corrupt(index: u32, what: &str) -> GrfError {
    GrfError::CorruptTable {
        context: format!("entry {index}: {what}"),
    }
}

fn walk_records(buffer: &[u8], header: &Header, options: &GrfOptions) -> Result<DirectoryTable> {
    let trailer_size = header.version.trailer_size();
    let mut table = DirectoryTable {
        entries: Vec::with_capacity(header.file_count as usize),
        ..Default::default()
    };
    let mut cursor = 0usize;

    for index in 0..header.file_count {
        let rest = &buffer[cursor..];
        let nul = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| corrupt(index, "unterminated filename"))?;
        let raw_name = rest[..nul].to_vec();
        cursor += nul + 1;

        if cursor + trailer_size > buffer.len() {
            return Err(corrupt(index, "truncated record trailer"));
        }
        let trailer = &buffer[cursor..cursor + trailer_size];
        cursor += trailer_size;

        let compressed_size = LittleEndian::read_i32(&trailer[0..4]);
        let length_aligned = LittleEndian::read_i32(&trailer[4..8]);
        let real_size = LittleEndian::read_i32(&trailer[8..12]);
        if compressed_size < 0 || length_aligned < 0 || real_size < 0 {
            return Err(corrupt(index, "negative size field"));
        }
        let flags = trailer[12];

        // The 0x200 offset is unsigned 32-bit even when its top bit is
        // set; 0x300 splits a 64-bit offset across two words.
        let stored_offset = match header.version {
            GrfVersion::V200 => u64::from(LittleEndian::read_u32(&trailer[13..17])),
            GrfVersion::V300 => {
                let low = LittleEndian::read_u32(&trailer[13..17]);
                let high = LittleEndian::read_u32(&trailer[17..21]);
                (u64::from(high) << 32) + u64::from(low)
            }
        };

        if flags & ENTRY_IS_FILE == 0 {
            trace!("entry {index}: directory sentinel, skipped");
            table.skipped_directories += 1;
            continue;
        }

        let ceiling = options.max_file_uncompressed_bytes;
        if real_size as u64 > ceiling || length_aligned as u64 > ceiling {
            debug!(
                "entry {index}: {} bytes uncompressed exceeds the {} byte ceiling, skipped",
                real_size, ceiling
            );
            table.skipped_oversized += 1;
            continue;
        }

        table.entries.push(FileEntry {
            flags,
            offset: stored_offset + HEADER_SIZE as u64,
            compressed_size: compressed_size as u32,
            length_aligned: length_aligned as u32,
            real_size: real_size as u32,
            raw_name,
        });
    }

    debug!(
        "directory walked: {} retained, {} directories, {} oversized",
        table.entries.len(),
        table.skipped_directories,
        table.skipped_oversized
    );
    Ok(table)
}
