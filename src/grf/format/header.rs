//! GRF archive header parsing.
//!
//! The header is exactly 46 bytes:
//!
//! ```text
//! [15 bytes] signature "Master of Magic"
//! [15 bytes] reserved (legacy key material, carried but never inspected)
//! [16 bytes] version-dependent payload, version as u32le in the last 4
//! ```

use byteorder::{ByteOrder, LittleEndian};
use log::{debug, warn};

use crate::grf::types::error::{GrfError, Result};
use crate::grf::types::models::GrfVersion;

/// Total header size; entry offsets are relative to this.
pub const HEADER_SIZE: usize = 46;

/// Archive signature, without terminator.
pub const SIGNATURE: &[u8; 15] = b"Master of Magic";

/// Parsed header fields.
#[derive(Debug, Clone)]
pub struct Header {
    pub version: GrfVersion,
    /// Absolute offset of the central directory.
    pub file_table_offset: u64,
    /// Declared number of entries in the central directory.
    pub file_count: u32,
    /// The 15 reserved bytes following the signature, kept verbatim.
    pub reserved: [u8; 15],
}

/// Parses the fixed 46-byte header.
///
/// Version 0x300 headers whose high offset word carries bits above the low
/// byte are re-read as mis-tagged 0x200 archives: a genuine 0x300 header
/// stores the upper half of a 64-bit offset there, while a 0x200 layout
/// overlaps it with the reserved-entry count, which routinely has nonzero
/// upper bytes.
pub fn parse(bytes: &[u8; HEADER_SIZE], max_entries: u32) -> Result<Header> {
    if &bytes[..15] != SIGNATURE {
        return Err(GrfError::InvalidMagic);
    }

    let mut reserved = [0u8; 15];
    reserved.copy_from_slice(&bytes[15..30]);

    let version = LittleEndian::read_u32(&bytes[42..46]);
    let header = match version {
        0x200 => parse_v200(bytes, reserved)?,
        0x300 => {
            let low = LittleEndian::read_u32(&bytes[30..34]);
            let high = LittleEndian::read_u32(&bytes[34..38]);
            if high >> 8 != 0 {
                warn!(
                    "version says 0x300 but high offset word is {:#x}; \
                     treating as mis-tagged 0x200",
                    high
                );
                parse_v200(bytes, reserved)?
            } else {
                let file_table_offset =
                    (u64::from(high) << 32) + u64::from(low) + HEADER_SIZE as u64;
                let file_count = LittleEndian::read_u32(&bytes[38..42]);
                Header {
                    version: GrfVersion::V300,
                    file_table_offset,
                    file_count,
                    reserved,
                }
            }
        }
        other => return Err(GrfError::UnsupportedVersion { version: other }),
    };

    if header.file_count > max_entries {
        return Err(GrfError::LimitExceeded {
            declared: u64::from(header.file_count),
            limit: u64::from(max_entries),
        });
    }

    debug!(
        "header parsed: version {}, {} entries, table at {:#x}",
        header.version, header.file_count, header.file_table_offset
    );
    Ok(header)
}

fn parse_v200(bytes: &[u8; HEADER_SIZE], reserved: [u8; 15]) -> Result<Header> {
    let table_offset = LittleEndian::read_u32(&bytes[30..34]);
    let reserved_entries = LittleEndian::read_u32(&bytes[34..38]);
    let raw_count = LittleEndian::read_u32(&bytes[38..42]);

    // The archive reserves seven pseudo-entries on top of the reserved
    // count; both are subtracted from the raw total.
    let file_count = i64::from(raw_count) - i64::from(reserved_entries) - 7;
    if file_count < 0 {
        return Err(GrfError::CorruptTable {
            context: format!(
                "negative entry count: raw {raw_count} minus reserved {reserved_entries} minus 7"
            ),
        });
    }

    Ok(Header {
        version: GrfVersion::V200,
        file_table_offset: u64::from(table_offset) + HEADER_SIZE as u64,
        file_count: file_count as u32,
        reserved,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_header(version: u32, words: [u32; 3]) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[..15].copy_from_slice(SIGNATURE);
        LittleEndian::write_u32(&mut bytes[30..34], words[0]);
        LittleEndian::write_u32(&mut bytes[34..38], words[1]);
        LittleEndian::write_u32(&mut bytes[38..42], words[2]);
        LittleEndian::write_u32(&mut bytes[42..46], version);
        bytes
    }

    #[test]
    fn parses_a_v200_header() {
        let bytes = raw_header(0x200, [100, 2, 15]);
        let header = parse(&bytes, 500_000).unwrap();
        assert_eq!(header.version, GrfVersion::V200);
        assert_eq!(header.file_table_offset, 146);
        assert_eq!(header.file_count, 6);
    }

    #[test]
    fn parses_a_v300_header_with_wide_offset() {
        let bytes = raw_header(0x300, [0x10, 0x2, 42]);
        let header = parse(&bytes, 500_000).unwrap();
        assert_eq!(header.version, GrfVersion::V300);
        assert_eq!(header.file_table_offset, (2u64 << 32) + 0x10 + 46);
        assert_eq!(header.file_count, 42);
    }

    #[test]
    fn mis_tagged_v300_falls_back_to_v200_layout() {
        // High word 0x1234 has nonzero upper bytes, so the 0x200 reading
        // applies: offset @30, reserved @34, raw count @38.
        let bytes = raw_header(0x300, [200, 0x1234, 0x1234 + 7 + 3]);
        let header = parse(&bytes, 500_000).unwrap();
        assert_eq!(header.version, GrfVersion::V200);
        assert_eq!(header.file_table_offset, 246);
        assert_eq!(header.file_count, 3);
    }

    #[test]
    fn rejects_a_bad_signature() {
        let mut bytes = raw_header(0x200, [0, 0, 7]);
        bytes[0] = b'X';
        let err = parse(&bytes, 500_000).unwrap_err();
        assert_eq!(err.code(), "InvalidMagic");
        assert!(err.to_string().contains("invalid signature"));
    }

    #[test]
    fn rejects_an_unknown_version() {
        let bytes = raw_header(0x103, [0, 0, 7]);
        let err = parse(&bytes, 500_000).unwrap_err();
        assert_eq!(err.code(), "UnsupportedVersion");
        assert!(err.to_string().contains("0x103"));
    }

    #[test]
    fn rejects_a_negative_entry_count() {
        let bytes = raw_header(0x200, [0, 10, 5]);
        let err = parse(&bytes, 500_000).unwrap_err();
        assert_eq!(err.code(), "CorruptTable");
    }

    #[test]
    fn enforces_the_entry_cap() {
        let bytes = raw_header(0x200, [0, 0, 1_000_000 + 7]);
        let err = parse(&bytes, 500_000).unwrap_err();
        assert_eq!(err.code(), "LimitExceeded");
    }
}
