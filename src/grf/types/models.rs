//! Core data structures shared across the reader.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use encoding_rs::Encoding;

/// Container version, stored little-endian at byte 42 of the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrfVersion {
    /// 0x200: 32-bit entry offsets, 17-byte entry trailer.
    V200,
    /// 0x300: 64-bit entry offsets, 21-byte entry trailer.
    V300,
}

impl GrfVersion {
    /// Size in bytes of the fixed trailer following each filename.
    pub fn trailer_size(&self) -> usize {
        match self {
            GrfVersion::V200 => 17,
            GrfVersion::V300 => 21,
        }
    }

    pub fn as_u32(&self) -> u32 {
        match self {
            GrfVersion::V200 => 0x200,
            GrfVersion::V300 => 0x300,
        }
    }
}

impl fmt::Display for GrfVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.as_u32())
    }
}

/// Entry type bit: set for real files, clear for directory sentinels.
pub const ENTRY_IS_FILE: u8 = 1 << 0;
/// Entry type bit: payload uses the mixed DES + shuffle scheme.
pub const ENTRY_MIX_CRYPT: u8 = 1 << 1;
/// Entry type bit: only the first 0x14 blocks are DES-encrypted.
pub const ENTRY_HEADER_CRYPT: u8 = 1 << 2;

/// Metadata for a single archived file, parsed from the central directory.
///
/// Entries are created during `load` and never mutated.
#[derive(Debug, Clone)]
pub struct FileEntry {
    /// Entry type bit field (`ENTRY_*` constants).
    pub flags: u8,
    /// Archive-absolute offset of the payload (stored offset + 46).
    pub offset: u64,
    /// On-disk payload size before inflate.
    pub compressed_size: u32,
    /// Payload size rounded up to the cipher block size; the number of
    /// bytes actually read from the source.
    pub length_aligned: u32,
    /// Uncompressed payload size. Equal to `compressed_size` for stored
    /// entries.
    pub real_size: u32,
    /// Filename bytes exactly as stored, without the NUL terminator.
    pub raw_name: Vec<u8>,
}

impl FileEntry {
    pub fn is_file(&self) -> bool {
        self.flags & ENTRY_IS_FILE != 0
    }

    pub fn is_mix_crypt(&self) -> bool {
        self.flags & ENTRY_MIX_CRYPT != 0
    }

    pub fn is_header_crypt(&self) -> bool {
        self.flags & ENTRY_HEADER_CRYPT != 0
    }

    /// Whether any cipher pass applies to the payload.
    pub fn is_encrypted(&self) -> bool {
        self.flags & (ENTRY_MIX_CRYPT | ENTRY_HEADER_CRYPT) != 0
    }

    /// Stored entries carry the payload verbatim, without deflate.
    pub fn is_stored(&self) -> bool {
        self.compressed_size == self.real_size
    }
}

/// Filename encoding selection for the central directory.
///
/// `Auto` samples the raw names and picks between UTF-8 and CP949; the
/// remaining variants force a decoder. CP949 and EUC-KR share a single
/// decoder because `encoding_rs`'s euc-kr implementation is windows-949.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilenameEncoding {
    #[default]
    Auto,
    Utf8,
    Cp949,
    EucKr,
    Latin1,
}

impl FilenameEncoding {
    /// The concrete decoder, or `None` for `Auto`.
    pub fn as_encoding(&self) -> Option<&'static Encoding> {
        match self {
            FilenameEncoding::Auto => None,
            FilenameEncoding::Utf8 => Some(encoding_rs::UTF_8),
            FilenameEncoding::Cp949 | FilenameEncoding::EucKr => Some(encoding_rs::EUC_KR),
            FilenameEncoding::Latin1 => Some(encoding_rs::WINDOWS_1252),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FilenameEncoding::Auto => "auto",
            FilenameEncoding::Utf8 => "utf-8",
            FilenameEncoding::Cp949 => "cp949",
            FilenameEncoding::EucKr => "euc-kr",
            FilenameEncoding::Latin1 => "latin-1",
        }
    }
}

impl fmt::Display for FilenameEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for FilenameEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(FilenameEncoding::Auto),
            "utf-8" | "utf8" => Ok(FilenameEncoding::Utf8),
            "cp949" | "windows-949" => Ok(FilenameEncoding::Cp949),
            "euc-kr" | "euckr" => Ok(FilenameEncoding::EucKr),
            "latin-1" | "latin1" | "windows-1252" => Ok(FilenameEncoding::Latin1),
            other => Err(format!("unknown filename encoding label: {other}")),
        }
    }
}

/// Tuning knobs accepted by [`GrfArchive::open`](crate::GrfArchive::open).
#[derive(Debug, Clone)]
pub struct GrfOptions {
    /// Decoder for filenames in the central directory.
    pub filename_encoding: FilenameEncoding,
    /// Maximum tolerated UTF-8 bad-character ratio before auto-detection
    /// considers CP949.
    pub auto_detect_threshold: f64,
    /// Entries with a larger uncompressed size are skipped during load.
    pub max_file_uncompressed_bytes: u64,
    /// Hard cap on the declared entry count; exceeding it fails `load`.
    pub max_entries: u32,
    /// Route payload reads through the shared byte pool.
    pub use_byte_pool: bool,
    /// Capacity of the decoded-bytes LRU cache.
    pub cache_capacity: usize,
}

impl Default for GrfOptions {
    fn default() -> Self {
        Self {
            filename_encoding: FilenameEncoding::Auto,
            auto_detect_threshold: 0.01,
            max_file_uncompressed_bytes: 256 * 1024 * 1024,
            max_entries: 500_000,
            use_byte_pool: true,
            cache_capacity: 50,
        }
    }
}

/// Snapshot of archive statistics, taken after `load`.
#[derive(Debug, Clone, Default)]
pub struct GrfStats {
    /// Entry count declared by the header.
    pub declared_count: u64,
    /// Entries retained after directory filtering.
    pub retained_count: u64,
    /// Decoded names containing U+FFFD or C1 control characters.
    pub bad_name_count: u64,
    /// Pairs of distinct exact names sharing a normalized form.
    pub collision_count: u64,
    /// Retained entries per lowercased extension (without the dot).
    pub extension_counts: HashMap<String, u64>,
    /// Label of the encoding used to decode filenames.
    pub detected_encoding: &'static str,
    /// Extraction-cache hits since load.
    pub cache_hits: u64,
    /// Extraction-cache misses since load.
    pub cache_misses: u64,
}

/// Outcome of resolving a query against the name indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A single entry matched; holds the exact stored name.
    Found(String),
    /// Several entries share the normalized form of the query.
    Ambiguous(Vec<String>),
    NotFound,
}
