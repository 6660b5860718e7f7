//! Error types for the grf-reader crate.

use thiserror::Error;

/// The primary error type for all operations in this crate.
///
/// Archive-level failures (`InvalidMagic`, `UnsupportedVersion`,
/// `CorruptTable`, `LimitExceeded`) are returned from [`load`] and leave the
/// archive unusable. Per-entry failures (`FileNotFound`, `AmbiguousPath`,
/// `DecompressFail`, `InvalidOffset`) are returned from [`get_file`] and
/// leave the archive intact.
///
/// [`load`]: crate::GrfArchive::load
/// [`get_file`]: crate::GrfArchive::get_file
#[derive(Debug, Error)]
pub enum GrfError {
    /// An error originating from I/O operations, including short reads.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file does not begin with the `Master of Magic` signature.
    #[error("invalid signature: not a GRF archive")]
    InvalidMagic,

    /// The header declares a version other than 0x200 or 0x300.
    #[error("unsupported GRF version {version:#x}; only 0x200 and 0x300 are supported")]
    UnsupportedVersion { version: u32 },

    /// A query method was called before `load` succeeded.
    #[error("archive is not loaded; call load() first")]
    NotLoaded,

    /// The resolver found no entry for the queried name.
    #[error("file not found: {name}")]
    FileNotFound { name: String },

    /// The normalized form of the query matches several distinct entries.
    /// `candidates` holds at most five exact names.
    #[error("ambiguous path {name}: matches {candidates:?}")]
    AmbiguousPath {
        name: String,
        candidates: Vec<String>,
    },

    /// Inflate failed or produced a payload of the wrong length.
    #[error("decompression failed for {name}: {reason}")]
    DecompressFail { name: String, reason: String },

    /// The central directory cannot be parsed.
    #[error("corrupt file table: {context}")]
    CorruptTable { context: String },

    /// The declared entry count exceeds the configured cap.
    #[error("declared entry count {declared} exceeds the limit of {limit}")]
    LimitExceeded { declared: u64, limit: u64 },

    /// An entry's payload range lies beyond the end of the source.
    #[error("invalid offset for {name}: {offset}+{length} exceeds source length {source_len}")]
    InvalidOffset {
        name: String,
        offset: u64,
        length: u64,
        source_len: u64,
    },

    /// Reserved for archives using an encryption scheme this crate cannot
    /// decrypt. Never produced today.
    #[error("entry {name} requires an unsupported decryption scheme")]
    DecryptRequired { name: String },
}

impl GrfError {
    /// Stable code string for programmatic matching.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Io(_) => "Io",
            Self::InvalidMagic => "InvalidMagic",
            Self::UnsupportedVersion { .. } => "UnsupportedVersion",
            Self::NotLoaded => "NotLoaded",
            Self::FileNotFound { .. } => "FileNotFound",
            Self::AmbiguousPath { .. } => "AmbiguousPath",
            Self::DecompressFail { .. } => "DecompressFail",
            Self::CorruptTable { .. } => "CorruptTable",
            Self::LimitExceeded { .. } => "LimitExceeded",
            Self::InvalidOffset { .. } => "InvalidOffset",
            Self::DecryptRequired { .. } => "DecryptRequired",
        }
    }

    /// Whether the archive remains usable after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NotLoaded
                | Self::FileNotFound { .. }
                | Self::AmbiguousPath { .. }
                | Self::DecompressFail { .. }
                | Self::InvalidOffset { .. }
                | Self::DecryptRequired { .. }
        )
    }
}

/// A convenience `Result` type alias using the crate's `GrfError` type.
pub type Result<T> = std::result::Result<T, GrfError>;
