//! Core GRF reader module.

pub mod cache;
pub mod codec;
pub mod encoding;
pub mod format;
pub mod pool;
pub mod reader;
pub mod resolve;
pub mod source;
pub mod types;

pub use reader::GrfArchive;
pub use resolve::{FindCriteria, Regex};
pub use source::GrfSource;
pub use types::error::{GrfError, Result};
pub use types::models::{FileEntry, FilenameEncoding, GrfOptions, GrfStats, GrfVersion, Resolution};
