//! Random-access reader for GRF archives, the asset container used by the
//! Ragnarok Online client.
//!
//! A GRF bundles thousands of sprites, maps, sounds and scripts behind a
//! 46-byte header and a compressed central directory. Payloads are
//! deflate-compressed; protected entries additionally pass through a
//! keyless single-round DES variant before inflation. Filenames are stored
//! as raw bytes in either UTF-8 or CP949, so the reader scores both
//! decodings and repairs the common CP949-as-latin-1 mojibake.
//!
//! Supports container versions 0x200 and 0x300 (v1.x archives are not
//! supported). The reader never writes or modifies archives.
//!
//! # Example
//!
//! ```no_run
//! use grf_reader::{FindCriteria, GrfArchive, GrfOptions};
//!
//! # fn main() -> grf_reader::Result<()> {
//! let mut archive = GrfArchive::open_path("data.grf", GrfOptions::default())?;
//! archive.load()?;
//!
//! let sprite = archive.get_file("data\\sprite\\poring.spr")?;
//! println!("{} bytes", sprite.len());
//!
//! let maps = archive.find(&FindCriteria {
//!     extension: Some("gat".into()),
//!     ..Default::default()
//! });
//! println!("{} maps, encoding {:?}", maps.len(), archive.get_detected_encoding());
//! # Ok(())
//! # }
//! ```

pub mod grf;

pub use grf::{
    FileEntry, FilenameEncoding, FindCriteria, GrfArchive, GrfError, GrfOptions, GrfSource,
    GrfStats, GrfVersion, Regex, Resolution, Result,
};
