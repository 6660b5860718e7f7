//! Random-read sources backing an archive.
//!
//! The reader only ever needs one capability from storage: read exactly N
//! bytes at an absolute offset. [`GrfSource`] is a tagged enum over the
//! supported backends, so the hot path stays free of dynamic dispatch.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use log::info;

use crate::grf::types::error::Result;

/// A byte source supporting exact positional reads.
#[derive(Debug)]
pub enum GrfSource {
    /// A local file. Seek+read pairs are serialized by the mutex so
    /// concurrent extractions on the same archive stay well-formed.
    File {
        file: Mutex<File>,
        length: u64,
        path: PathBuf,
    },
    /// An in-memory blob (downloaded archive, test fixture).
    Memory(Vec<u8>),
}

impl GrfSource {
    /// Opens a local file as a source.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let length = file.metadata()?.len();
        info!("opened GRF source {} ({} bytes)", path.display(), length);
        Ok(GrfSource::File {
            file: Mutex::new(file),
            length,
            path: path.to_path_buf(),
        })
    }

    /// Wraps an in-memory buffer as a source.
    pub fn from_bytes(data: Vec<u8>) -> Self {
        GrfSource::Memory(data)
    }

    /// Total size of the source in bytes.
    pub fn len(&self) -> u64 {
        match self {
            GrfSource::File { length, .. } => *length,
            GrfSource::Memory(data) => data.len() as u64,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reads exactly `buf.len()` bytes at `offset`. A short read is an
    /// error, never a truncated result.
    pub fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        match self {
            GrfSource::File { file, .. } => {
                // A poisoned lock only means another thread panicked
                // mid-read; the file handle itself is still usable.
                let mut file = match file.lock() {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                file.seek(SeekFrom::Start(offset))?;
                file.read_exact(buf)?;
                Ok(())
            }
            GrfSource::Memory(data) => {
                let end = offset
                    .checked_add(buf.len() as u64)
                    .filter(|&end| end <= data.len() as u64)
                    .ok_or_else(|| {
                        io::Error::new(
                            io::ErrorKind::UnexpectedEof,
                            format!(
                                "read of {} bytes at offset {} exceeds source length {}",
                                buf.len(),
                                offset,
                                data.len()
                            ),
                        )
                    })?;
                buf.copy_from_slice(&data[offset as usize..end as usize]);
                Ok(())
            }
        }
    }
}

impl From<Vec<u8>> for GrfSource {
    fn from(data: Vec<u8>) -> Self {
        GrfSource::from_bytes(data)
    }
}
