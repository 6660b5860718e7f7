//! The main archive reader.
//!
//! A [`GrfArchive`] is created unloaded, parses the container exactly once
//! on [`load`](GrfArchive::load), and serves queries against immutable
//! indices afterwards. Extraction runs read → decipher → inflate per
//! entry, with decoded payloads kept in a bounded LRU cache.

use std::path::Path;

use log::{debug, info, trace};

use crate::grf::cache::ExtractionCache;
use crate::grf::codec::{compression, des};
use crate::grf::encoding;
use crate::grf::format::header::{self, HEADER_SIZE};
use crate::grf::format::table;
use crate::grf::pool;
use crate::grf::resolve::{FindCriteria, NameIndex};
use crate::grf::source::GrfSource;
use crate::grf::types::error::{GrfError, Result};
use crate::grf::types::models::{
    FileEntry, FilenameEncoding, GrfOptions, GrfStats, GrfVersion, Resolution,
};

/// Candidate names included in an [`AmbiguousPath`](GrfError::AmbiguousPath)
/// error.
const AMBIGUOUS_CANDIDATE_LIMIT: usize = 5;

/// A random-access reader over one GRF archive.
pub struct GrfArchive {
    source: GrfSource,
    options: GrfOptions,
    state: Option<LoadedState>,
}

/// Everything produced by a successful `load`. Immutable afterwards except
/// for the cache, which serializes itself.
struct LoadedState {
    version: GrfVersion,
    declared_count: u32,
    encoding: FilenameEncoding,
    index: NameIndex,
    bad_name_count: u64,
    cache: ExtractionCache,
}

impl GrfArchive {
    /// Wraps a source without touching it. Parsing happens in [`load`].
    ///
    /// [`load`]: Self::load
    pub fn open(source: impl Into<GrfSource>, options: GrfOptions) -> Self {
        Self {
            source: source.into(),
            options,
            state: None,
        }
    }

    /// Convenience constructor for a local archive file.
    pub fn open_path(path: impl AsRef<Path>, options: GrfOptions) -> Result<Self> {
        Ok(Self::open(GrfSource::open(path)?, options))
    }

    pub fn is_loaded(&self) -> bool {
        self.state.is_some()
    }

    /// Parses the header and central directory and builds the name
    /// indices. Idempotent: subsequent calls return without re-parsing.
    pub fn load(&mut self) -> Result<()> {
        if self.state.is_some() {
            trace!("load called on a loaded archive; nothing to do");
            return Ok(());
        }

        info!("loading GRF archive ({} bytes)", self.source.len());
        let mut header_bytes = [0u8; HEADER_SIZE];
        self.source.read_exact_at(0, &mut header_bytes)?;
        let header = header::parse(&header_bytes, self.options.max_entries)?;

        let directory = table::parse(&self.source, &header, &self.options)?;

        let chosen = match self.options.filename_encoding {
            FilenameEncoding::Auto => {
                let detected = encoding::detect_encoding(
                    directory.entries.iter().map(|e| e.raw_name.as_slice()),
                    self.options.auto_detect_threshold,
                );
                debug!("auto-detected filename encoding: {detected}");
                detected
            }
            forced => forced,
        };
        // Detection only ever yields concrete encodings, so the fallback
        // arm is unreachable in practice.
        let decoder = chosen.as_encoding().unwrap_or(encoding_rs::UTF_8);

        let mut index = NameIndex::with_capacity(directory.entries.len());
        let mut bad_name_count = 0u64;
        for entry in directory.entries {
            let name = encoding::decode_filename(&entry.raw_name, decoder);
            if encoding::is_damaged_name(&name) {
                bad_name_count += 1;
            }
            index.insert(name, entry);
        }

        info!(
            "archive loaded: version {}, {} of {} declared entries retained, \
             {} collisions, encoding {}",
            header.version,
            index.len(),
            header.file_count,
            index.collision_count(),
            chosen
        );

        self.state = Some(LoadedState {
            version: header.version,
            declared_count: header.file_count,
            encoding: chosen,
            index,
            bad_name_count,
            cache: ExtractionCache::new(self.options.cache_capacity),
        });
        Ok(())
    }

    /// Drops the loaded state and loads again with a different filename
    /// encoding. Requires exclusive access, so in-flight queries must
    /// finish first.
    pub fn reload_with_encoding(&mut self, encoding: FilenameEncoding) -> Result<()> {
        info!("reloading archive with encoding {encoding}");
        self.state = None;
        self.options.filename_encoding = encoding;
        self.load()
    }

    fn loaded(&self) -> Result<&LoadedState> {
        self.state.as_ref().ok_or(GrfError::NotLoaded)
    }

    /// Extracts a file by name, case- and slash-insensitively.
    ///
    /// An ambiguous name is an error carrying up to five candidates; it is
    /// never silently picked. Per-entry failures (bad offset, failed
    /// inflate) are recoverable and leave the archive usable.
    pub fn get_file(&self, name: &str) -> Result<Vec<u8>> {
        let state = self.loaded()?;
        let exact = match state.index.resolve(name) {
            Resolution::Found(exact) => exact,
            Resolution::Ambiguous(mut candidates) => {
                candidates.truncate(AMBIGUOUS_CANDIDATE_LIMIT);
                return Err(GrfError::AmbiguousPath {
                    name: name.to_string(),
                    candidates,
                });
            }
            Resolution::NotFound => {
                return Err(GrfError::FileNotFound {
                    name: name.to_string(),
                })
            }
        };

        if let Some(data) = state.cache.get(&exact) {
            trace!("cache hit for {exact:?}");
            return Ok(data);
        }

        let Some(entry) = state.index.get(&exact) else {
            return Err(GrfError::FileNotFound { name: exact });
        };
        let data = self.extract(&exact, entry)?;
        state.cache.insert(exact, data.clone());
        Ok(data)
    }

    /// Runs the read → decipher → inflate pipeline for one entry.
    fn extract(&self, name: &str, entry: &FileEntry) -> Result<Vec<u8>> {
        let length = u64::from(entry.length_aligned);
        match entry.offset.checked_add(length) {
            Some(end) if end <= self.source.len() => {}
            _ => {
                return Err(GrfError::InvalidOffset {
                    name: name.to_string(),
                    offset: entry.offset,
                    length,
                    source_len: self.source.len(),
                })
            }
        }

        if entry.compressed_size > entry.length_aligned {
            return Err(GrfError::CorruptTable {
                context: format!(
                    "entry {name}: compressed size {} exceeds aligned length {}",
                    entry.compressed_size, entry.length_aligned
                ),
            });
        }
        if entry.is_encrypted() && entry.length_aligned % des::BLOCK_SIZE as u32 != 0 {
            return Err(GrfError::CorruptTable {
                context: format!(
                    "entry {name}: encrypted payload of {} bytes is not block-aligned",
                    entry.length_aligned
                ),
            });
        }

        trace!(
            "extracting {name:?}: {} bytes at {:#x}, flags {:#04b}",
            entry.length_aligned,
            entry.offset,
            entry.flags
        );

        let mut scratch;
        let mut plain;
        let payload: &mut [u8] = if self.options.use_byte_pool {
            scratch = pool::global_pool().acquire(entry.length_aligned as usize);
            &mut scratch
        } else {
            plain = vec![0u8; entry.length_aligned as usize];
            &mut plain
        };
        self.source.read_exact_at(entry.offset, payload)?;

        if entry.is_mix_crypt() {
            des::decrypt_mixed(payload, entry.compressed_size);
        } else if entry.is_header_crypt() {
            des::decrypt_header_only(payload);
        }

        let compressed = &payload[..entry.compressed_size as usize];
        if entry.is_stored() {
            // Stored payload: drop only the block-alignment padding.
            return Ok(compressed.to_vec());
        }

        compression::inflate_exact(compressed, u64::from(entry.real_size)).map_err(|reason| {
            GrfError::DecompressFail {
                name: name.to_string(),
                reason,
            }
        })
    }

    /// Whether a query resolves to exactly one entry.
    pub fn has_file(&self, name: &str) -> bool {
        matches!(self.resolve_path(name), Resolution::Found(_))
    }

    /// Entry metadata for a query resolving to exactly one entry.
    pub fn get_entry(&self, name: &str) -> Option<&FileEntry> {
        let state = self.state.as_ref()?;
        match state.index.resolve(name) {
            Resolution::Found(exact) => state.index.get(&exact),
            _ => None,
        }
    }

    /// Resolves a query without extracting anything.
    pub fn resolve_path(&self, name: &str) -> Resolution {
        match &self.state {
            Some(state) => state.index.resolve(name),
            None => Resolution::NotFound,
        }
    }

    /// Exact names matching the conjunctive filters, in directory order.
    pub fn find(&self, criteria: &FindCriteria) -> Vec<String> {
        match &self.state {
            Some(state) => state.index.find(criteria),
            None => Vec::new(),
        }
    }

    /// Exact names carrying the given extension, in directory order.
    pub fn get_files_by_extension(&self, extension: &str) -> Vec<String> {
        match &self.state {
            Some(state) => state.index.names_with_extension(extension),
            None => Vec::new(),
        }
    }

    /// All indexed extensions, sorted.
    pub fn list_extensions(&self) -> Vec<String> {
        match &self.state {
            Some(state) => state.index.extensions(),
            None => Vec::new(),
        }
    }

    /// Exact names in central-directory order.
    pub fn list_files(&self) -> &[String] {
        match &self.state {
            Some(state) => state.index.names(),
            None => &[],
        }
    }

    /// Number of retained entries.
    pub fn entry_count(&self) -> usize {
        self.state.as_ref().map_or(0, |s| s.index.len())
    }

    /// Container version, once loaded.
    pub fn version(&self) -> Option<GrfVersion> {
        self.state.as_ref().map(|s| s.version)
    }

    /// The filename encoding in effect, once loaded.
    pub fn get_detected_encoding(&self) -> Option<FilenameEncoding> {
        self.state.as_ref().map(|s| s.encoding)
    }

    /// Snapshot of load-time statistics and cache counters.
    pub fn get_stats(&self) -> GrfStats {
        match &self.state {
            Some(state) => {
                let (cache_hits, cache_misses) = state.cache.counters();
                GrfStats {
                    declared_count: u64::from(state.declared_count),
                    retained_count: state.index.len() as u64,
                    bad_name_count: state.bad_name_count,
                    collision_count: state.index.collision_count(),
                    extension_counts: state.index.extension_counts(),
                    detected_encoding: state.encoding.label(),
                    cache_hits,
                    cache_misses,
                }
            }
            None => GrfStats::default(),
        }
    }

    /// Empties the extraction cache.
    pub fn clear_cache(&self) {
        if let Some(state) = &self.state {
            state.cache.clear();
        }
    }
}
