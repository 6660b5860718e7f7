//! Name indices, path resolution, and the find() filter.
//!
//! Three indices are built during load and frozen afterwards:
//!
//! - exact name -> entry (unique)
//! - normalized name -> exact names sharing it, in directory order
//! - extension -> exact names, in directory order
//!
//! Normalization is ASCII lowercasing plus backslash-to-slash conversion;
//! two distinct exact names sharing a normalized form are a *collision*
//! and stay individually addressable by their exact spelling.

use std::collections::HashMap;

use log::{debug, trace};
pub use regex::Regex;

use crate::grf::types::models::{FileEntry, Resolution};

/// Lowercases and forward-slashes a path for case/slash-insensitive
/// lookup. Lowercasing is ASCII-only; multibyte names compare byte-exact.
pub fn normalize(name: &str) -> String {
    let mut normalized = name.to_ascii_lowercase();
    if normalized.contains('\\') {
        normalized = normalized.replace('\\', "/");
    }
    normalized
}

/// The lowercased extension without its dot, if the final path component
/// has a non-empty one.
pub fn extension_of(name: &str) -> Option<String> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let (stem, ext) = base.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Conjunctive filters accepted by [`find`](NameIndex::find).
#[derive(Debug, Default, Clone)]
pub struct FindCriteria {
    /// Extension without the dot, matched case-insensitively.
    pub extension: Option<String>,
    /// Substring of the normalized name.
    pub substring: Option<String>,
    /// Suffix of the normalized name.
    pub suffix: Option<String>,
    /// Regular expression matched against the exact stored name.
    pub regex: Option<Regex>,
    /// Maximum number of results.
    pub limit: Option<usize>,
}

impl FindCriteria {
    fn has_scan_filters(&self) -> bool {
        self.substring.is_some() || self.suffix.is_some() || self.regex.is_some()
    }
}

/// The frozen lookup structure over a loaded archive's entries.
#[derive(Debug, Default)]
pub struct NameIndex {
    by_exact: HashMap<String, FileEntry>,
    by_normalized: HashMap<String, Vec<String>>,
    by_extension: HashMap<String, Vec<String>>,
    /// Exact names in central-directory order.
    order: Vec<String>,
    collision_count: u64,
}

impl NameIndex {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            by_exact: HashMap::with_capacity(capacity),
            by_normalized: HashMap::with_capacity(capacity),
            by_extension: HashMap::new(),
            order: Vec::with_capacity(capacity),
            collision_count: 0,
        }
    }

    /// Inserts an entry under its exact decoded name. A repeated exact
    /// name replaces the previous entry's metadata (later directory
    /// records win) without duplicating index rows.
    pub fn insert(&mut self, name: String, entry: FileEntry) {
        if let Some(existing) = self.by_exact.get_mut(&name) {
            trace!("duplicate exact name {name:?}: keeping the later record");
            *existing = entry;
            return;
        }

        let normalized = normalize(&name);
        let bucket = self.by_normalized.entry(normalized).or_default();
        if !bucket.is_empty() {
            debug!("name collision: {:?} joins {:?}", name, bucket);
            self.collision_count += 1;
        }
        bucket.push(name.clone());

        if let Some(ext) = extension_of(&name) {
            self.by_extension.entry(ext).or_default().push(name.clone());
        }

        self.order.push(name.clone());
        self.by_exact.insert(name, entry);
    }

    /// Looks up an entry by its exact stored name.
    pub fn get(&self, name: &str) -> Option<&FileEntry> {
        self.by_exact.get(name)
    }

    /// Resolves a query: an exact hit wins, then a unique
    /// case/slash-insensitive match; several candidates are ambiguous and
    /// never silently picked.
    pub fn resolve(&self, query: &str) -> Resolution {
        if self.by_exact.contains_key(query) {
            return Resolution::Found(query.to_string());
        }
        match self.by_normalized.get(&normalize(query)) {
            Some(bucket) if bucket.len() == 1 => Resolution::Found(bucket[0].clone()),
            Some(bucket) if bucket.len() > 1 => Resolution::Ambiguous(bucket.clone()),
            _ => Resolution::NotFound,
        }
    }

    /// Applies the conjunctive filters of `criteria`, returning exact
    /// names in central-directory order. An extension-only query is served
    /// straight from the extension index without scanning.
    pub fn find(&self, criteria: &FindCriteria) -> Vec<String> {
        let limit = criteria.limit.unwrap_or(usize::MAX);
        if limit == 0 {
            return Vec::new();
        }

        let candidates: &[String] = match &criteria.extension {
            Some(ext) => match self.by_extension.get(&ext.to_ascii_lowercase()) {
                Some(bucket) => bucket,
                None => return Vec::new(),
            },
            None => &self.order,
        };

        if !criteria.has_scan_filters() {
            return candidates.iter().take(limit).cloned().collect();
        }

        let substring = criteria.substring.as_deref().map(normalize);
        let suffix = criteria.suffix.as_deref().map(normalize);

        candidates
            .iter()
            .filter(|name| {
                let normalized = normalize(name);
                if let Some(needle) = &substring {
                    if !normalized.contains(needle.as_str()) {
                        return false;
                    }
                }
                if let Some(tail) = &suffix {
                    if !normalized.ends_with(tail.as_str()) {
                        return false;
                    }
                }
                if let Some(re) = &criteria.regex {
                    if !re.is_match(name) {
                        return false;
                    }
                }
                true
            })
            .take(limit)
            .cloned()
            .collect()
    }

    /// Exact names in central-directory order.
    pub fn names(&self) -> &[String] {
        &self.order
    }

    /// All indexed extensions, sorted.
    pub fn extensions(&self) -> Vec<String> {
        let mut extensions: Vec<String> = self.by_extension.keys().cloned().collect();
        extensions.sort();
        extensions
    }

    /// Exact names carrying the given extension, in directory order.
    pub fn names_with_extension(&self, extension: &str) -> Vec<String> {
        self.by_extension
            .get(&extension.to_ascii_lowercase())
            .cloned()
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.by_exact.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_exact.is_empty()
    }

    pub fn collision_count(&self) -> u64 {
        self.collision_count
    }

    /// Entry counts per extension, for the statistics snapshot.
    pub fn extension_counts(&self) -> HashMap<String, u64> {
        self.by_extension
            .iter()
            .map(|(ext, names)| (ext.clone(), names.len() as u64))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(offset: u64) -> FileEntry {
        FileEntry {
            flags: 1,
            offset,
            compressed_size: 4,
            length_aligned: 8,
            real_size: 4,
            raw_name: Vec::new(),
        }
    }

    fn sample_index() -> NameIndex {
        let mut index = NameIndex::with_capacity(8);
        index.insert("data\\Texture\\Button.bmp".into(), entry(0));
        index.insert("data\\sprite\\poring.spr".into(), entry(1));
        index.insert("data\\SPRITE\\PORING.spr".into(), entry(2));
        index.insert("readme.txt".into(), entry(3));
        index
    }

    #[test]
    fn normalization_lowercases_and_flips_slashes() {
        assert_eq!(normalize("Data\\Wav\\Click.WAV"), "data/wav/click.wav");
        assert_eq!(normalize("plain.txt"), "plain.txt");
    }

    #[test]
    fn extensions_come_from_the_final_component() {
        assert_eq!(extension_of("a\\b\\c.BMP"), Some("bmp".into()));
        assert_eq!(extension_of("dir.d/noext"), None);
        assert_eq!(extension_of("trailingdot."), None);
        assert_eq!(extension_of(".hidden"), None);
    }

    #[test]
    fn exact_names_always_win() {
        let index = sample_index();
        assert_eq!(
            index.resolve("data\\sprite\\poring.spr"),
            Resolution::Found("data\\sprite\\poring.spr".into())
        );
    }

    #[test]
    fn unique_normalized_matches_resolve() {
        let index = sample_index();
        assert_eq!(
            index.resolve("DATA/TEXTURE/BUTTON.BMP"),
            Resolution::Found("data\\Texture\\Button.bmp".into())
        );
    }

    #[test]
    fn colliding_names_are_ambiguous() {
        let index = sample_index();
        assert_eq!(index.collision_count(), 1);
        match index.resolve("data/sprite/PORING.SPR") {
            Resolution::Ambiguous(candidates) => {
                assert_eq!(
                    candidates,
                    vec![
                        "data\\sprite\\poring.spr".to_string(),
                        "data\\SPRITE\\PORING.spr".to_string(),
                    ]
                );
            }
            other => panic!("expected ambiguity, got {other:?}"),
        }
    }

    #[test]
    fn unknown_names_are_not_found() {
        let index = sample_index();
        assert_eq!(index.resolve("data/missing.bmp"), Resolution::NotFound);
    }

    #[test]
    fn duplicate_exact_names_keep_one_index_row() {
        let mut index = sample_index();
        index.insert("readme.txt".into(), entry(99));
        assert_eq!(index.len(), 4);
        assert_eq!(index.get("readme.txt").unwrap().offset, 99);
        assert_eq!(index.names().iter().filter(|n| *n == "readme.txt").count(), 1);
    }

    #[test]
    fn extension_only_find_uses_the_index() {
        let index = sample_index();
        let found = index.find(&FindCriteria {
            extension: Some("SPR".into()),
            ..Default::default()
        });
        assert_eq!(
            found,
            vec![
                "data\\sprite\\poring.spr".to_string(),
                "data\\SPRITE\\PORING.spr".to_string(),
            ]
        );
    }

    #[test]
    fn filters_are_conjunctive() {
        let index = sample_index();
        let found = index.find(&FindCriteria {
            extension: Some("spr".into()),
            substring: Some("DATA/SPRITE".into()),
            regex: Some(Regex::new(r"PORING").unwrap()),
            ..Default::default()
        });
        assert_eq!(found, vec!["data\\SPRITE\\PORING.spr".to_string()]);
    }

    #[test]
    fn suffix_and_limit_apply() {
        let index = sample_index();
        let found = index.find(&FindCriteria {
            suffix: Some(".spr".into()),
            limit: Some(1),
            ..Default::default()
        });
        assert_eq!(found, vec!["data\\sprite\\poring.spr".to_string()]);
    }

    #[test]
    fn names_preserve_directory_order() {
        let index = sample_index();
        assert_eq!(
            index.names(),
            &[
                "data\\Texture\\Button.bmp".to_string(),
                "data\\sprite\\poring.spr".to_string(),
                "data\\SPRITE\\PORING.spr".to_string(),
                "readme.txt".to_string(),
            ]
        );
    }
}
