//! Filename encoding detection and mojibake repair.
//!
//! GRF central directories store filenames as NUL-terminated byte strings
//! in either UTF-8 or CP949 (extended EUC-KR), with nothing in the format
//! saying which. Detection scores both decodings over a sample of names
//! and picks the one producing fewer damaged characters.
//!
//! `encoding_rs`'s euc-kr implementation is windows-949, so CP949 and
//! EUC-KR labels resolve to the same decoder and extended Hangul lead
//! bytes decode correctly rather than landing in the C1 control range.

use encoding_rs::{Encoding, EUC_KR, UTF_8, WINDOWS_1252};
use log::debug;

use crate::grf::types::models::FilenameEncoding;

/// Maximum number of filenames inspected by auto-detection.
const DETECT_SAMPLE_LIMIT: usize = 200;

/// Fraction of U+0080..U+00FF characters above which a Hangul-free name is
/// considered mojibake.
const MOJIBAKE_LATIN_RATIO: f64 = 0.3;

/// High-frequency CP949 path fragments as they appear when misread as
/// windows-1252: 유저인터(페이스), 이펙트, 몬스터, 아이템.
const MOJIBAKE_SIGNATURES: [&str; 4] = ["À¯ÀúÀÎÅÍ", "ÀÌÆåÆ®", "¸ó½ºÅÍ", "¾ÆÀÌÅÛ"];

/// Characters counted as decode damage: the replacement character, plus
/// C1 controls, which plain EUC-KR decoders produce for extended CP949
/// lead bytes.
fn bad_chars(s: &str) -> usize {
    s.chars()
        .filter(|&c| c == '\u{FFFD}' || ('\u{80}'..='\u{9F}').contains(&c))
        .count()
}

/// Whether a decoded filename carries visible decode damage. Feeds the
/// bad-name statistic.
pub(crate) fn is_damaged_name(s: &str) -> bool {
    bad_chars(s) > 0
}

fn has_hangul_syllables(s: &str) -> bool {
    s.chars().any(|c| ('\u{AC00}'..='\u{D7A3}').contains(&c))
}

/// Chooses between UTF-8 and CP949 for a set of raw filename byte strings.
///
/// Samples up to 200 names; names that are pure ASCII decode identically
/// either way and do not participate in scoring. UTF-8 wins whenever its
/// bad-character ratio stays below `threshold`, and also breaks ties.
pub fn detect_encoding<'a, I>(raw_names: I, threshold: f64) -> FilenameEncoding
where
    I: IntoIterator<Item = &'a [u8]>,
{
    let mut sampled_bytes = 0usize;
    let mut utf8_bad = 0usize;
    let mut cp949_bad = 0usize;

    for raw in raw_names.into_iter().take(DETECT_SAMPLE_LIMIT) {
        if raw.iter().all(u8::is_ascii) {
            continue;
        }
        sampled_bytes += raw.len();

        let (utf8, _, _) = UTF_8.decode(raw);
        utf8_bad += bad_chars(&utf8);

        let (cp949, _, _) = EUC_KR.decode(raw);
        cp949_bad += bad_chars(&cp949);
    }

    if sampled_bytes == 0 {
        debug!("encoding detection: pure ASCII sample, defaulting to UTF-8");
        return FilenameEncoding::Utf8;
    }

    let utf8_ratio = utf8_bad as f64 / sampled_bytes as f64;
    let cp949_ratio = cp949_bad as f64 / sampled_bytes as f64;
    debug!(
        "encoding detection over {} bytes: utf-8 bad ratio {:.4}, cp949 bad ratio {:.4}",
        sampled_bytes, utf8_ratio, cp949_ratio
    );

    if utf8_ratio < threshold {
        FilenameEncoding::Utf8
    } else if cp949_ratio < utf8_ratio {
        FilenameEncoding::Cp949
    } else {
        FilenameEncoding::Utf8
    }
}

/// Whether `s` looks like CP949 bytes that were decoded as windows-1252.
///
/// True only for Hangul-free strings that either contain a known misread
/// fragment or are dominated by U+0080..U+00FF characters.
pub fn is_mojibake(s: &str) -> bool {
    if s.is_empty() || has_hangul_syllables(s) {
        return false;
    }

    if MOJIBAKE_SIGNATURES.iter().any(|sig| s.contains(sig)) {
        return true;
    }

    let total = s.chars().count();
    let high_latin = s
        .chars()
        .filter(|&c| ('\u{80}'..='\u{FF}').contains(&c))
        .count();
    high_latin as f64 / total as f64 > MOJIBAKE_LATIN_RATIO
}

/// Attempts to repair a mojibake string by re-encoding it as windows-1252
/// and decoding the bytes as CP949.
///
/// The repair is kept only when it produces Hangul and does not introduce
/// additional damaged characters; otherwise the input is returned
/// unchanged.
pub fn fix_mojibake(s: &str) -> String {
    let (bytes, _, _) = WINDOWS_1252.encode(s);
    let (candidate, _, _) = EUC_KR.decode(&bytes);

    if has_hangul_syllables(&candidate) && bad_chars(&candidate) <= bad_chars(s) {
        debug!("repaired mojibake name: {:?} -> {:?}", s, candidate);
        candidate.into_owned()
    } else {
        s.to_string()
    }
}

/// Decodes a raw filename with the selected decoder, repairing mojibake
/// when the result matches the misread pattern.
pub fn decode_filename(raw: &[u8], encoding: &'static Encoding) -> String {
    let (decoded, _, _) = encoding.decode(raw);
    if is_mojibake(&decoded) {
        fix_mojibake(&decoded)
    } else {
        decoded.into_owned()
    }
}
