//! Shared normalization functions for chart records.
//! Used by the cleaner, the slicer and the aggregator.
//!
//! CRITICAL: genre canonicalization feeds every genre report. Run tests after changes.

use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;

use crate::models::GENRE_UNKNOWN;

// ============================================================================
// GENRE ALIASES
// ============================================================================

/// Lower-cased genre spellings that map onto a fixed canonical label.
/// Anything not listed here is title-cased instead.
pub static GENRE_ALIASES: Lazy<FxHashMap<&str, &str>> = Lazy::new(|| {
    let mut m = FxHashMap::default();

    m.insert("hiphop", "Hip-Hop");
    m.insert("hip-hop", "Hip-Hop");
    m.insert("hip hop", "Hip-Hop");

    m.insert("r and b", "R&B");
    m.insert("r&b", "R&B");
    m.insert("rnb", "R&B");

    m.insert("afro beats", "Afrobeats");
    m.insert("afro-beats", "Afrobeats");
    m.insert("afrobeats", "Afrobeats");

    m
});

// ============================================================================
// NORMALIZATION FUNCTIONS
// ============================================================================

/// Map a raw genre value to its canonical label.
///
/// Missing or blank input becomes [`GENRE_UNKNOWN`]. Known aliases are matched
/// case-insensitively after trimming; everything else is title-cased.
/// e.g., "  hip hop" → "Hip-Hop", "k-pop" → "K-Pop", "" → "Genre Unknown"
pub fn normalize_genre(raw: Option<&str>) -> String {
    let trimmed = match raw.map(str::trim) {
        Some(t) if !t.is_empty() => t,
        _ => return GENRE_UNKNOWN.to_string(),
    };

    let lookup = trimmed.to_lowercase();
    GENRE_ALIASES
        .get(lookup.as_str())
        .map(|&canonical| canonical.to_string())
        .unwrap_or_else(|| title_case(trimmed))
}

/// Capitalize the first letter of every word and lower-case the rest.
///
/// A word is a run of letters and digits; an apostrophe or combining mark
/// inside a word does not start a new one. e.g., "LATIN pop" → "Latin Pop",
/// "don't" → "Don't", "2000s pop" → "2000s Pop", "ßa pop" → "Ssa Pop"
///
/// Only the first char of a multi-char uppercase expansion stays upper-case
/// ("ß" → "Ss", "ﬁ" → "Fi"), so the result title-cases to itself.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_word = false;

    for c in s.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                let mut upper = c.to_uppercase();
                if let Some(first) = upper.next() {
                    out.push(first);
                }
                out.extend(upper.flat_map(char::to_lowercase));
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = c.is_numeric() || (in_word && (c == '\'' || is_combining_mark(c)));
        }
    }

    out
}

/// Check if a character is a Unicode combining mark (diacritical mark).
/// Lower-casing can emit one mid-word, e.g. "İ" → "i\u{307}".
pub fn is_combining_mark(c: char) -> bool {
    matches!(
        c as u32,
        0x0300..=0x036F | 0x1AB0..=0x1AFF | 0x1DC0..=0x1DFF | 0x20D0..=0x20FF | 0xFE20..=0xFE2F
    )
}

/// Split a comma-separated artist field into trimmed, non-empty names.
/// e.g., "Drake, 21 Savage" → ["Drake", "21 Savage"]
pub fn split_artists(raw: &str) -> Vec<&str> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .collect()
}

/// Case-insensitive comparison key for country names.
pub fn country_key(country: &str) -> String {
    country.trim().to_lowercase()
}

/// Coerce a raw rank cell to a chart position.
///
/// Accepts integers and integral decimals ("3", " 3 ", "3.0"); anything else,
/// including negatives and fractions, is treated as missing.
pub fn parse_rank(raw: &str) -> Option<u32> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(rank) = trimmed.parse::<u32>() {
        return Some(rank);
    }

    let value = trimmed.parse::<f64>().ok()?;
    if value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= u32::MAX as f64 {
        Some(value as u32)
    } else {
        None
    }
}

// ============================================================================
// TESTS
// ============================================================================
