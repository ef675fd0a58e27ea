//! Core data models for the chart pipeline.
//!
//! This module contains the chart record, the report row types and the
//! statistics structs used throughout the pipeline.

use serde::Serialize;

use crate::normalize::split_artists;

// ============================================================================
// Constants
// ============================================================================

/// Canonical label for missing, blank or non-text genres.
pub const GENRE_UNKNOWN: &str = "Genre Unknown";

/// Genre label used to pad top-genre reports.
pub const NOT_AVAILABLE: &str = "N/A";

/// Maximum number of records kept per country slice.
pub const SLICE_LIMIT: usize = 50;

/// Number of rows every country contributes to the top-genre report.
pub const TOP_GENRE_LIMIT: usize = 5;

/// Columns the chart source must provide.
pub const REQUIRED_COLUMNS: [&str; 5] = ["Country", "Rank", "Title", "Artists", "Genre"];

// ============================================================================
// Chart Records
// ============================================================================

/// One chart entry.
///
/// Text fields that may be absent in the source are `Option`s: `None` stands
/// for a missing cell and is tolerated everywhere in the pipeline.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    pub country: String,
    pub rank: Option<u32>, // chart position, None when unparseable
    pub title: Option<String>,
    pub artists_raw: Option<String>, // comma-separated, e.g. "Drake, 21 Savage"
    pub genre: Option<String>,
}

impl Record {
    pub fn new(
        country: impl Into<String>,
        rank: Option<u32>,
        title: Option<&str>,
        artists_raw: Option<&str>,
        genre: Option<&str>,
    ) -> Self {
        Self {
            country: country.into(),
            rank,
            title: title.map(str::to_string),
            artists_raw: artists_raw.map(str::to_string),
            genre: genre.map(str::to_string),
        }
    }

    /// Individual artist names parsed from `artists_raw`.
    /// Missing or empty fields yield no names.
    pub fn artists(&self) -> Vec<&str> {
        self.artists_raw
            .as_deref()
            .map(split_artists)
            .unwrap_or_default()
    }

    /// Duplicate-detection key: independently trimmed (title, artists).
    /// Records lacking either field have no key and are never deduplicated.
    pub fn dedup_key(&self) -> Option<(String, String)> {
        match (&self.title, &self.artists_raw) {
            (Some(title), Some(artists)) => {
                Some((title.trim().to_string(), artists.trim().to_string()))
            }
            _ => None,
        }
    }
}

/// Ordered collection of chart records.
pub type Dataset = Vec<Record>;

// ============================================================================
// Report Rows
// ============================================================================

/// Row of the top-genres report.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenreCount {
    pub country: String,
    pub genre: String,
    pub count: usize,
}

impl GenreCount {
    /// Filler row for countries with fewer than five distinct genres.
    pub fn padding(country: &str) -> Self {
        Self {
            country: country.to_string(),
            genre: NOT_AVAILABLE.to_string(),
            count: 0,
        }
    }

    pub fn is_padding(&self) -> bool {
        self.count == 0 && self.genre == NOT_AVAILABLE
    }
}

/// Row of the number-one-genre report.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TopGenre {
    pub country: String,
    pub genre: String,
    pub count: usize,
}

/// Row of the artist reach report: distinct countries an artist charts in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtistReach {
    pub artist: String,
    pub country_count: usize,
}

/// Row of the most-popular-artist report.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PopularArtist {
    pub country: String,
    pub artist: String,
    pub count: usize,
}

/// Reach bucket for an artist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Global,
    Regional,
    Local,
}

impl Tier {
    /// 3+ countries is global, exactly 2 regional, anything else local.
    pub fn from_reach(country_count: usize) -> Self {
        match country_count {
            0 | 1 => Tier::Local,
            2 => Tier::Regional,
            _ => Tier::Global,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Global => "Global",
            Tier::Regional => "Regional",
            Tier::Local => "Local",
        }
    }
}

/// Artist reach row with its tier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtistTier {
    pub artist: String,
    pub country_count: usize,
    pub tier: Tier,
}

// ============================================================================
// Statistics (Instrumentation)
// ============================================================================

/// Counters collected while cleaning.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleaningStats {
    pub input_records: usize,
    pub titles_trimmed: usize,
    pub genres_rewritten: usize,
    pub duplicates_removed: usize,
    pub genres_backfilled: usize,
    pub output_records: usize,
}

/// Size of one country slice.
#[derive(Debug, Clone, Serialize)]
pub struct SliceSize {
    pub country: String,
    pub records: usize,
}

/// End-to-end statistics for one pipeline run.
#[derive(Default, Debug, Clone, Serialize)]
pub struct PipelineStats {
    pub records_loaded: usize,
    pub cleaning: CleaningStats,
    pub slices: Vec<SliceSize>,

    // Report row counts
    pub top_genre_rows: usize,
    pub number_one_genre_rows: usize,
    pub artist_reach_rows: usize,
    pub popular_artist_rows: usize,

    pub tables_written: usize,
    pub elapsed_seconds: f64,
}

impl PipelineStats {
    /// Countries whose slice came back empty.
    pub fn empty_countries(&self) -> Vec<&str> {
        self.slices
            .iter()
            .filter(|s| s.records == 0)
            .map(|s| s.country.as_str())
            .collect()
    }

    /// Log stats in JSON format
    pub fn log_phase(&self, phase: &str) {
        if let Ok(json) = serde_json::to_string_pretty(self) {
            log::info!("[STATS:{}]\n{}", phase, json);
        }
    }

    /// Write stats to a JSON file
    pub fn write_to_file(&self, path: &std::path::Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artists_split_and_trim() {
        let r = Record::new("US", Some(1), Some("Hi"), Some("Drake,  21 Savage "), Some("Hip-Hop"));
        assert_eq!(r.artists(), vec!["Drake", "21 Savage"]);
    }

    #[test]
    fn test_artists_missing_or_empty() {
        let missing = Record::new("US", Some(1), Some("Hi"), None, None);
        assert!(missing.artists().is_empty());
        let empty = Record::new("US", Some(1), Some("Hi"), Some("   "), None);
        assert!(empty.artists().is_empty());
    }

    #[test]
    fn test_dedup_key_trims_each_field() {
        let r = Record::new("US", Some(1), Some("  Hi "), Some(" A, B "), None);
        assert_eq!(r.dedup_key(), Some(("Hi".to_string(), "A, B".to_string())));
        let no_title = Record::new("US", Some(1), None, Some("A"), None);
        assert_eq!(no_title.dedup_key(), None);
    }

    #[test]
    fn test_tier_from_reach() {
        assert_eq!(Tier::from_reach(1), Tier::Local);
        assert_eq!(Tier::from_reach(2), Tier::Regional);
        assert_eq!(Tier::from_reach(3), Tier::Global);
        assert_eq!(Tier::from_reach(12), Tier::Global);
    }

    #[test]
    fn test_empty_countries() {
        let stats = PipelineStats {
            slices: vec![
                SliceSize { country: "Spain".to_string(), records: 50 },
                SliceSize { country: "Mexico".to_string(), records: 0 },
            ],
            ..Default::default()
        };
        assert_eq!(stats.empty_countries(), vec!["Mexico"]);
    }

    #[test]
    fn test_stats_written_as_json() {
        let stats = PipelineStats {
            records_loaded: 3,
            slices: vec![SliceSize { country: "Japan".to_string(), records: 2 }],
            tables_written: 8,
            ..Default::default()
        };
        let path = std::env::temp_dir()
            .join(format!("chart_trends_stats_{}.json", std::process::id()));
        stats.write_to_file(&path).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(json["records_loaded"], 3);
        assert_eq!(json["tables_written"], 8);
        assert_eq!(json["slices"][0]["country"], "Japan");
        assert_eq!(json["cleaning"]["duplicates_removed"], 0);
    }
}
