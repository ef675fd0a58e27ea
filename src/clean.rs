//! Record cleaning for chart datasets.
//!
//! Cleaning runs four steps in a fixed order, each producing a new dataset:
//! 1. Title trim
//! 2. Genre normalization
//! 3. Per-country duplicate removal (first-seen record wins)
//! 4. Empty-genre backfill
//!
//! The input is never modified; `clean` works on its own copy.

use log::{debug, info};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::models::{CleaningStats, Dataset, Record, GENRE_UNKNOWN};
use crate::normalize::normalize_genre;

// ============================================================================
// Pipeline Entry Points
// ============================================================================

/// Run every cleaning step over a copy of `records`.
pub fn clean(records: &[Record]) -> Dataset {
    clean_with_stats(records).0
}

/// Run every cleaning step and report what each one changed.
pub fn clean_with_stats(records: &[Record]) -> (Dataset, CleaningStats) {
    let mut stats = CleaningStats {
        input_records: records.len(),
        ..Default::default()
    };

    let dataset = records.to_vec();
    let dataset = trim_titles_step(dataset, &mut stats);
    let dataset = standardize_genres_step(dataset, &mut stats);
    let dataset = remove_duplicates_step(dataset, &mut stats);
    let dataset = fix_empty_genres_step(dataset, &mut stats);

    stats.output_records = dataset.len();
    info!(
        "Cleaned {} records -> {} ({} duplicates removed, {} genres backfilled)",
        stats.input_records, stats.output_records, stats.duplicates_removed, stats.genres_backfilled
    );
    (dataset, stats)
}

// ============================================================================
// Individual Steps
// ============================================================================

/// Strip leading/trailing whitespace from every title. Missing titles pass through.
pub fn trim_titles(records: Dataset) -> Dataset {
    trim_titles_step(records, &mut CleaningStats::default())
}

/// Replace every genre with its canonical label.
pub fn standardize_genres(records: Dataset) -> Dataset {
    standardize_genres_step(records, &mut CleaningStats::default())
}

/// Drop later records that repeat a (title, artists) pair within the same country.
pub fn remove_duplicates(records: Dataset) -> Dataset {
    remove_duplicates_step(records, &mut CleaningStats::default())
}

/// Set missing or blank genres to [`GENRE_UNKNOWN`].
pub fn fix_empty_genres(records: Dataset) -> Dataset {
    fix_empty_genres_step(records, &mut CleaningStats::default())
}

fn trim_titles_step(records: Dataset, stats: &mut CleaningStats) -> Dataset {
    let out: Dataset = records
        .into_iter()
        .map(|mut record| {
            if let Some(title) = record.title.as_mut() {
                let trimmed = title.trim().to_string();
                if trimmed.len() != title.len() {
                    *title = trimmed;
                    stats.titles_trimmed += 1;
                }
            }
            record
        })
        .collect();
    debug!("Title trim: {} titles changed", stats.titles_trimmed);
    out
}

fn standardize_genres_step(records: Dataset, stats: &mut CleaningStats) -> Dataset {
    let out: Dataset = records
        .into_iter()
        .map(|mut record| {
            let canonical = normalize_genre(record.genre.as_deref());
            if record.genre.as_deref() != Some(canonical.as_str()) {
                stats.genres_rewritten += 1;
            }
            record.genre = Some(canonical);
            record
        })
        .collect();
    debug!("Genre normalization: {} genres rewritten", stats.genres_rewritten);
    out
}

fn remove_duplicates_step(records: Dataset, stats: &mut CleaningStats) -> Dataset {
    let before = records.len();

    // Partitions in order of each country's first appearance
    let mut partition_of: FxHashMap<String, usize> = FxHashMap::default();
    let mut partitions: Vec<(FxHashSet<(String, String)>, Dataset)> = Vec::new();

    for record in records {
        let idx = match partition_of.get(&record.country) {
            Some(&idx) => idx,
            None => {
                partitions.push((FxHashSet::default(), Vec::new()));
                partition_of.insert(record.country.clone(), partitions.len() - 1);
                partitions.len() - 1
            }
        };

        let (seen, kept) = &mut partitions[idx];
        match record.dedup_key() {
            Some(key) => {
                if seen.insert(key) {
                    kept.push(record);
                }
            }
            // Records without a full key are always kept
            None => kept.push(record),
        }
    }

    let out: Dataset = partitions
        .into_iter()
        .flat_map(|(_, kept)| kept)
        .collect();
    stats.duplicates_removed += before - out.len();
    debug!(
        "Duplicate removal: {} removed across {} countries",
        before - out.len(),
        partition_of.len()
    );
    out
}

fn fix_empty_genres_step(records: Dataset, stats: &mut CleaningStats) -> Dataset {
    let out: Dataset = records
        .into_iter()
        .map(|mut record| {
            let blank = record.genre.as_deref().map_or(true, |g| g.trim().is_empty());
            if blank {
                record.genre = Some(GENRE_UNKNOWN.to_string());
                stats.genres_backfilled += 1;
            }
            record
        })
        .collect();
    debug!("Empty-genre backfill: {} genres filled", stats.genres_backfilled);
    out
}

// ============================================================================
// TESTS
// ============================================================================
