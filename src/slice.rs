//! Per-country top-50 slicing.
//!
//! Slices are owned copies of the matching records, sorted by chart rank and
//! truncated to [`SLICE_LIMIT`]. Keys keep the caller's spelling of the country.

use log::{debug, warn};
use rustc_hash::FxHashMap;

use crate::models::{Record, SLICE_LIMIT};
use crate::normalize::country_key;

/// One country's top records, ascending by rank.
#[derive(Clone, Debug, PartialEq)]
pub struct CountrySlice {
    pub country: String,
    pub records: Vec<Record>,
}

impl CountrySlice {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Ordered mapping country -> slice, in request order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CountrySlices {
    slices: Vec<CountrySlice>,
}

impl CountrySlices {
    /// Slice for a country, looked up by the exact name it was requested under.
    pub fn get(&self, country: &str) -> Option<&CountrySlice> {
        self.slices.iter().find(|s| s.country == country)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CountrySlice> {
        self.slices.iter()
    }

    pub fn countries(&self) -> Vec<&str> {
        self.slices.iter().map(|s| s.country.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.slices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }

    /// Add or replace a country's slice, keeping its original position on replace.
    pub fn insert(&mut self, slice: CountrySlice) {
        match self.slices.iter_mut().find(|s| s.country == slice.country) {
            Some(existing) => *existing = slice,
            None => self.slices.push(slice),
        }
    }
}

impl FromIterator<CountrySlice> for CountrySlices {
    fn from_iter<I: IntoIterator<Item = CountrySlice>>(iter: I) -> Self {
        let mut slices = CountrySlices::default();
        for slice in iter {
            slices.insert(slice);
        }
        slices
    }
}

/// Build the top-[`SLICE_LIMIT`] slice for every requested country.
///
/// Country matching is case-insensitive. Records with a missing rank sort after
/// every ranked record; ties keep dataset order. A country with no matching
/// records gets an empty slice.
pub fn slice_by_countries<S: AsRef<str>>(records: &[Record], countries: &[S]) -> CountrySlices {
    // Index dataset positions by country key once, instead of rescanning per country
    let mut by_country: FxHashMap<String, Vec<usize>> = FxHashMap::default();
    for (idx, record) in records.iter().enumerate() {
        by_country.entry(country_key(&record.country)).or_default().push(idx);
    }

    countries
        .iter()
        .map(|requested| {
            let requested = requested.as_ref();
            let mut matched: Vec<Record> = by_country
                .get(&country_key(requested))
                .map(|indices| indices.iter().map(|&i| records[i].clone()).collect())
                .unwrap_or_default();

            matched.sort_by_key(|r| (r.rank.is_none(), r.rank));
            matched.truncate(SLICE_LIMIT);

            if matched.is_empty() {
                warn!("No chart records found for country '{}'", requested);
            } else {
                debug!("Sliced {} records for '{}'", matched.len(), requested);
            }

            CountrySlice {
                country: requested.to_string(),
                records: matched,
            }
        })
        .collect()
}
