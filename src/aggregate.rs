//! Cross-country chart reports.
//!
//! Every report is a pure function of the country slices. Ties are resolved by
//! first-seen order so repeated runs over the same input produce identical rows.

use log::info;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::models::{
    ArtistReach, ArtistTier, GenreCount, PopularArtist, Tier, TopGenre, TOP_GENRE_LIMIT,
};
use crate::slice::CountrySlices;

// ============================================================================
// Counting
// ============================================================================

/// Occurrence counter that remembers the order keys were first seen in.
#[derive(Default)]
struct FirstSeenCounter<'a> {
    index: FxHashMap<&'a str, usize>,
    counts: Vec<(&'a str, usize)>,
}

impl<'a> FirstSeenCounter<'a> {
    fn add(&mut self, key: &'a str) {
        match self.index.get(key) {
            Some(&i) => self.counts[i].1 += 1,
            None => {
                self.index.insert(key, self.counts.len());
                self.counts.push((key, 1));
            }
        }
    }

    fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Highest counts first; equal counts stay in first-seen order.
    fn most_common(&self, n: usize) -> Vec<(&'a str, usize)> {
        let mut ranked = self.counts.clone();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.truncate(n);
        ranked
    }

    /// Key with the maximum count; the first one seen wins a tie.
    fn leader(&self) -> Option<(&'a str, usize)> {
        self.counts.iter().fold(None, |best, &(key, count)| match best {
            Some((_, best_count)) if best_count >= count => best,
            _ => Some((key, count)),
        })
    }
}

// ============================================================================
// Reports
// ============================================================================

/// Five most frequent genres per country, padded with "N/A" rows to exactly five.
pub fn top_genres_per_country(slices: &CountrySlices) -> Vec<GenreCount> {
    let mut rows = Vec::with_capacity(slices.len() * TOP_GENRE_LIMIT);

    for slice in slices.iter() {
        let mut counter = FirstSeenCounter::default();
        for genre in slice.records.iter().filter_map(|r| r.genre.as_deref()) {
            counter.add(genre);
        }

        let top = counter.most_common(TOP_GENRE_LIMIT);
        let padding = TOP_GENRE_LIMIT - top.len();
        rows.extend(top.into_iter().map(|(genre, count)| GenreCount {
            country: slice.country.clone(),
            genre: genre.to_string(),
            count,
        }));
        rows.extend((0..padding).map(|_| GenreCount::padding(&slice.country)));
    }

    rows
}

/// The single most frequent genre per country. Countries without genres are skipped.
pub fn number_one_genre_per_country(slices: &CountrySlices) -> Vec<TopGenre> {
    slices
        .iter()
        .filter_map(|slice| {
            let mut counter = FirstSeenCounter::default();
            for genre in slice.records.iter().filter_map(|r| r.genre.as_deref()) {
                counter.add(genre);
            }
            counter.leader().map(|(genre, count)| TopGenre {
                country: slice.country.clone(),
                genre: genre.to_string(),
                count,
            })
        })
        .collect()
}

/// Number of distinct countries each artist charts in.
///
/// Sorted by country count descending, then artist name ascending.
pub fn artist_country_counts(slices: &CountrySlices) -> Vec<ArtistReach> {
    let mut reach: FxHashMap<&str, FxHashSet<&str>> = FxHashMap::default();

    for slice in slices.iter() {
        for record in &slice.records {
            for artist in record.artists() {
                reach.entry(artist).or_default().insert(slice.country.as_str());
            }
        }
    }

    let mut rows: Vec<ArtistReach> = reach
        .into_iter()
        .map(|(artist, countries)| ArtistReach {
            artist: artist.to_string(),
            country_count: countries.len(),
        })
        .collect();
    rows.sort_by(|a, b| {
        b.country_count
            .cmp(&a.country_count)
            .then_with(|| a.artist.cmp(&b.artist))
    });
    rows
}

/// Artist credited on the most records of each country's slice.
/// Countries with no artist data are skipped.
pub fn most_popular_artist_per_country(slices: &CountrySlices) -> Vec<PopularArtist> {
    slices
        .iter()
        .filter_map(|slice| {
            let mut counter = FirstSeenCounter::default();
            for artist in slice.records.iter().flat_map(|r| r.artists()) {
                counter.add(artist);
            }
            if counter.is_empty() {
                return None;
            }
            counter.leader().map(|(artist, count)| PopularArtist {
                country: slice.country.clone(),
                artist: artist.to_string(),
                count,
            })
        })
        .collect()
}

/// Bucket artists into global / regional / local reach.
pub fn classify_artists(reach: &[ArtistReach]) -> Vec<ArtistTier> {
    reach
        .iter()
        .map(|row| ArtistTier {
            artist: row.artist.clone(),
            country_count: row.country_count,
            tier: Tier::from_reach(row.country_count),
        })
        .collect()
}

// ============================================================================
// Report Bundle
// ============================================================================

/// All reports derived from one set of country slices.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Reports {
    pub top_genres: Vec<GenreCount>,
    pub number_one_genres: Vec<TopGenre>,
    pub artist_reach: Vec<ArtistReach>,
    pub artist_tiers: Vec<ArtistTier>,
    pub popular_artists: Vec<PopularArtist>,
}

/// Compute every report. The four base reports are independent and run in parallel.
pub fn compute_reports(slices: &CountrySlices) -> Reports {
    let ((top_genres, number_one_genres), (artist_reach, popular_artists)) = rayon::join(
        || {
            rayon::join(
                || top_genres_per_country(slices),
                || number_one_genre_per_country(slices),
            )
        },
        || {
            rayon::join(
                || artist_country_counts(slices),
                || most_popular_artist_per_country(slices),
            )
        },
    );
    let artist_tiers = classify_artists(&artist_reach);

    info!(
        "Computed reports: {} genre rows, {} leading genres, {} artists, {} popular artists",
        top_genres.len(),
        number_one_genres.len(),
        artist_reach.len(),
        popular_artists.len()
    );

    Reports {
        top_genres,
        number_one_genres,
        artist_reach,
        artist_tiers,
        popular_artists,
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Record, NOT_AVAILABLE};
    use crate::slice::{slice_by_countries, CountrySlice};

    fn rec(country: &str, rank: u32, artists: &str, genre: &str) -> Record {
        let title = format!("song {}", rank);
        Record::new(country, Some(rank), Some(title.as_str()), Some(artists), Some(genre))
    }

    fn slices_of(entries: Vec<(&str, Vec<Record>)>) -> CountrySlices {
        entries
            .into_iter()
            .map(|(country, records)| CountrySlice {
                country: country.to_string(),
                records,
            })
            .collect()
    }

    #[test]
    fn test_top_genres_padded_to_five() {
        let slices = slices_of(vec![(
            "US",
            vec![rec("US", 1, "A", "Pop"), rec("US", 2, "B", "Rock"), rec("US", 3, "C", "Pop")],
        )]);
        let rows = top_genres_per_country(&slices);
        assert_eq!(rows.len(), 5);
        assert_eq!((rows[0].genre.as_str(), rows[0].count), ("Pop", 2));
        assert_eq!((rows[1].genre.as_str(), rows[1].count), ("Rock", 1));
        assert!(rows[2..].iter().all(|r| r.genre == NOT_AVAILABLE && r.count == 0));
    }

    #[test]
    fn test_top_genres_limits_and_keeps_first_seen_on_tie() {
        let genres = ["Latin", "Pop", "Rock", "Jazz", "Funk", "Soul", "Pop"];
        let records: Vec<Record> = genres
            .iter()
            .enumerate()
            .map(|(i, g)| rec("ES", i as u32 + 1, "A", g))
            .collect();
        let rows = top_genres_per_country(&slices_of(vec![("ES", records)]));
        let names: Vec<&str> = rows.iter().map(|r| r.genre.as_str()).collect();
        assert_eq!(names, vec!["Pop", "Latin", "Rock", "Jazz", "Funk"]);
    }

    #[test]
    fn test_top_genre_counts_conserved() {
        let records: Vec<Record> = (1..=12u32)
            .map(|i| rec("JP", i, "A", ["J-Pop", "Anime", "Rock"][i as usize % 3]))
            .collect();
        let size = records.len();
        let rows = top_genres_per_country(&slices_of(vec![("JP", records)]));
        let total: usize = rows.iter().filter(|r| !r.is_padding()).map(|r| r.count).sum();
        assert!(total <= size);
    }

    #[test]
    fn test_empty_country_in_top_genres_but_not_number_one() {
        let data = vec![rec("US", 1, "A", "Pop")];
        let slices = slice_by_countries(&data, &["US", "Mexico"]);

        let top = top_genres_per_country(&slices);
        let mexico: Vec<&GenreCount> = top.iter().filter(|r| r.country == "Mexico").collect();
        assert_eq!(mexico.len(), 5);
        assert!(mexico.iter().all(|r| r.is_padding()));

        let leaders = number_one_genre_per_country(&slices);
        assert_eq!(leaders.len(), 1);
        assert_eq!(leaders[0].country, "US");
    }

    #[test]
    fn test_number_one_genre_tie_first_seen_wins() {
        let slices = slices_of(vec![(
            "US",
            vec![
                rec("US", 1, "A", "Pop"),
                rec("US", 2, "B", "Rock"),
                rec("US", 3, "C", "Rock"),
                rec("US", 4, "D", "Pop"),
            ],
        )]);
        let leaders = number_one_genre_per_country(&slices);
        assert_eq!(
            leaders,
            vec![TopGenre { country: "US".to_string(), genre: "Pop".to_string(), count: 2 }]
        );
    }

    #[test]
    fn test_artist_country_counts() {
        let slices = slices_of(vec![
            (
                "US",
                vec![rec("US", 1, "Drake, 21 Savage", "Hip-Hop"), rec("US", 2, "Drake", "Hip-Hop")],
            ),
            ("UK", vec![rec("UK", 1, "Drake, 21 Savage", "Hip-Hop"), rec("UK", 2, "Adele", "Pop")]),
            ("CA", vec![rec("CA", 1, "Bieber", "Pop")]),
        ]);
        let rows = artist_country_counts(&slices);
        let pairs: Vec<(&str, usize)> = rows
            .iter()
            .map(|r| (r.artist.as_str(), r.country_count))
            .collect();
        assert_eq!(
            pairs,
            vec![("21 Savage", 2), ("Drake", 2), ("Adele", 1), ("Bieber", 1)]
        );
    }

    #[test]
    fn test_artist_counts_skip_missing_artists() {
        let slices = slices_of(vec![(
            "US",
            vec![
                Record::new("US", Some(1), Some("a"), None, Some("Pop")),
                Record::new("US", Some(2), Some("b"), Some(""), Some("Pop")),
            ],
        )]);
        assert!(artist_country_counts(&slices).is_empty());
        assert!(most_popular_artist_per_country(&slices).is_empty());
    }

    #[test]
    fn test_most_popular_artist_counts_individuals() {
        let slices = slices_of(vec![
            (
                "US",
                vec![
                    rec("US", 1, "Drake, Future", "Hip-Hop"),
                    rec("US", 2, "Future", "Hip-Hop"),
                    rec("US", 3, "Drake", "Hip-Hop"),
                    rec("US", 4, "Future, Lil Baby", "Hip-Hop"),
                ],
            ),
            ("MX", vec![]),
        ]);
        let rows = most_popular_artist_per_country(&slices);
        assert_eq!(
            rows,
            vec![PopularArtist {
                country: "US".to_string(),
                artist: "Future".to_string(),
                count: 3,
            }]
        );
    }

    #[test]
    fn test_most_popular_artist_tie_first_seen_wins() {
        let slices = slices_of(vec![(
            "UK",
            vec![
                rec("UK", 1, "Adele", "Pop"),
                rec("UK", 2, "Stormzy", "Grime"),
                rec("UK", 3, "Stormzy, Adele", "Grime"),
            ],
        )]);
        let rows = most_popular_artist_per_country(&slices);
        assert_eq!(rows[0].artist, "Adele");
        assert_eq!(rows[0].count, 2);
    }

    #[test]
    fn test_classify_artists() {
        let reach = vec![
            ArtistReach { artist: "Dua Lipa".to_string(), country_count: 4 },
            ArtistReach { artist: "Bad Bunny".to_string(), country_count: 2 },
            ArtistReach { artist: "Local Hero".to_string(), country_count: 1 },
        ];
        let tiers: Vec<Tier> = classify_artists(&reach).iter().map(|t| t.tier).collect();
        assert_eq!(tiers, vec![Tier::Global, Tier::Regional, Tier::Local]);
    }

    #[test]
    fn test_compute_reports_deterministic() {
        let data: Vec<Record> = (1..=30u32)
            .flat_map(|i| {
                vec![
                    rec(
                        "US",
                        i,
                        &format!("Artist {}, Guest {}", i % 4, i % 3),
                        ["Pop", "Rock", "Hip-Hop"][i as usize % 3],
                    ),
                    rec("UK", i, &format!("Artist {}", i % 5), ["Grime", "Pop"][i as usize % 2]),
                ]
            })
            .collect();
        let slices = slice_by_countries(&data, &["US", "UK", "Mexico"]);
        let first = compute_reports(&slices);
        let second = compute_reports(&slices);
        assert_eq!(first, second);
        assert_eq!(first.top_genres.len(), 15);
        assert_eq!(first.artist_tiers.len(), first.artist_reach.len());
        assert_eq!(first.number_one_genres.len(), 2);
    }
}
