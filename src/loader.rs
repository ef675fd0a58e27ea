//! CSV ingestion for chart data.
//!
//! The loader is the only place that looks at column names: it checks the
//! header once and turns every row into a typed [`Record`]. Empty cells become
//! `None`; ranks that are not numbers become `None` and sort last later on.

use csv::{ReaderBuilder, StringRecord};
use log::info;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{PipelineError, Result, Stage};
use crate::models::{Dataset, Record, REQUIRED_COLUMNS};
use crate::normalize::parse_rank;

/// Positions of the required columns in the header row.
#[derive(Debug, Clone, Copy)]
struct ColumnIndex {
    country: usize,
    rank: usize,
    title: usize,
    artists: usize,
    genre: usize,
}

impl ColumnIndex {
    fn from_headers(headers: &StringRecord) -> Result<Self> {
        let position = |name: &str| headers.iter().position(|h| h.trim() == name);

        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|&&name| position(name).is_none())
            .map(|name| name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(PipelineError::MissingColumns {
                stage: Stage::Loader,
                missing,
            });
        }

        let find = |name: &str| position(name).unwrap_or_default();
        Ok(Self {
            country: find("Country"),
            rank: find("Rank"),
            title: find("Title"),
            artists: find("Artists"),
            genre: find("Genre"),
        })
    }

    fn record(&self, row: &StringRecord) -> Record {
        let cell = |i: usize| row.get(i).filter(|v| !v.is_empty());
        Record::new(
            cell(self.country).unwrap_or_default(),
            cell(self.rank).and_then(parse_rank),
            cell(self.title),
            cell(self.artists),
            cell(self.genre),
        )
    }
}

/// Load a chart CSV from disk.
pub fn load_csv(path: &Path) -> Result<Dataset> {
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .map_or(false, |e| e.eq_ignore_ascii_case("csv"));
    if !is_csv {
        return Err(PipelineError::InvalidSource {
            stage: Stage::Loader,
            path: path.to_path_buf(),
            reason: "expected a .csv file".to_string(),
        });
    }
    if !path.is_file() {
        return Err(PipelineError::InvalidSource {
            stage: Stage::Loader,
            path: path.to_path_buf(),
            reason: "file not found".to_string(),
        });
    }

    info!("Loading chart CSV: {:?}", path);
    let dataset = load_from_reader(File::open(path)?)?;
    info!("Loaded {} chart records", dataset.len());
    Ok(dataset)
}

/// Load chart rows from any reader producing CSV text with a header row.
pub fn load_from_reader<R: Read>(reader: R) -> Result<Dataset> {
    // flexible: short rows read as missing trailing cells instead of failing
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);

    let headers = rdr.headers()?.clone();
    if headers.is_empty() {
        return Err(PipelineError::EmptySource { stage: Stage::Loader });
    }
    let columns = ColumnIndex::from_headers(&headers)?;

    let mut dataset = Vec::new();
    for (index, result) in rdr.records().enumerate() {
        let row = result.map_err(|e| PipelineError::Row {
            stage: Stage::Loader,
            index,
            message: e.to_string(),
        })?;
        dataset.push(columns.record(&row));
    }

    if dataset.is_empty() {
        return Err(PipelineError::EmptySource { stage: Stage::Loader });
    }
    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_load_basic_rows() {
        let csv = "Country,Rank,Title,Artists,Genre\n\
                   USA,1,Blinding Lights,The Weeknd,Pop\n\
                   UK,2,Levitating,Dua Lipa,Pop\n";
        let data = load_from_reader(csv.as_bytes()).unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(
            data[0],
            Record::new("USA", Some(1), Some("Blinding Lights"), Some("The Weeknd"), Some("Pop"))
        );
        assert_eq!(data[1].country, "UK");
    }

    #[test]
    fn test_column_order_and_extra_columns() {
        let csv = "Genre,Extra,Artists,Title,Rank,Country\n\
                   Rock,x,\"Drake, 21 Savage\",Hi,3,US\n";
        let data = load_from_reader(csv.as_bytes()).unwrap();
        assert_eq!(data[0].artists(), vec!["Drake", "21 Savage"]);
        assert_eq!(data[0].rank, Some(3));
        assert_eq!(data[0].genre.as_deref(), Some("Rock"));
    }

    #[test]
    fn test_empty_cells_and_bad_rank() {
        let csv = "Country,Rank,Title,Artists,Genre\n\
                   US,n/a,,Someone,\n\
                   US,2,  Padded  ,A\n";
        let data = load_from_reader(csv.as_bytes()).unwrap();
        assert_eq!(data[0].rank, None);
        assert_eq!(data[0].title, None);
        assert_eq!(data[0].genre, None);
        // Whitespace is preserved for the cleaner to trim
        assert_eq!(data[1].title.as_deref(), Some("  Padded  "));
        assert_eq!(data[1].genre, None);
    }

    #[test]
    fn test_missing_columns_reported() {
        let csv = "Country,Rank,Title\nUS,1,Hi\n";
        match load_from_reader(csv.as_bytes()) {
            Err(PipelineError::MissingColumns { stage, missing }) => {
                assert_eq!(stage, Stage::Loader);
                assert_eq!(missing, vec!["Artists".to_string(), "Genre".to_string()]);
            }
            other => panic!("expected MissingColumns, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_source() {
        assert!(matches!(
            load_from_reader("".as_bytes()),
            Err(PipelineError::EmptySource { .. })
        ));
        assert!(matches!(
            load_from_reader("Country,Rank,Title,Artists,Genre\n".as_bytes()),
            Err(PipelineError::EmptySource { .. })
        ));
    }

    #[test]
    fn test_invalid_utf8_row_reports_index() {
        let mut bytes = b"Country,Rank,Title,Artists,Genre\nUS,1,Ok,A,Pop\nUS,2,".to_vec();
        bytes.extend_from_slice(&[0xff, 0xfe]);
        bytes.extend_from_slice(b",B,Pop\n");
        match load_from_reader(bytes.as_slice()) {
            Err(PipelineError::Row { index, .. }) => assert_eq!(index, 1),
            other => panic!("expected Row error, got {:?}", other),
        }
    }

    #[test]
    fn test_rejects_non_csv_path() {
        let result = load_csv(&PathBuf::from("/tmp/charts.xlsx"));
        assert!(matches!(result, Err(PipelineError::InvalidSource { .. })));
    }

    #[test]
    fn test_missing_file() {
        let result = load_csv(&PathBuf::from("/nonexistent/dir/charts.csv"));
        match result {
            Err(PipelineError::InvalidSource { reason, .. }) => {
                assert_eq!(reason, "file not found")
            }
            other => panic!("expected InvalidSource, got {:?}", other),
        }
    }
}
