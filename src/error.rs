//! Error types for the chart pipeline.
//!
//! Per-record anomalies (missing titles, blank genres, unparseable ranks) are
//! absorbed by the stages themselves and never show up here. Only structural
//! problems surface as a [`PipelineError`], tagged with the stage that hit them.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Pipeline stage that produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Loader,
    Cleaner,
    Slicer,
    Aggregator,
    Persistence,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Loader => "loader",
            Stage::Cleaner => "cleaner",
            Stage::Slicer => "slicer",
            Stage::Aggregator => "aggregator",
            Stage::Persistence => "persistence",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum PipelineError {
    /// Source is not something the loader accepts (wrong extension, not a file).
    #[error("[{stage}] invalid source '{}': {reason}", path.display())]
    InvalidSource {
        stage: Stage,
        path: PathBuf,
        reason: String,
    },

    /// Header row lacks one or more of the required chart columns.
    #[error("[{stage}] missing required columns: {}", missing.join(", "))]
    MissingColumns { stage: Stage, missing: Vec<String> },

    /// Source parsed but holds no data rows.
    #[error("[{stage}] source contains no chart rows")]
    EmptySource { stage: Stage },

    /// A single row could not be read.
    #[error("[{stage}] record {index}: {message}")]
    Row {
        stage: Stage,
        index: usize,
        message: String,
    },

    /// Table names are interpolated into SQL, so only plain identifiers pass.
    #[error("[{stage}] invalid table name '{name}'")]
    InvalidTableName { stage: Stage, name: String },

    /// Table already exists and the caller asked not to touch it.
    #[error("[{stage}] table '{name}' already exists")]
    TableExists { stage: Stage, name: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl PipelineError {
    /// Stage the error originated from, when known.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            PipelineError::InvalidSource { stage, .. }
            | PipelineError::MissingColumns { stage, .. }
            | PipelineError::EmptySource { stage }
            | PipelineError::Row { stage, .. }
            | PipelineError::InvalidTableName { stage, .. }
            | PipelineError::TableExists { stage, .. } => Some(*stage),
            PipelineError::Csv(_) => Some(Stage::Loader),
            PipelineError::Storage(_) => Some(Stage::Persistence),
            PipelineError::Io(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_error_names_stage_and_index() {
        let err = PipelineError::Row {
            stage: Stage::Loader,
            index: 17,
            message: "unequal lengths".to_string(),
        };
        assert_eq!(err.to_string(), "[loader] record 17: unequal lengths");
        assert_eq!(err.stage(), Some(Stage::Loader));
    }

    #[test]
    fn test_missing_columns_message() {
        let err = PipelineError::MissingColumns {
            stage: Stage::Loader,
            missing: vec!["Genre".to_string(), "Rank".to_string()],
        };
        assert!(err.to_string().contains("Genre, Rank"));
    }
}
