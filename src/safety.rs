//! Safety utilities to prevent accidental overwrites of chart sources.
//!
//! The pipeline replaces tables in its output database, so the output path is
//! checked against the inputs before anything is opened for writing.

use anyhow::{bail, Result};
use std::path::Path;

/// Extensions accepted for the output database.
const DATABASE_EXTENSIONS: [&str; 3] = ["sqlite3", "sqlite", "db"];

/// Validates that an output path is safe to write to.
///
/// Checks:
/// - Output must carry a SQLite database extension (`.sqlite3`, `.sqlite`, `.db`)
/// - Output cannot be the same file as any of the provided source paths
///
/// # Arguments
/// * `output` - The database path that will be created or updated
/// * `source_paths` - Slice of input paths that must not match the output
///
/// # Returns
/// * `Ok(())` if the output path is safe
/// * `Err` with a descriptive message if the check fails
pub fn validate_output_path(output: &Path, source_paths: &[&Path]) -> Result<()> {
    let extension = output
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    if !DATABASE_EXTENSIONS.contains(&extension.as_str()) {
        bail!(
            "Safety check failed: output '{}' must end in one of .{}",
            output.display(),
            DATABASE_EXTENSIONS.join(", .")
        );
    }

    for source in source_paths {
        if output == *source || same_existing_file(output, source) {
            bail!(
                "Safety check failed: output '{}' cannot be the same as source '{}'",
                output.display(),
                source.display()
            );
        }
    }

    Ok(())
}

/// True when both paths exist and resolve to the same file.
fn same_existing_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_valid_output_sqlite3() {
        let output = PathBuf::from("/tmp/charts.sqlite3");
        let source = PathBuf::from("/data/top50.csv");
        assert!(validate_output_path(&output, &[&source]).is_ok());
    }

    #[test]
    fn test_valid_output_db_uppercase() {
        let output = PathBuf::from("/tmp/Top_Tracks.DB");
        let source = PathBuf::from("/data/top50.csv");
        assert!(validate_output_path(&output, &[&source]).is_ok());
    }

    #[test]
    fn test_csv_output_blocked() {
        let output = PathBuf::from("/data/top50.csv");
        let source = PathBuf::from("/data/other.csv");
        let result = validate_output_path(&output, &[&source]);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("must end in one of"));
    }

    #[test]
    fn test_output_equals_source() {
        let path = PathBuf::from("/data/charts.db");
        let result = validate_output_path(&path, &[&path]);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("cannot be the same as source"));
    }
}
