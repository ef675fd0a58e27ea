//! SQLite persistence for cleaned records and reports.
//!
//! Every table is written in full: a dataset or report is one `save_table`
//! call. Column names follow the record and report field names.

use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::FxHashSet;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use std::path::Path;

use crate::error::{PipelineError, Result, Stage};
use crate::models::{
    ArtistReach, ArtistTier, Dataset, GenreCount, PopularArtist, Record, TopGenre,
};

/// Plain SQL identifiers only; names are interpolated into statements.
static TABLE_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

/// Runs of characters not allowed in a derived table name.
static NON_IDENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").unwrap());

// ============================================================================
// Row Mapping
// ============================================================================

/// A type that can be stored as one row of a table.
pub trait TableRow {
    /// (column name, SQLite type) in insertion order.
    const COLUMNS: &'static [(&'static str, &'static str)];

    /// Values in the same order as `COLUMNS`.
    fn values(&self) -> Vec<Value>;
}

fn text(s: &str) -> Value {
    Value::Text(s.to_string())
}

fn opt_text(s: &Option<String>) -> Value {
    s.as_deref().map_or(Value::Null, text)
}

fn int(n: usize) -> Value {
    Value::Integer(n as i64)
}

impl TableRow for Record {
    const COLUMNS: &'static [(&'static str, &'static str)] = &[
        ("country", "TEXT NOT NULL"),
        ("rank", "INTEGER"),
        ("title", "TEXT"),
        ("artists", "TEXT"),
        ("genre", "TEXT"),
    ];

    fn values(&self) -> Vec<Value> {
        vec![
            text(&self.country),
            self.rank.map_or(Value::Null, |r| Value::Integer(i64::from(r))),
            opt_text(&self.title),
            opt_text(&self.artists_raw),
            opt_text(&self.genre),
        ]
    }
}

impl TableRow for GenreCount {
    const COLUMNS: &'static [(&'static str, &'static str)] = &[
        ("country", "TEXT NOT NULL"),
        ("genre", "TEXT NOT NULL"),
        ("count", "INTEGER NOT NULL"),
    ];

    fn values(&self) -> Vec<Value> {
        vec![text(&self.country), text(&self.genre), int(self.count)]
    }
}

impl TableRow for TopGenre {
    const COLUMNS: &'static [(&'static str, &'static str)] = &[
        ("country", "TEXT NOT NULL"),
        ("genre", "TEXT NOT NULL"),
        ("count", "INTEGER NOT NULL"),
    ];

    fn values(&self) -> Vec<Value> {
        vec![text(&self.country), text(&self.genre), int(self.count)]
    }
}

impl TableRow for ArtistReach {
    const COLUMNS: &'static [(&'static str, &'static str)] = &[
        ("artist", "TEXT NOT NULL"),
        ("country_count", "INTEGER NOT NULL"),
    ];

    fn values(&self) -> Vec<Value> {
        vec![text(&self.artist), int(self.country_count)]
    }
}

impl TableRow for ArtistTier {
    const COLUMNS: &'static [(&'static str, &'static str)] = &[
        ("artist", "TEXT NOT NULL"),
        ("country_count", "INTEGER NOT NULL"),
        ("tier", "TEXT NOT NULL"),
    ];

    fn values(&self) -> Vec<Value> {
        vec![text(&self.artist), int(self.country_count), text(self.tier.as_str())]
    }
}

impl TableRow for PopularArtist {
    const COLUMNS: &'static [(&'static str, &'static str)] = &[
        ("country", "TEXT NOT NULL"),
        ("artist", "TEXT NOT NULL"),
        ("count", "INTEGER NOT NULL"),
    ];

    fn values(&self) -> Vec<Value> {
        vec![text(&self.country), text(&self.artist), int(self.count)]
    }
}

// ============================================================================
// Table Names
// ============================================================================

pub const CLEANED_TABLE: &str = "cleaned_tracks";
pub const TOP_GENRES_TABLE: &str = "top_genres";
pub const NUMBER_ONE_GENRES_TABLE: &str = "number_one_genres";
pub const ARTIST_REACH_TABLE: &str = "artist_country_counts";
pub const ARTIST_TIERS_TABLE: &str = "artist_tiers";
pub const POPULAR_ARTISTS_TABLE: &str = "most_popular_artists";

/// Tables the pipeline always writes; country slices never take these names.
pub const RESERVED_TABLES: [&str; 6] = [
    CLEANED_TABLE,
    TOP_GENRES_TABLE,
    NUMBER_ONE_GENRES_TABLE,
    ARTIST_REACH_TABLE,
    ARTIST_TIERS_TABLE,
    POPULAR_ARTISTS_TABLE,
];

/// What to do when the target table already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IfExists {
    #[default]
    Replace,
    Append,
    Fail,
}

fn validate_table_name(name: &str) -> Result<()> {
    if TABLE_NAME.is_match(name) && !name.to_lowercase().starts_with("sqlite_") {
        Ok(())
    } else {
        Err(PipelineError::InvalidTableName {
            stage: Stage::Persistence,
            name: name.to_string(),
        })
    }
}

/// Derive a table name from a country, e.g. "United States" → "united_states".
pub fn table_name_for_country(country: &str) -> String {
    let lowered = country.trim().to_lowercase();
    let name = NON_IDENT.replace_all(&lowered, "_");
    let name = name.trim_matches('_');
    match name.chars().next() {
        None => "country".to_string(),
        Some(c) if c.is_ascii_digit() => format!("_{}", name),
        Some(_) => name.to_string(),
    }
}

/// One distinct table name per country, in order.
///
/// A name already taken by an earlier country or by a [`RESERVED_TABLES`]
/// entry gets the first free numeric suffix: "Spain", "spain" → "spain",
/// "spain_2".
pub fn country_table_names<S: AsRef<str>>(countries: &[S]) -> Vec<String> {
    let mut taken: FxHashSet<String> = RESERVED_TABLES.iter().map(|t| t.to_string()).collect();
    let mut names = Vec::with_capacity(countries.len());

    for country in countries {
        let base = table_name_for_country(country.as_ref());
        let mut name = base.clone();
        let mut suffix = 2;
        while taken.contains(&name) {
            name = format!("{}_{}", base, suffix);
            suffix += 1;
        }
        taken.insert(name.clone());
        names.push(name);
    }

    names
}

// ============================================================================
// Store
// ============================================================================

fn table_exists_on(conn: &Connection, table: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [table],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// SQLite database holding the pipeline's tables.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open (or create) a database file, creating parent directories as needed.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA synchronous = NORMAL;
             PRAGMA temp_store = MEMORY;",
        )?;
        info!("Opened database: {:?}", path);
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    /// Write `rows` to `table`, returning the number of rows inserted.
    ///
    /// Dropping, creating and filling the table commit together: a failed
    /// write leaves the table as it was.
    pub fn save_table<R: TableRow>(
        &mut self,
        table: &str,
        rows: &[R],
        if_exists: IfExists,
    ) -> Result<usize> {
        validate_table_name(table)?;

        let tx = self.conn.transaction()?;
        if table_exists_on(&tx, table)? {
            match if_exists {
                IfExists::Fail => {
                    return Err(PipelineError::TableExists {
                        stage: Stage::Persistence,
                        name: table.to_string(),
                    })
                }
                IfExists::Replace => tx.execute_batch(&format!("DROP TABLE \"{}\";", table))?,
                IfExists::Append => {}
            }
        }

        let column_defs: Vec<String> = R::COLUMNS
            .iter()
            .map(|(name, ty)| format!("\"{}\" {}", name, ty))
            .collect();
        tx.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS \"{}\" ({});",
            table,
            column_defs.join(", ")
        ))?;

        let column_names: Vec<String> = R::COLUMNS
            .iter()
            .map(|(name, _)| format!("\"{}\"", name))
            .collect();
        let placeholders: Vec<String> = (1..=R::COLUMNS.len()).map(|i| format!("?{}", i)).collect();
        let insert_sql = format!(
            "INSERT INTO \"{}\" ({}) VALUES ({})",
            table,
            column_names.join(", "),
            placeholders.join(", ")
        );

        {
            let mut stmt = tx.prepare_cached(&insert_sql)?;
            for row in rows {
                stmt.execute(params_from_iter(row.values()))?;
            }
        }
        tx.commit()?;

        debug!("Wrote {} rows to '{}'", rows.len(), table);
        Ok(rows.len())
    }

    /// Read a table written from [`Record`]s back, in insertion order.
    pub fn load_records(&self, table: &str) -> Result<Dataset> {
        validate_table_name(table)?;
        let mut stmt = self.conn.prepare(&format!(
            "SELECT country, rank, title, artists, genre FROM \"{}\" ORDER BY rowid",
            table
        ))?;
        let rows = stmt.query_map([], |row| {
            let rank: Option<i64> = row.get(1)?;
            Ok(Record {
                country: row.get(0)?,
                rank: rank.and_then(|r| u32::try_from(r).ok()),
                title: row.get(2)?,
                artists_raw: row.get(3)?,
                genre: row.get(4)?,
            })
        })?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    pub fn table_exists(&self, table: &str) -> Result<bool> {
        table_exists_on(&self.conn, table)
    }

    pub fn drop_table(&self, table: &str) -> Result<()> {
        validate_table_name(table)?;
        self.conn.execute_batch(&format!("DROP TABLE IF EXISTS \"{}\";", table))?;
        Ok(())
    }

    /// User tables, sorted by name.
    pub fn list_tables(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT name FROM sqlite_master
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
             ORDER BY name",
        )?;
        let names = stmt.query_map([], |row| row.get(0))?;
        Ok(names.collect::<std::result::Result<Vec<String>, _>>()?)
    }

    pub fn row_count(&self, table: &str) -> Result<usize> {
        validate_table_name(table)?;
        let count: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM \"{}\"", table), [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
