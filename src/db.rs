use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use rusqlite::{params_from_iter, Connection};
use thiserror::Error;

use crate::error::Result;
use crate::models::YEAR_COLUMN;

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS ingest_log (
    id INTEGER PRIMARY KEY,
    year INTEGER NOT NULL,
    filename TEXT NOT NULL,
    checksum TEXT,
    rows_read INTEGER NOT NULL,
    rows_inserted INTEGER NOT NULL,
    chunks_skipped INTEGER NOT NULL,
    columns_dropped TEXT,
    loaded_at TEXT NOT NULL
);
";

/// Failure reported by a [`Store`], classified so the inserter can tell
/// schema drift apart from everything else.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("column does not exist: {0}")]
    MissingColumn(String),

    #[error("{0}")]
    Other(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

fn missing_column_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?:has no column named|no such column:)\s+"?([^"]+?)"?\s*$"#)
            .expect("static regex")
    })
}

/// The only place SQLite error text is inspected. SQLite reports an unknown
/// insert column as a generic error, so the message is all there is to go on.
pub fn classify_error(err: rusqlite::Error) -> StoreError {
    if let rusqlite::Error::SqliteFailure(_, Some(msg)) = &err {
        if let Some(caps) = missing_column_re().captures(msg) {
            return StoreError::MissingColumn(caps[1].to_string());
        }
    }
    StoreError::Other(err.to_string())
}

pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Relational store the ingestion pipeline writes to.
pub trait Store {
    /// Drops `table` if present and recreates it with every column typed as text.
    fn reset_table(&mut self, table: &str, columns: &[String]) -> StoreResult<()>;

    /// Appends `rows` (positional against `columns`) as one atomic unit.
    fn insert_rows(&mut self, table: &str, columns: &[String], rows: &[Vec<Option<String>>]) -> StoreResult<usize>;

    /// Adds a nullable text column unless one with that name already exists.
    /// Returns whether the column was added.
    fn add_column(&mut self, table: &str, column: &str) -> StoreResult<bool>;

    fn live_columns(&self, table: &str) -> StoreResult<Vec<String>>;

    /// Keeps a record of a loaded year. Stores without a ledger ignore it.
    fn record_ingest(&mut self, _entry: &IngestLogEntry) -> StoreResult<()> {
        Ok(())
    }
}

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = get_connection(db_path)?;
        init_db(&conn)?;
        Ok(Self { conn })
    }

    #[cfg(test)]
    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}

impl Store for SqliteStore {
    fn reset_table(&mut self, table: &str, columns: &[String]) -> StoreResult<()> {
        let defs: Vec<String> = columns.iter().map(|c| format!("{} TEXT", quote_ident(c))).collect();
        let sql = format!(
            "DROP TABLE IF EXISTS {t};\nCREATE TABLE {t} ({defs});",
            t = quote_ident(table),
            defs = defs.join(", ")
        );
        self.conn.execute_batch(&sql).map_err(classify_error)
    }

    fn insert_rows(&mut self, table: &str, columns: &[String], rows: &[Vec<Option<String>>]) -> StoreResult<usize> {
        let cols: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{i}")).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_ident(table),
            cols.join(", "),
            placeholders.join(", ")
        );
        // Dropping the transaction without commit rolls the whole chunk back.
        let tx = self.conn.transaction().map_err(classify_error)?;
        {
            let mut stmt = tx.prepare(&sql).map_err(classify_error)?;
            for row in rows {
                stmt.execute(params_from_iter(row.iter())).map_err(classify_error)?;
            }
        }
        tx.commit().map_err(classify_error)?;
        Ok(rows.len())
    }

    fn add_column(&mut self, table: &str, column: &str) -> StoreResult<bool> {
        let live = self.live_columns(table)?;
        if live.iter().any(|c| c.eq_ignore_ascii_case(column)) {
            return Ok(false);
        }
        self.conn
            .execute_batch(&format!(
                "ALTER TABLE {} ADD COLUMN {} TEXT",
                quote_ident(table),
                quote_ident(column)
            ))
            .map_err(classify_error)?;
        Ok(true)
    }

    fn live_columns(&self, table: &str) -> StoreResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM pragma_table_info(?1) ORDER BY cid")
            .map_err(classify_error)?;
        let names = stmt
            .query_map([table], |row| row.get::<_, String>(0))
            .map_err(classify_error)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(classify_error)?;
        Ok(names)
    }

    fn record_ingest(&mut self, entry: &IngestLogEntry) -> StoreResult<()> {
        record_ingest(&self.conn, entry).map_err(|e| match e {
            crate::error::GastosError::Db(db) => classify_error(db),
            other => StoreError::Other(other.to_string()),
        })
    }
}

// ---------------------------------------------------------------------------
// Table provisioning
// ---------------------------------------------------------------------------

/// Full refresh of the destination table: every discovered column plus the
/// year column, all as text. Existing rows are lost.
pub fn provision_table<S: Store>(store: &mut S, table: &str, discovered: &[String]) -> Result<Vec<String>> {
    let mut columns = discovered.to_vec();
    if !columns.iter().any(|c| c.eq_ignore_ascii_case(YEAR_COLUMN)) {
        columns.push(YEAR_COLUMN.to_string());
    }
    store.reset_table(table, &columns)?;
    tracing::info!(table, columns = columns.len(), "table recreated");
    Ok(columns)
}

// ---------------------------------------------------------------------------
// Ingestion log
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct IngestLogEntry {
    pub year: i32,
    pub filename: String,
    pub checksum: Option<String>,
    pub rows_read: usize,
    pub rows_inserted: usize,
    pub chunks_skipped: usize,
    pub columns_dropped: Vec<String>,
    pub loaded_at: String,
}

pub fn record_ingest(conn: &Connection, entry: &IngestLogEntry) -> Result<()> {
    let dropped = if entry.columns_dropped.is_empty() {
        None
    } else {
        Some(entry.columns_dropped.join(","))
    };
    conn.execute(
        "INSERT INTO ingest_log (year, filename, checksum, rows_read, rows_inserted, chunks_skipped, columns_dropped, loaded_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        rusqlite::params![
            entry.year,
            entry.filename,
            entry.checksum,
            entry.rows_read as i64,
            entry.rows_inserted as i64,
            entry.chunks_skipped as i64,
            dropped,
            entry.loaded_at,
        ],
    )?;
    Ok(())
}

pub fn recent_ingests(conn: &Connection, limit: usize) -> Result<Vec<IngestLogEntry>> {
    let mut stmt = conn.prepare(
        "SELECT year, filename, checksum, rows_read, rows_inserted, chunks_skipped, columns_dropped, loaded_at \
         FROM ingest_log ORDER BY id DESC LIMIT ?1",
    )?;
    let rows = stmt
        .query_map([limit as i64], |row| {
            let dropped: Option<String> = row.get(6)?;
            Ok(IngestLogEntry {
                year: row.get(0)?,
                filename: row.get(1)?,
                checksum: row.get(2)?,
                rows_read: row.get::<_, i64>(3)? as usize,
                rows_inserted: row.get::<_, i64>(4)? as usize,
                chunks_skipped: row.get::<_, i64>(5)? as usize,
                columns_dropped: dropped
                    .map(|d| d.split(',').map(str::to_string).collect())
                    .unwrap_or_default(),
                loaded_at: row.get(7)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Row counts of the destination table grouped by year tag.
pub fn rows_per_year(conn: &Connection, table: &str) -> Result<Vec<(Option<String>, i64)>> {
    let exists: bool = conn
        .prepare("SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1")?
        .exists([table])?;
    if !exists {
        return Ok(Vec::new());
    }
    let sql = format!(
        "SELECT {y}, count(*) FROM {t} GROUP BY {y} ORDER BY {y}",
        y = quote_ident(YEAR_COLUMN),
        t = quote_ident(table)
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}
