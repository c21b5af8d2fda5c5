use std::collections::BTreeSet;

use crate::db::{Store, StoreError};
use crate::models::YearDataset;

/// How a single chunk made it (or didn't) into the store.
#[derive(Debug, Clone, PartialEq)]
pub enum ChunkOutcome {
    /// First attempt succeeded.
    Clean { rows: usize },
    /// Succeeded after adding the chunk's missing columns to the table.
    Repaired { rows: usize, added: Vec<String> },
    /// Succeeded only after projecting onto the table's live columns.
    Reduced {
        rows: usize,
        added: Vec<String>,
        dropped: Vec<String>,
    },
    Skipped { rows: usize, error: StoreError },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InsertReport {
    pub rows_inserted: usize,
    pub chunks: usize,
    pub clean: usize,
    pub repaired: usize,
    pub reduced: usize,
    pub skipped: usize,
    pub rows_skipped: usize,
    pub columns_added: BTreeSet<String>,
    pub columns_dropped: BTreeSet<String>,
}

impl InsertReport {
    fn record(&mut self, outcome: ChunkOutcome) {
        self.chunks += 1;
        match outcome {
            ChunkOutcome::Clean { rows } => {
                self.clean += 1;
                self.rows_inserted += rows;
            }
            ChunkOutcome::Repaired { rows, added } => {
                self.repaired += 1;
                self.rows_inserted += rows;
                self.columns_added.extend(added);
            }
            ChunkOutcome::Reduced { rows, added, dropped } => {
                self.reduced += 1;
                self.rows_inserted += rows;
                self.columns_added.extend(added);
                self.columns_dropped.extend(dropped);
            }
            ChunkOutcome::Skipped { rows, .. } => {
                self.skipped += 1;
                self.rows_skipped += rows;
            }
        }
    }
}

/// Inserts a year's rows in chunks of `chunk_size`, one transaction each.
/// Never fails: chunks that cannot be stored are counted as skipped.
pub fn insert_dataset<S: Store>(store: &mut S, table: &str, dataset: &YearDataset, chunk_size: usize) -> InsertReport {
    let mut report = InsertReport::default();
    for (i, rows) in dataset.rows.chunks(chunk_size.max(1)).enumerate() {
        let outcome = insert_chunk(store, table, &dataset.columns, rows);
        match &outcome {
            ChunkOutcome::Clean { .. } => {}
            ChunkOutcome::Repaired { rows, added } => {
                tracing::info!(year = dataset.year, chunk = i, rows, added = ?added, "chunk stored after adding columns");
            }
            ChunkOutcome::Reduced { rows, dropped, .. } => {
                tracing::warn!(
                    year = dataset.year,
                    chunk = i,
                    rows,
                    dropped_count = dropped.len(),
                    dropped = ?dropped,
                    "chunk stored without columns missing from the table"
                );
            }
            ChunkOutcome::Skipped { rows, error } => {
                tracing::error!(year = dataset.year, chunk = i, rows, %error, "chunk skipped");
            }
        }
        report.record(outcome);
    }
    report
}

/// The retry ladder for one chunk: plain insert, then add missing columns
/// and retry, then insert only the columns the table has, then give up.
pub fn insert_chunk<S: Store>(store: &mut S, table: &str, columns: &[String], rows: &[Vec<Option<String>>]) -> ChunkOutcome {
    let first_err = match store.insert_rows(table, columns, rows) {
        Ok(n) => return ChunkOutcome::Clean { rows: n },
        Err(e) => e,
    };

    let mut added = Vec::new();
    let last_err = match first_err {
        StoreError::MissingColumn(ref missing) => {
            tracing::warn!(table, column = %missing, "schema drift, adding chunk columns");
            for column in columns {
                match store.add_column(table, column) {
                    Ok(true) => added.push(column.clone()),
                    Ok(false) => {}
                    Err(e) => tracing::warn!(table, column = %column, error = %e, "could not add column"),
                }
            }
            match store.insert_rows(table, columns, rows) {
                Ok(n) => return ChunkOutcome::Repaired { rows: n, added },
                Err(e) => e,
            }
        }
        other => other,
    };

    let live = match store.live_columns(table) {
        Ok(live) => live,
        Err(error) => return ChunkOutcome::Skipped { rows: rows.len(), error },
    };
    let keep: Vec<usize> = columns
        .iter()
        .enumerate()
        .filter(|(_, c)| live.iter().any(|l| l.eq_ignore_ascii_case(c)))
        .map(|(i, _)| i)
        .collect();
    if keep.is_empty() {
        return ChunkOutcome::Skipped { rows: rows.len(), error: last_err };
    }

    let dropped: Vec<String> = columns
        .iter()
        .enumerate()
        .filter(|(i, _)| !keep.contains(i))
        .map(|(_, c)| c.clone())
        .collect();
    let projected_columns: Vec<String> = keep.iter().map(|&i| columns[i].clone()).collect();
    let projected_rows: Vec<Vec<Option<String>>> = rows
        .iter()
        .map(|row| keep.iter().map(|&i| row.get(i).cloned().flatten()).collect())
        .collect();

    match store.insert_rows(table, &projected_columns, &projected_rows) {
        Ok(n) => ChunkOutcome::Reduced { rows: n, added, dropped },
        Err(error) => ChunkOutcome::Skipped { rows: rows.len(), error },
    }
}
