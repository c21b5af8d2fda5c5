use std::time::{Duration, Instant};

use crate::db::{provision_table, IngestLogEntry, Store};
use crate::error::Result;
use crate::importer::{compute_checksum, discover_schema, load_year};
use crate::inserter::{insert_dataset, InsertReport};
use crate::settings::Settings;

#[derive(Debug, Clone, PartialEq)]
pub enum YearOutcome {
    Loaded { rows_read: usize, report: InsertReport },
    Missing,
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct IngestionSummary {
    pub columns: Vec<String>,
    pub years: Vec<(i32, YearOutcome)>,
    pub elapsed: Duration,
}

impl IngestionSummary {
    pub fn rows_inserted(&self) -> usize {
        self.years
            .iter()
            .map(|(_, outcome)| match outcome {
                YearOutcome::Loaded { report, .. } => report.rows_inserted,
                _ => 0,
            })
            .sum()
    }

    pub fn loaded_years(&self) -> usize {
        self.years
            .iter()
            .filter(|(_, o)| matches!(o, YearOutcome::Loaded { .. }))
            .count()
    }
}

/// Full-refresh ingestion: discover the schema, recreate the table, then load
/// every candidate year in order.
///
/// Only discovery and table creation can fail the run. A year that is missing
/// or cannot be read is reported and skipped; chunk failures are absorbed by
/// the inserter.
pub fn run_ingestion<S: Store>(store: &mut S, settings: &Settings) -> Result<IngestionSummary> {
    settings.validate()?;
    let started = Instant::now();

    let discovered = discover_schema(settings)?;
    let columns = provision_table(store, &settings.table, &discovered)?;

    let mut years = Vec::new();
    for year in settings.years() {
        let outcome = ingest_year(store, settings, year);
        years.push((year, outcome));
    }

    let summary = IngestionSummary {
        columns,
        years,
        elapsed: started.elapsed(),
    };
    tracing::info!(
        rows = summary.rows_inserted(),
        years = summary.loaded_years(),
        elapsed_ms = summary.elapsed.as_millis() as u64,
        "ingestion finished"
    );
    Ok(summary)
}

fn ingest_year<S: Store>(store: &mut S, settings: &Settings, year: i32) -> YearOutcome {
    let path = settings.source_path(year);
    let dataset = match load_year(settings, year) {
        Ok(Some(dataset)) => dataset,
        Ok(None) => {
            tracing::info!(year, file = %path.display(), "source file not found, skipping");
            return YearOutcome::Missing;
        }
        Err(e) => {
            tracing::warn!(year, file = %path.display(), error = %e, "could not load year, skipping");
            return YearOutcome::Failed(e.to_string());
        }
    };

    if dataset.is_empty() {
        tracing::warn!(year, "source file has a header but no rows");
    }
    tracing::info!(year, rows = dataset.len(), "importing");
    let report = insert_dataset(store, &settings.table, &dataset, settings.chunk_size);
    if report.skipped > 0 {
        tracing::warn!(year, chunks = report.skipped, rows = report.rows_skipped, "chunks skipped");
    }

    let entry = IngestLogEntry {
        year,
        filename: path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("")
            .to_string(),
        checksum: compute_checksum(&path).ok(),
        rows_read: dataset.len(),
        rows_inserted: report.rows_inserted,
        chunks_skipped: report.skipped,
        columns_dropped: report.columns_dropped.iter().cloned().collect(),
        loaded_at: chrono::Utc::now().to_rfc3339(),
    };
    if let Err(e) = store.record_ingest(&entry) {
        tracing::warn!(year, error = %e, "could not write ingestion log");
    }

    YearOutcome::Loaded {
        rows_read: dataset.len(),
        report,
    }
}
