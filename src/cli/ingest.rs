use std::path::Path;

use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::db::SqliteStore;
use crate::error::Result;
use crate::ingest::{run_ingestion, YearOutcome};
use crate::settings::load_settings;

pub fn run() -> Result<()> {
    let settings = load_settings();
    let summary = {
        let mut store = SqliteStore::open(Path::new(&settings.db_path))?;
        run_ingestion(&mut store, &settings)?
    };

    let mut table = Table::new();
    table.set_header(vec!["Year", "Status", "Read", "Inserted", "Chunks", "Added columns", "Dropped columns"]);
    for (year, outcome) in &summary.years {
        match outcome {
            YearOutcome::Loaded { rows_read, report } => {
                let status = if report.skipped > 0 {
                    "partial"
                } else if report.reduced > 0 || report.repaired > 0 {
                    "repaired"
                } else {
                    "ok"
                };
                let chunks = format!(
                    "{} ok / {} repaired / {} reduced / {} skipped",
                    report.clean, report.repaired, report.reduced, report.skipped
                );
                let added: Vec<&str> = report.columns_added.iter().map(String::as_str).collect();
                let dropped: Vec<&str> = report.columns_dropped.iter().map(String::as_str).collect();
                table.add_row(vec![
                    Cell::new(year),
                    Cell::new(status),
                    Cell::new(rows_read),
                    Cell::new(report.rows_inserted),
                    Cell::new(chunks),
                    Cell::new(added.join(", ")),
                    Cell::new(dropped.join(", ")),
                ]);
            }
            YearOutcome::Missing => {
                table.add_row(vec![Cell::new(year), Cell::new("missing")]);
            }
            YearOutcome::Failed(reason) => {
                table.add_row(vec![Cell::new(year), Cell::new(format!("failed: {reason}"))]);
            }
        }
    }
    println!("Table {} created with {} columns", settings.table, summary.columns.len());
    println!("{table}");
    println!(
        "{}",
        format!(
            "{} rows inserted into {} from {} years in {:.1}s",
            summary.rows_inserted(),
            settings.table,
            summary.loaded_years(),
            summary.elapsed.as_secs_f64()
        )
        .bold()
    );
    Ok(())
}
