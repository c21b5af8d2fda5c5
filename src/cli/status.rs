use std::path::PathBuf;

use comfy_table::{Cell, Table};

use crate::db::{get_connection, init_db, recent_ingests, rows_per_year};
use crate::error::Result;
use crate::fmt::format_bytes;
use crate::settings::load_settings;

pub fn run() -> Result<()> {
    let settings = load_settings();
    let db_path = PathBuf::from(&settings.db_path);

    let present = settings
        .years()
        .into_iter()
        .filter(|y| settings.source_path(*y).exists())
        .count();
    println!("Source dir: {}", settings.source_dir);
    println!("Sources:    {present} of {} years present", settings.years().len());
    println!("Database:   {}", db_path.display());

    if !db_path.exists() {
        println!();
        println!("Database not found. Run `gastos ingest` to build it.");
        return Ok(());
    }

    let size = std::fs::metadata(&db_path)?.len();
    println!("DB size:    {}", format_bytes(size));

    let conn = get_connection(&db_path)?;
    init_db(&conn)?;
    let counts = rows_per_year(&conn, &settings.table)?;
    let total: i64 = counts.iter().map(|(_, n)| n).sum();
    println!("Rows:       {total}");

    if !counts.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["Year", "Rows"]);
        for (year, n) in counts {
            table.add_row(vec![Cell::new(year.unwrap_or_default()), Cell::new(n)]);
        }
        println!("\n{table}");
    }

    let log = recent_ingests(&conn, 10)?;
    if !log.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["Loaded at", "File", "Read", "Inserted", "Skipped chunks", "Dropped columns", "Checksum"]);
        for entry in log {
            table.add_row(vec![
                Cell::new(entry.loaded_at),
                Cell::new(entry.filename),
                Cell::new(entry.rows_read),
                Cell::new(entry.rows_inserted),
                Cell::new(entry.chunks_skipped),
                Cell::new(entry.columns_dropped.join(", ")),
                Cell::new(entry.checksum.map(|c| c[..12.min(c.len())].to_string()).unwrap_or_default()),
            ]);
        }
        println!("Recent ingestions\n{table}");
    }
    Ok(())
}
