use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::error::{GastosError, Result};
use crate::fmt::reais;
use crate::index::build_index;
use crate::settings::load_settings;

pub fn run(identifier: &str) -> Result<()> {
    let settings = load_settings();
    settings.validate()?;
    let index = build_index(&settings);

    let expenses = index
        .lookup(identifier)
        .ok_or_else(|| GastosError::NotFound(identifier.to_string()))?;

    let mut table = Table::new();
    table.set_header(vec!["Year", "Value", "Document"]);
    let mut total = 0.0;
    for e in &expenses {
        total += e.value.unwrap_or(0.0);
        table.add_row(vec![
            Cell::new(&e.year),
            Cell::new(e.value.map(reais).unwrap_or_else(|| "-".to_string())),
            Cell::new(&e.url),
        ]);
    }
    println!("{table}");
    println!("{} {}", format!("{} documents, total", expenses.len()).bold(), reais(total).bold());
    Ok(())
}
