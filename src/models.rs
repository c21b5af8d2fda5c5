use std::collections::BTreeMap;

use crate::error::{GastosError, Result};

/// Canonical name given to the first column of every source file.
pub const NAME_COLUMN: &str = "txNomeParlamentar";
pub const VALUE_COLUMN: &str = "vlrDocumento";
pub const URL_COLUMN: &str = "urlDocumento";
/// Derived column tagging each row with the year of its source file.
pub const YEAR_COLUMN: &str = "ano";

/// One row of one year's source file, keyed by column name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpenseRecord {
    fields: BTreeMap<String, Option<String>>,
}

impl ExpenseRecord {
    pub fn from_pairs<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, Option<String>)>,
        K: Into<String>,
    {
        Self {
            fields: pairs.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Value of a column, `None` when the column is absent or null.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields.get(column).and_then(|v| v.as_deref())
    }

    pub fn set(&mut self, column: &str, value: Option<String>) {
        self.fields.insert(column.to_string(), value);
    }
}

/// All rows loaded from one yearly file. Rows are positional against `columns`.
#[derive(Debug, Clone)]
pub struct YearDataset {
    pub year: i32,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl YearDataset {
    /// Checks the shape invariants: the name column leads, the year column is
    /// present and tagged with `year` on every row, and every row is as wide
    /// as the header.
    pub fn new(year: i32, columns: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Result<Self> {
        if columns.first().map(String::as_str) != Some(NAME_COLUMN) {
            return Err(GastosError::Other(format!(
                "dataset for {year} does not start with {NAME_COLUMN}"
            )));
        }
        let year_idx = columns
            .iter()
            .position(|c| c == YEAR_COLUMN)
            .ok_or_else(|| GastosError::Other(format!("dataset for {year} has no {YEAR_COLUMN} column")))?;
        let tag = year.to_string();
        for (i, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(GastosError::Other(format!(
                    "row {i} of {year} has {} fields, expected {}",
                    row.len(),
                    columns.len()
                )));
            }
            if row[year_idx].as_deref() != Some(tag.as_str()) {
                return Err(GastosError::Other(format!("row {i} of {year} is not tagged {tag}")));
            }
        }
        Ok(Self { year, columns, rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = ExpenseRecord> + '_ {
        self.rows.iter().map(|row| {
            ExpenseRecord::from_pairs(self.columns.iter().cloned().zip(row.iter().cloned()))
        })
    }
}
