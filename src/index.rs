use std::collections::HashMap;

use serde::Serialize;

use crate::importer::{load_year, parse_document_value};
use crate::models::{ExpenseRecord, YearDataset, NAME_COLUMN, URL_COLUMN, VALUE_COLUMN, YEAR_COLUMN};
use crate::settings::Settings;

/// One lookup result row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpenseView {
    pub value: Option<f64>,
    pub url: String,
    pub year: String,
}

#[derive(Debug, Clone)]
pub struct IndexedExpense {
    /// Document value parsed to a non-negative number; `None` when unparseable.
    pub value: Option<f64>,
    pub record: ExpenseRecord,
}

/// Every source row grouped by lowercased person identifier.
///
/// Built once from the source files and never mutated afterwards, so it can
/// be shared between request handlers without locking. The whole dataset
/// lives in memory.
#[derive(Debug, Default)]
pub struct PersonIndex {
    by_person: HashMap<String, Vec<IndexedExpense>>,
    records: usize,
    unidentified: usize,
}

impl PersonIndex {
    pub fn from_datasets<I>(datasets: I, identifier_column: &str) -> Self
    where
        I: IntoIterator<Item = YearDataset>,
    {
        let mut index = Self::default();
        for dataset in datasets {
            index.add_dataset(&dataset, identifier_column);
        }
        index
    }

    fn add_dataset(&mut self, dataset: &YearDataset, identifier_column: &str) {
        for mut record in dataset.records() {
            let Some(key) = record.get(identifier_column).map(|id| id.trim().to_lowercase()) else {
                self.unidentified += 1;
                continue;
            };
            if let Some(name) = record.get(NAME_COLUMN).map(str::to_lowercase) {
                record.set(NAME_COLUMN, Some(name));
            }
            let value = record.get(VALUE_COLUMN).and_then(parse_document_value);
            self.by_person
                .entry(key)
                .or_default()
                .push(IndexedExpense { value, record });
            self.records += 1;
        }
    }

    /// Expenses with a document URL for `identifier` (case-insensitive).
    /// `None` when the person is unknown.
    pub fn lookup(&self, identifier: &str) -> Option<Vec<ExpenseView>> {
        let group = self.by_person.get(&identifier.trim().to_lowercase())?;
        if group.is_empty() {
            return None;
        }
        Some(
            group
                .iter()
                .filter_map(|e| {
                    let url = e.record.get(URL_COLUMN)?;
                    Some(ExpenseView {
                        value: e.value,
                        url: url.to_string(),
                        year: e.record.get(YEAR_COLUMN).unwrap_or_default().to_string(),
                    })
                })
                .collect(),
        )
    }

    pub fn persons(&self) -> usize {
        self.by_person.len()
    }

    pub fn records(&self) -> usize {
        self.records
    }

    /// Rows left out of the index because their identifier was null.
    pub fn unidentified(&self) -> usize {
        self.unidentified
    }
}

/// Loads every candidate year straight from the source files, independent of
/// what made it into the database. Missing or unreadable years are skipped.
pub fn build_index(settings: &Settings) -> PersonIndex {
    let datasets = settings.years().into_iter().filter_map(|year| match load_year(settings, year) {
        Ok(dataset) => {
            if dataset.is_none() {
                tracing::warn!(year, file = %settings.source_path(year).display(), "source file not found");
            }
            dataset
        }
        Err(e) => {
            tracing::warn!(year, error = %e, "could not load year for index");
            None
        }
    });
    let index = PersonIndex::from_datasets(datasets, &settings.identifier_column);
    if index.records() == 0 {
        tracing::warn!("index is empty, every lookup will miss");
    }
    tracing::info!(
        persons = index.persons(),
        records = index.records(),
        unidentified = index.unidentified(),
        "index built"
    );
    index
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset(year: i32, rows: &[(&str, &str, &str, Option<&str>)]) -> YearDataset {
        let columns = [NAME_COLUMN, "cpf", VALUE_COLUMN, URL_COLUMN, YEAR_COLUMN]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let rows = rows
            .iter()
            .map(|(name, cpf, value, url)| {
                vec![
                    Some(name.to_string()),
                    Some(cpf.to_string()),
                    Some(value.to_string()),
                    url.map(str::to_string),
                    Some(year.to_string()),
                ]
            })
            .collect();
        YearDataset::new(year, columns, rows).unwrap()
    }

    #[test]
    fn test_lookup_excludes_records_without_url() {
        let index = PersonIndex::from_datasets(
            [dataset(2015, &[
                ("Ana", "12345", "100,00", Some("http://doc/1")),
                ("Ana", "12345", "abc", None),
            ])],
            "cpf",
        );
        let found = index.lookup("12345").unwrap();
        assert_eq!(
            found,
            vec![ExpenseView {
                value: Some(100.0),
                url: "http://doc/1".to_string(),
                year: "2015".to_string(),
            }]
        );
    }

    #[test]
    fn test_unparseable_value_is_null() {
        let index = PersonIndex::from_datasets([dataset(2015, &[("Ana", "1", "abc", Some("u"))])], "cpf");
        assert_eq!(index.lookup("1").unwrap()[0].value, None);
    }

    #[test]
    fn test_negative_values_are_made_positive() {
        let index = PersonIndex::from_datasets([dataset(2015, &[("Ana", "1", "-42,50", Some("u"))])], "cpf");
        assert_eq!(index.lookup("1").unwrap()[0].value, Some(42.5));
    }

    #[test]
    fn test_unknown_identifier_is_not_found() {
        let index = PersonIndex::from_datasets([dataset(2015, &[("Ana", "1", "1", Some("u"))])], "cpf");
        assert!(index.lookup("999").is_none());
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let index = PersonIndex::from_datasets([dataset(2015, &[("Ana", "AbC", "1", Some("u"))])], "cpf");
        assert!(index.lookup("abc").is_some());
        assert!(index.lookup("ABC").is_some());
    }

    #[test]
    fn test_groups_span_years_in_load_order() {
        let index = PersonIndex::from_datasets(
            [
                dataset(2014, &[("Ana", "1", "1", Some("a"))]),
                dataset(2015, &[("Ana", "1", "2", Some("b")), ("Bia", "2", "3", Some("c"))]),
            ],
            "cpf",
        );
        let years: Vec<String> = index.lookup("1").unwrap().into_iter().map(|e| e.year).collect();
        assert_eq!(years, vec!["2014", "2015"]);
        assert_eq!(index.persons(), 2);
        assert_eq!(index.records(), 3);
    }

    #[test]
    fn test_person_with_no_urls_is_found_but_empty() {
        let index = PersonIndex::from_datasets([dataset(2015, &[("Ana", "1", "1", None)])], "cpf");
        assert_eq!(index.lookup("1"), Some(vec![]));
    }

    #[test]
    fn test_rows_without_identifier_are_counted() {
        let columns = [NAME_COLUMN, "cpf", YEAR_COLUMN].iter().map(|s| s.to_string()).collect();
        let rows = vec![
            vec![Some("Ana".into()), Some("1".into()), Some("2015".into())],
            vec![Some("Bia".into()), None, Some("2015".into())],
        ];
        let index = PersonIndex::from_datasets([YearDataset::new(2015, columns, rows).unwrap()], "cpf");
        assert_eq!(index.records(), 1);
        assert_eq!(index.unidentified(), 1);
    }

    #[test]
    fn test_names_are_lowercased() {
        let index = PersonIndex::from_datasets([dataset(2015, &[("ANA", "1", "1", None)])], "cpf");
        let group = &index.by_person["1"];
        assert_eq!(group[0].record.get(NAME_COLUMN), Some("ana"));
    }

    #[test]
    fn test_build_index_skips_missing_years() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("Year-2016.csv"),
            "txNomeParlamentar;cpf;vlrDocumento;urlDocumento\nAna;7;5,00;http://d\n",
        )
        .unwrap();
        let settings = Settings {
            source_dir: dir.path().to_string_lossy().to_string(),
            first_year: 2015,
            last_year: 2016,
            ..Settings::default()
        };
        let index = build_index(&settings);
        assert_eq!(index.records(), 1);
        let found = index.lookup("7").unwrap();
        assert_eq!(found[0].value, Some(5.0));
        assert_eq!(found[0].year, "2016");
    }
}
