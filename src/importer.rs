use std::path::Path;

use encoding_rs::{UTF_8, WINDOWS_1252};
use sha2::{Digest, Sha256};

use crate::error::{GastosError, Result};
use crate::models::{YearDataset, NAME_COLUMN, YEAR_COLUMN};
use crate::settings::Settings;

const NULL_MARKERS: &[&str] = &[
    "", "NA", "N/A", "n/a", "NaN", "nan", "NULL", "null", "None", "#N/A", "<NA>",
];

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Undoes mojibake: text whose UTF-8 bytes were decoded one byte per char.
///
/// The chars are mapped back to their single-byte values and the bytes
/// decoded as UTF-8, with invalid sequences becoming U+FFFD. This is a
/// one-shot repair, not a fixed point: plain ASCII survives any number of
/// passes, but correctly decoded accented text does not survive a second one.
/// Text holding chars outside the single-byte range cannot have come from a
/// mis-decode and is returned unchanged.
pub fn fix_text(text: &str) -> String {
    let (bytes, _, unmappable) = WINDOWS_1252.encode(text);
    if unmappable {
        return text.to_string();
    }
    UTF_8.decode_without_bom_handling(&bytes).0.into_owned()
}

/// Decodes a raw field the way the source files are declared (single-byte
/// western) and then repairs it.
fn decode_field(raw: &[u8]) -> String {
    let (text, _) = WINDOWS_1252.decode_without_bom_handling(raw);
    fix_text(&text)
}

fn to_cell(raw: &[u8]) -> Option<String> {
    let text = decode_field(raw);
    if NULL_MARKERS.contains(&text.trim()) {
        None
    } else {
        Some(text)
    }
}

pub fn clean_column_name(raw: &str) -> String {
    raw.chars()
        .filter(|c| !matches!(c, '\u{feff}' | '"' | '\''))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Cleans every header, names the first column [`NAME_COLUMN`] and suffixes
/// repeated names with `.1`, `.2`, ...
///
/// Names compare case-insensitively, as SQLite identifiers do. A source
/// column spelled like [`YEAR_COLUMN`] in any case takes the canonical name.
pub fn clean_columns<I, S>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut columns: Vec<String> = Vec::new();
    for (i, name) in raw.into_iter().enumerate() {
        let base = if i == 0 {
            NAME_COLUMN.to_string()
        } else {
            let cleaned = clean_column_name(name.as_ref());
            if cleaned.eq_ignore_ascii_case(YEAR_COLUMN) {
                YEAR_COLUMN.to_string()
            } else {
                cleaned
            }
        };
        let mut candidate = base.clone();
        let mut n = 0;
        while columns.iter().any(|c| c.eq_ignore_ascii_case(&candidate)) {
            n += 1;
            candidate = format!("{base}.{n}");
        }
        columns.push(candidate);
    }
    columns
}

/// Brazilian-formatted amount to a non-negative number. `None` for blanks,
/// junk and non-finite values.
pub fn parse_document_value(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    let normalized = if s.contains(',') {
        s.replace('.', "").replace(',', ".")
    } else {
        s.to_string()
    };
    normalized
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(f64::abs)
}

pub fn compute_checksum(file_path: &Path) -> Result<String> {
    let data = std::fs::read(file_path)?;
    let mut hasher = Sha256::new();
    hasher.update(&data);
    Ok(hex::encode(hasher.finalize()))
}

fn open_reader(file_path: &Path) -> Result<csv::Reader<std::io::BufReader<std::fs::File>>> {
    let file = std::fs::File::open(file_path)?;
    Ok(csv::ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(true)
        .flexible(true)
        .from_reader(std::io::BufReader::new(file)))
}

fn read_columns(rdr: &mut csv::Reader<std::io::BufReader<std::fs::File>>, file_path: &Path) -> Result<Vec<String>> {
    let headers = rdr.byte_headers()?;
    if headers.is_empty() {
        return Err(GastosError::Other(format!("{} has no header row", file_path.display())));
    }
    Ok(clean_columns(headers.iter().map(decode_field)))
}

// ---------------------------------------------------------------------------
// Schema discovery
// ---------------------------------------------------------------------------

/// Header of the earliest year that has a source file. Only the header row
/// is read.
pub fn discover_schema(settings: &Settings) -> Result<Vec<String>> {
    for year in settings.years() {
        let path = settings.source_path(year);
        if !path.exists() {
            continue;
        }
        let mut rdr = open_reader(&path)?;
        let columns = read_columns(&mut rdr, &path)?;
        tracing::info!(year, columns = columns.len(), file = %path.display(), "schema discovered");
        return Ok(columns);
    }
    Err(GastosError::NoSourceData {
        first: settings.first_year,
        last: settings.last_year,
        dir: settings.source_dir.clone(),
    })
}

// ---------------------------------------------------------------------------
// Year loading
// ---------------------------------------------------------------------------

/// Reads one yearly file in full. `Ok(None)` when the file does not exist.
pub fn load_year(settings: &Settings, year: i32) -> Result<Option<YearDataset>> {
    let path = settings.source_path(year);
    if !path.exists() {
        return Ok(None);
    }
    load_file(&path, year).map(Some)
}

pub fn load_file(file_path: &Path, year: i32) -> Result<YearDataset> {
    let mut rdr = open_reader(file_path)?;
    let mut columns = read_columns(&mut rdr, file_path)?;
    let width = columns.len();
    let year_idx = match columns.iter().position(|c| c.eq_ignore_ascii_case(YEAR_COLUMN)) {
        Some(idx) => {
            columns[idx] = YEAR_COLUMN.to_string();
            idx
        }
        None => {
            columns.push(YEAR_COLUMN.to_string());
            width
        }
    };
    let tag = year.to_string();

    let mut rows = Vec::new();
    let mut ragged = 0usize;
    for result in rdr.byte_records() {
        let record = result?;
        if record.len() != width {
            ragged += 1;
        }
        let mut row: Vec<Option<String>> = record.iter().take(width).map(to_cell).collect();
        row.resize(columns.len(), None);
        row[year_idx] = Some(tag.clone());
        rows.push(row);
    }
    if ragged > 0 {
        tracing::warn!(year, ragged, "rows with a field count different from the header were padded or truncated");
    }

    YearDataset::new(year, columns, rows)
}
