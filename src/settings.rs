use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{GastosError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_source_dir")]
    pub source_dir: String,
    #[serde(default = "default_db_path")]
    pub db_path: String,
    /// File name pattern inside `source_dir`; `{year}` is replaced by the year.
    #[serde(default = "default_file_template")]
    pub file_template: String,
    #[serde(default = "default_first_year")]
    pub first_year: i32,
    #[serde(default = "default_last_year")]
    pub last_year: i32,
    #[serde(default = "default_table")]
    pub table: String,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_identifier_column")]
    pub identifier_column: String,
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_source_dir() -> String {
    data_dir().join("gastos").to_string_lossy().to_string()
}

fn default_db_path() -> String {
    data_dir().join("gastos.db").to_string_lossy().to_string()
}

fn default_file_template() -> String {
    "Year-{year}.csv".to_string()
}

fn default_first_year() -> i32 {
    2008
}

fn default_last_year() -> i32 {
    2025
}

fn default_table() -> String {
    "gastos_parlamentares".to_string()
}

fn default_chunk_size() -> usize {
    1000
}

fn default_identifier_column() -> String {
    "cpf".to_string()
}

fn default_bind() -> String {
    "127.0.0.1:5000".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            source_dir: default_source_dir(),
            db_path: default_db_path(),
            file_template: default_file_template(),
            first_year: default_first_year(),
            last_year: default_last_year(),
            table: default_table(),
            chunk_size: default_chunk_size(),
            identifier_column: default_identifier_column(),
            bind: default_bind(),
        }
    }
}

impl Settings {
    /// Candidate years in ascending order.
    pub fn years(&self) -> Vec<i32> {
        (self.first_year..=self.last_year).collect()
    }

    pub fn source_path(&self, year: i32) -> PathBuf {
        PathBuf::from(&self.source_dir).join(self.file_template.replace("{year}", &year.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.first_year > self.last_year {
            return Err(GastosError::Settings(format!(
                "first_year ({}) is after last_year ({})",
                self.first_year, self.last_year
            )));
        }
        if self.chunk_size == 0 {
            return Err(GastosError::Settings("chunk_size must be at least 1".to_string()));
        }
        if !self.file_template.contains("{year}") {
            return Err(GastosError::Settings(format!(
                "file_template must contain {{year}}: {}",
                self.file_template
            )));
        }
        Ok(())
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("gastos")
}

fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Documents")
        .join("gastos")
}

pub fn load_settings() -> Settings {
    let path = settings_path();
    if path.exists() {
        let content = std::fs::read_to_string(&path).unwrap_or_default();
        serde_json::from_str(&content).unwrap_or_default()
    } else {
        Settings::default()
    }
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    let dir = config_dir();
    std::fs::create_dir_all(&dir)?;
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| GastosError::Settings(e.to_string()))?;
    std::fs::write(settings_path(), format!("{json}\n"))?;
    Ok(())
}

pub fn settings_file_exists() -> bool {
    settings_path().exists()
}

pub fn shellexpand_path(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    let resolved = std::fs::canonicalize(path).unwrap_or_else(|_| {
        let p = PathBuf::from(path);
        if p.is_relative() {
            std::env::current_dir().map(|cwd| cwd.join(&p)).unwrap_or(p)
        } else {
            p
        }
    });
    resolved.to_string_lossy().to_string()
}
