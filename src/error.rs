use thiserror::Error;

use crate::db::StoreError;

#[derive(Error, Debug)]
pub enum GastosError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("No source data available: no file found for years {first}-{last} in {dir}")]
    NoSourceData { first: i32, last: i32, dir: String },

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("No data found for {0}")]
    NotFound(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, GastosError>;
