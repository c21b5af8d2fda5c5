pub mod ingest;
pub mod init;
pub mod lookup;
pub mod serve;
pub mod status;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "gastos", about = "Load yearly legislator expense CSVs into SQLite and serve lookups by person.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write settings: where the yearly CSVs live, the database path and the year range.
    Init {
        /// Directory holding the yearly CSV files
        #[arg(long = "source-dir")]
        source_dir: Option<String>,
        /// SQLite database path
        #[arg(long = "db")]
        db_path: Option<String>,
        /// First candidate year
        #[arg(long = "from")]
        first_year: Option<i32>,
        /// Last candidate year
        #[arg(long = "to")]
        last_year: Option<i32>,
        /// Rows per insert transaction
        #[arg(long = "chunk-size")]
        chunk_size: Option<usize>,
        /// Address for `gastos serve`, e.g. 127.0.0.1:5000
        #[arg(long)]
        bind: Option<String>,
    },
    /// Drop and rebuild the expenses table from every yearly CSV.
    Ingest,
    /// Build the in-memory index and serve GET /expenses/{identifier}.
    Serve {
        /// Override the configured bind address
        #[arg(long)]
        bind: Option<String>,
    },
    /// Look up a person's expenses from the source files.
    Lookup {
        /// Person identifier (CPF)
        identifier: String,
    },
    /// Show settings, table row counts per year and recent ingestions.
    Status,
}
