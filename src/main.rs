mod cli;
mod db;
mod error;
mod fmt;
mod importer;
mod index;
mod ingest;
mod inserter;
mod models;
mod server;
mod settings;

use clap::Parser;
use tracing_subscriber::{fmt as log_fmt, EnvFilter};

use cli::{Cli, Commands};

fn main() {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    log_fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init {
            source_dir,
            db_path,
            first_year,
            last_year,
            chunk_size,
            bind,
        } => cli::init::run(source_dir, db_path, first_year, last_year, chunk_size, bind),
        Commands::Ingest => cli::ingest::run(),
        Commands::Serve { bind } => cli::serve::run(bind),
        Commands::Lookup { identifier } => cli::lookup::run(&identifier),
        Commands::Status => cli::status::run(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
