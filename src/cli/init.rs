use crate::error::Result;
use crate::settings::{load_settings, save_settings, settings_file_exists, shellexpand_path};

pub fn run(
    source_dir: Option<String>,
    db_path: Option<String>,
    first_year: Option<i32>,
    last_year: Option<i32>,
    chunk_size: Option<usize>,
    bind: Option<String>,
) -> Result<()> {
    let existed = settings_file_exists();
    let mut settings = load_settings();

    if let Some(dir) = source_dir {
        settings.source_dir = shellexpand_path(&dir);
    }
    if let Some(path) = db_path {
        settings.db_path = shellexpand_path(&path);
    }
    if let Some(year) = first_year {
        settings.first_year = year;
    }
    if let Some(year) = last_year {
        settings.last_year = year;
    }
    if let Some(size) = chunk_size {
        settings.chunk_size = size;
    }
    if let Some(addr) = bind {
        settings.bind = addr;
    }
    settings.validate()?;
    save_settings(&settings)?;

    println!("{} settings", if existed { "Updated" } else { "Created" });
    println!("Source dir: {}", settings.source_dir);
    println!("Files:      {}", settings.source_path(settings.first_year).display());
    println!("Years:      {}-{}", settings.first_year, settings.last_year);
    println!("Database:   {}", settings.db_path);
    Ok(())
}
